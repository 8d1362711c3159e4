//! One-shot message retrieval with `basic.get`.

use coney::channel::BasicGetArguments;
use coney::connection::ConnectionArguments;
use coney::frame::{Frame, GetEmpty, GetOk};

mod common;

#[tokio::test]
async fn get_resolves_with_the_assembled_message() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        match broker.recv_frame().await {
            (_, Frame::Get(_, get)) => {
                assert_eq!(get.queue.as_str(), "inbox");
                assert_eq!(get.no_ack, 0);
                let ok = GetOk {
                    delivery_tag: 42,
                    redelivered: 1,
                    exchange: "".try_into().unwrap(),
                    routing_key: "inbox".try_into().unwrap(),
                    message_count: 7,
                };
                broker.send_frame(ch, ok.into_frame()).await;
                broker.send_content(ch, b"payload").await;
            }
            (_, other) => panic!("expected basic.get, got {:?}", other),
        }

        // second get: nothing queued
        match broker.recv_frame().await {
            (_, Frame::Get(..)) => {
                broker
                    .send_frame(ch, GetEmpty::default().into_frame())
                    .await;
            }
            (_, other) => panic!("expected basic.get, got {:?}", other),
        }
    });

    let channel = connection.open_channel(None).await.unwrap();

    let message = channel
        .basic_get(BasicGetArguments::new("inbox"))
        .await
        .unwrap()
        .expect("queued message");
    assert_eq!(message.get_ok.delivery_tag, 42);
    assert!(message.get_ok.redelivered());
    assert_eq!(message.get_ok.message_count, 7);
    assert_eq!(message.content, b"payload");

    let empty = channel
        .basic_get(BasicGetArguments::new("inbox"))
        .await
        .unwrap();
    assert!(empty.is_none());

    broker_task.await.unwrap();
}
