//! Publisher-confirm tracking: batched acks, single nacks, out-of-order
//! confirms, and tag allocation across publishes.

use coney::channel::BasicPublishArguments;
use coney::connection::ConnectionArguments;
use coney::error::Error;
use coney::frame::{Ack, BasicProperties, Frame, Nack};

mod common;

async fn publish_one(
    channel: &coney::channel::Channel,
    body: &[u8],
) -> coney::channel::PublishConfirm {
    channel
        .basic_publish(
            BasicProperties::default(),
            body.to_vec(),
            BasicPublishArguments::new("", "q"),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn batched_ack_resolves_every_earlier_tag_in_order() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        broker.accept_confirm_select(ch).await;
        for _ in 0..3 {
            broker.recv_publish(ch).await;
        }
        broker
            .send_frame(ch, Ack::new(3, true).into_frame())
            .await;
    });

    let channel = connection.open_channel(None).await.unwrap();
    channel.confirm_select(Default::default()).await.unwrap();

    let first = publish_one(&channel, b"a").await;
    let second = publish_one(&channel, b"b").await;
    let third = publish_one(&channel, b"c").await;

    assert_eq!(first.wait().await.unwrap(), Some(1));
    assert_eq!(second.wait().await.unwrap(), Some(2));
    assert_eq!(third.wait().await.unwrap(), Some(3));

    broker_task.await.unwrap();
}

#[tokio::test]
async fn nack_rejects_exactly_its_tag() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        broker.accept_confirm_select(ch).await;
        broker.recv_publish(ch).await;
        broker.recv_publish(ch).await;

        // confirms arrive out of publish order
        let mut nack = Nack::new(2);
        nack.set_requeue(false);
        broker.send_frame(ch, nack.into_frame()).await;
        broker
            .send_frame(ch, Ack::new(1, false).into_frame())
            .await;

        // the map is empty again: the next publish takes tag 3
        broker.recv_publish(ch).await;
        broker
            .send_frame(ch, Ack::new(3, false).into_frame())
            .await;
    });

    let channel = connection.open_channel(None).await.unwrap();
    channel.confirm_select(Default::default()).await.unwrap();

    let first = publish_one(&channel, b"m1").await;
    let second = publish_one(&channel, b"m2").await;

    assert_eq!(second.wait().await.unwrap_err(), Error::PublishNacked(2));
    assert_eq!(first.wait().await.unwrap(), Some(1));

    let third = publish_one(&channel, b"m3").await;
    assert_eq!(third.wait().await.unwrap(), Some(3));

    broker_task.await.unwrap();
}

#[tokio::test]
async fn confirm_for_unknown_tag_closes_the_channel() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        broker.accept_confirm_select(ch).await;
        broker.recv_publish(ch).await;

        // duplicate/out-of-range confirm
        broker
            .send_frame(ch, Ack::new(9, false).into_frame())
            .await;

        // the engine closes the channel upstream with 505
        match broker.recv_frame().await {
            (_, Frame::CloseChannel(_, close)) => assert_eq!(close.reply_code, 505),
            (_, other) => panic!("expected channel.close, got {:?}", other),
        }
    });

    let channel = connection.open_channel(None).await.unwrap();
    channel.confirm_select(Default::default()).await.unwrap();

    let pending = publish_one(&channel, b"m1").await;
    match pending.wait().await.unwrap_err() {
        Error::ProtocolError(_) => {}
        other => panic!("expected protocol error, got {:?}", other),
    }
    assert!(!channel.is_open());

    broker_task.await.unwrap();
}
