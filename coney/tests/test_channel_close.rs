//! Channel close paths: server-initiated close mid-RPC, graceful close,
//! and the closed-channel guarantee.

use coney::channel::{BasicPublishArguments, QueueDeclareArguments};
use coney::connection::ConnectionArguments;
use coney::error::Error;
use coney::frame::{BasicProperties, CloseChannel, CloseChannelOk, Frame};

mod common;

#[tokio::test]
async fn server_close_rejects_pending_rpc_and_is_acknowledged() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;

        match broker.recv_frame().await {
            (_, Frame::DeclareQueue(..)) => {
                let close = CloseChannel::new(404, "NOT_FOUND".try_into().unwrap(), 50, 10);
                broker.send_frame(ch, close.into_frame()).await;
            }
            (_, other) => panic!("expected queue.declare, got {:?}", other),
        }

        // the client must acknowledge before tearing down
        match broker.recv_frame().await {
            (_, Frame::CloseChannelOk(..)) => {}
            (_, other) => panic!("expected channel.close-ok, got {:?}", other),
        }
    });

    let channel = connection.open_channel(None).await.unwrap();
    let watcher = channel.clone();

    let err = channel
        .queue_declare(QueueDeclareArguments::new("missing").passive(true).finish())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::ChannelError {
            reply_code: 404,
            reply_text: "NOT_FOUND".to_owned(),
            class_id: 50,
            method_id: 10,
        }
    );

    assert!(!watcher.is_open());
    let err = watcher
        .basic_publish(
            BasicProperties::default(),
            b"late".to_vec(),
            BasicPublishArguments::new("", "q"),
        )
        .await
        .unwrap_err();
    assert_eq!(err, Error::ChannelClosed);

    broker_task.await.unwrap();
}

#[tokio::test]
async fn graceful_close_resolves_on_close_ok() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        match broker.recv_frame().await {
            (_, Frame::CloseChannel(_, close)) => {
                // client-initiated close reports success
                assert_eq!(close.reply_code, 200);
                broker.send_frame(ch, CloseChannelOk.into_frame()).await;
            }
            (_, other) => panic!("expected channel.close, got {:?}", other),
        }
    });

    let channel = connection.open_channel(None).await.unwrap();
    let watcher = channel.clone();

    channel.close().await.unwrap();

    assert!(!watcher.is_open());
    let err = watcher
        .queue_declare(QueueDeclareArguments::new("q"))
        .await
        .unwrap_err();
    assert_eq!(err, Error::ChannelClosed);

    broker_task.await.unwrap();
}

#[tokio::test]
async fn connection_loss_fails_pending_work_with_connection_error() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        match broker.recv_frame().await {
            (_, Frame::DeclareQueue(..)) => broker,
            (_, other) => panic!("expected queue.declare, got {:?}", other),
        }
    });

    let channel = connection.open_channel(None).await.unwrap();

    let declare = channel.queue_declare(QueueDeclareArguments::new("q"));
    let broker = broker_task.await.unwrap();
    // drop both halves: the engine's reader sees EOF
    drop(broker);

    match declare.await.unwrap_err() {
        Error::ConnectionError(_) => {}
        other => panic!("expected connection error, got {:?}", other),
    }
    assert!(!channel.is_open());
}
