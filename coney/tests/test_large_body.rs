//! Body framing against the negotiated frame size.

use coney::channel::BasicPublishArguments;
use coney::connection::ConnectionArguments;
use coney::frame::BasicProperties;

mod common;

#[tokio::test]
async fn large_body_splits_at_frame_max_minus_overhead() {
    common::setup_logging();
    let args = ConnectionArguments::new().frame_max(4096).finish();
    let (connection, mut broker) = common::MockBroker::bind(args);

    let body: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let expected = body.clone();

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        let (_, header, chunks) = broker.recv_publish(ch).await;

        assert_eq!(header.common.body_size, 10_000);
        // 4096-byte frames carry 4088 payload bytes each
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4088, 4088, 1824]);
        assert_eq!(chunks.concat(), expected);
    });

    let channel = connection.open_channel(None).await.unwrap();
    let confirm = channel
        .basic_publish(
            BasicProperties::default(),
            body,
            BasicPublishArguments::new("", "bulk"),
        )
        .await
        .unwrap();
    assert_eq!(confirm.wait().await.unwrap(), None);

    broker_task.await.unwrap();
}

#[tokio::test]
async fn empty_body_emits_no_body_frame() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        let (_, header, chunks) = broker.recv_publish(ch).await;
        assert_eq!(header.common.body_size, 0);
        assert!(chunks.is_empty());
    });

    let channel = connection.open_channel(None).await.unwrap();
    let confirm = channel
        .basic_publish(
            BasicProperties::default(),
            Vec::new(),
            BasicPublishArguments::new("", "q"),
        )
        .await
        .unwrap();
    assert_eq!(confirm.wait().await.unwrap(), None);

    broker_task.await.unwrap();
}
