//! End-to-end channel flows against the scripted broker: declare,
//! consume, publish, delivery dispatch, RPC reply ordering, and consumer
//! cancellation in both directions.

use async_trait::async_trait;
use tokio::sync::mpsc;

use coney::channel::{
    BasicCancelArguments, BasicConsumeArguments, BasicPublishArguments, Delivery,
    QueueDeclareArguments,
};
use coney::connection::ConnectionArguments;
use coney::consumer::{Consumer, ConsumerError};
use coney::frame::{BasicProperties, Cancel, CancelOk, ConsumeOk, DeclareQueueOk, Frame};

mod common;

struct CollectingConsumer {
    deliveries: mpsc::UnboundedSender<Delivery>,
    cancels: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl Consumer for CollectingConsumer {
    async fn on_message(&mut self, delivery: Delivery) -> Result<(), ConsumerError> {
        self.deliveries.send(delivery).unwrap();
        Ok(())
    }

    async fn on_cancel(&mut self) {
        let _ = self.cancels.send(());
    }
}

#[tokio::test]
async fn declare_publish_consume_round_trip() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;

        match broker.recv_frame().await {
            (c, Frame::DeclareQueue(_, declare)) => {
                assert_eq!(c, ch);
                assert_eq!(declare.queue.as_str(), "q");
                assert!(declare.durable());
                let ok = DeclareQueueOk {
                    queue: "q".try_into().unwrap(),
                    message_count: 0,
                    consumer_count: 0,
                };
                broker.send_frame(ch, ok.into_frame()).await;
            }
            (_, other) => panic!("expected queue.declare, got {:?}", other),
        }

        match broker.recv_frame().await {
            (c, Frame::Consume(_, consume)) => {
                assert_eq!(c, ch);
                assert_eq!(consume.queue.as_str(), "q");
                assert!(consume.no_ack());
                // empty client tag: the server names the subscription
                assert!(consume.consumer_tag.is_empty());
                let ok = ConsumeOk {
                    consumer_tag: "ctag-1".try_into().unwrap(),
                };
                broker.send_frame(ch, ok.into_frame()).await;
            }
            (_, other) => panic!("expected basic.consume, got {:?}", other),
        }

        let (publish, header, chunks) = broker.recv_publish(ch).await;
        assert_eq!(publish.exchange.as_str(), "");
        assert_eq!(publish.routing_key.as_str(), "q");
        assert_eq!(header.common.body_size, 5);

        let body: Vec<u8> = chunks.concat();
        broker.deliver(ch, "ctag-1", 1, "", "q", &body).await;
    });

    let channel = connection.open_channel(None).await.unwrap();

    let (name, message_count, consumer_count) = channel
        .queue_declare(QueueDeclareArguments::new("q").durable(true).finish())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(name, "q");
    assert_eq!(message_count, 0);
    assert_eq!(consumer_count, 0);

    let (deliveries, mut delivery_rx) = mpsc::unbounded_channel();
    let (cancels, _cancel_rx) = mpsc::unbounded_channel();
    let tag = channel
        .basic_consume(
            CollectingConsumer {
                deliveries,
                cancels,
            },
            BasicConsumeArguments::new("q", "").no_ack(true).finish(),
        )
        .await
        .unwrap();
    assert_eq!(tag, "ctag-1");

    let confirm = channel
        .basic_publish(
            BasicProperties::default(),
            b"hello".to_vec(),
            BasicPublishArguments::new("", "q"),
        )
        .await
        .unwrap();
    // confirms are off: resolves once handed over, with no delivery tag
    assert_eq!(confirm.wait().await.unwrap(), None);

    let delivery = delivery_rx.recv().await.unwrap();
    assert_eq!(delivery.content, b"hello");
    assert_eq!(delivery.deliver.exchange.as_str(), "");
    assert_eq!(delivery.deliver.routing_key.as_str(), "q");
    assert_eq!(delivery.deliver.consumer_tag.as_str(), "ctag-1");

    broker_task.await.unwrap();
}

#[tokio::test]
async fn rpc_replies_resolve_in_request_order() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        for (expected, count) in [("q1", 11), ("q2", 22)] {
            match broker.recv_frame().await {
                (_, Frame::DeclareQueue(_, declare)) => {
                    assert_eq!(declare.queue.as_str(), expected);
                    let ok = DeclareQueueOk {
                        queue: expected.try_into().unwrap(),
                        message_count: count,
                        consumer_count: 0,
                    };
                    broker.send_frame(ch, ok.into_frame()).await;
                }
                (_, other) => panic!("expected queue.declare, got {:?}", other),
            }
        }
    });

    let channel = connection.open_channel(None).await.unwrap();

    // both requests pending at once; replies must pair FIFO
    let (first, second) = tokio::join!(
        channel.queue_declare(QueueDeclareArguments::new("q1")),
        channel.queue_declare(QueueDeclareArguments::new("q2")),
    );
    let (name1, count1, _) = first.unwrap().unwrap();
    let (name2, count2, _) = second.unwrap().unwrap();
    assert_eq!((name1.as_str(), count1), ("q1", 11));
    assert_eq!((name2.as_str(), count2), ("q2", 22));

    broker_task.await.unwrap();
}

#[tokio::test]
async fn client_cancel_retires_the_consumer() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        match broker.recv_frame().await {
            (_, Frame::Consume(_, consume)) => {
                let ok = ConsumeOk {
                    consumer_tag: consume.consumer_tag.clone(),
                };
                broker.send_frame(ch, ok.into_frame()).await;
            }
            (_, other) => panic!("expected basic.consume, got {:?}", other),
        }
        match broker.recv_frame().await {
            (_, Frame::Cancel(_, cancel)) => {
                assert_eq!(cancel.consumer_tag.as_str(), "worker");
                let ok = CancelOk::new(cancel.consumer_tag);
                broker.send_frame(ch, ok.into_frame()).await;
            }
            (_, other) => panic!("expected basic.cancel, got {:?}", other),
        }
    });

    let channel = connection.open_channel(None).await.unwrap();

    let (deliveries, _delivery_rx) = mpsc::unbounded_channel();
    let (cancels, mut cancel_rx) = mpsc::unbounded_channel();
    channel
        .basic_consume(
            CollectingConsumer {
                deliveries,
                cancels,
            },
            BasicConsumeArguments::new("q", "worker"),
        )
        .await
        .unwrap();

    let tag = channel
        .basic_cancel(BasicCancelArguments::new("worker"))
        .await
        .unwrap();
    assert_eq!(tag, "worker");
    cancel_rx.recv().await.expect("cancellation signal");

    broker_task.await.unwrap();
}

#[tokio::test]
async fn server_cancel_notifies_once_and_replies_cancel_ok() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        match broker.recv_frame().await {
            (_, Frame::Consume(_, consume)) => {
                let ok = ConsumeOk {
                    consumer_tag: consume.consumer_tag.clone(),
                };
                broker.send_frame(ch, ok.into_frame()).await;
            }
            (_, other) => panic!("expected basic.consume, got {:?}", other),
        }

        // e.g. the queue was deleted
        let cancel = Cancel::new("worker".try_into().unwrap(), false);
        broker.send_frame(ch, cancel.into_frame()).await;

        match broker.recv_frame().await {
            (_, Frame::CancelOk(_, ok)) => assert_eq!(ok.consumer_tag.as_str(), "worker"),
            (_, other) => panic!("expected basic.cancel-ok, got {:?}", other),
        }
    });

    let channel = connection.open_channel(None).await.unwrap();

    let (deliveries, _delivery_rx) = mpsc::unbounded_channel();
    let (cancels, mut cancel_rx) = mpsc::unbounded_channel();
    channel
        .basic_consume(
            CollectingConsumer {
                deliveries,
                cancels,
            },
            BasicConsumeArguments::new("q", "worker"),
        )
        .await
        .unwrap();

    cancel_rx.recv().await.expect("cancellation signal");
    broker_task.await.unwrap();
}
