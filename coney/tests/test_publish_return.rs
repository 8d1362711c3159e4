//! Returned mandatory publishes: the return handler fires exactly once
//! and the publish confirm still settles via ack/nack.

use async_trait::async_trait;
use tokio::sync::mpsc;

use coney::callbacks::ChannelCallback;
use coney::channel::{BasicPublishArguments, ReturnedMessage};
use coney::connection::ConnectionArguments;
use coney::frame::{Ack, BasicProperties, Frame, Return};

mod common;

struct CollectingCallback {
    returns: mpsc::UnboundedSender<ReturnedMessage>,
}

#[async_trait]
impl ChannelCallback for CollectingCallback {
    async fn publish_return(&mut self, ret: ReturnedMessage) {
        self.returns.send(ret).unwrap();
    }
}

#[tokio::test]
async fn returned_mandatory_publish_hits_handler_once_then_confirms() {
    common::setup_logging();
    let (connection, mut broker) = common::MockBroker::bind(ConnectionArguments::default());

    let broker_task = tokio::spawn(async move {
        let ch = broker.accept_channel_open().await;
        broker.accept_confirm_select(ch).await;

        let (publish, _, chunks) = broker.recv_publish(ch).await;
        assert!(publish.mandatory());
        let body = chunks.concat();

        // no route: hand the message back, then confirm the publish
        let ret = Return {
            reply_code: 312,
            reply_text: "NO_ROUTE".try_into().unwrap(),
            exchange: publish.exchange.clone(),
            routing_key: publish.routing_key.clone(),
        };
        broker.send_frame(ch, ret.into_frame()).await;
        broker.send_content(ch, &body).await;
        broker.send_frame(ch, Ack::new(1, false).into_frame()).await;
    });

    let channel = connection.open_channel(None).await.unwrap();

    let (returns, mut return_rx) = mpsc::unbounded_channel();
    channel
        .register_callback(CollectingCallback { returns })
        .await
        .unwrap();
    channel.confirm_select(Default::default()).await.unwrap();

    let confirm = channel
        .basic_publish(
            BasicProperties::default(),
            b"undeliverable".to_vec(),
            BasicPublishArguments::new("nowhere", "void")
                .mandatory(true)
                .finish(),
        )
        .await
        .unwrap();

    // a return does not settle the publish; the ack does
    assert_eq!(confirm.wait().await.unwrap(), Some(1));

    let returned = return_rx.recv().await.unwrap();
    assert_eq!(returned.ret.reply_code, 312);
    assert_eq!(returned.ret.reply_text.as_str(), "NO_ROUTE");
    assert_eq!(returned.content, b"undeliverable");

    // exactly once
    assert!(return_rx.try_recv().is_err());

    broker_task.await.unwrap();
}
