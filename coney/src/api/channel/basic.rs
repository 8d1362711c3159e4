//! Basic-class operations: qos, consume, cancel, get, ack/nack/reject,
//! recover, publish.

use coney_wire::constants::FRAME_OVERHEAD;
use coney_wire::types::{AmqpDeliveryTag, FieldTable, ShortStr};
use tokio::sync::oneshot;

use crate::api::consumer::Consumer;
use crate::api::error::{Error, Result};
use crate::api::{impl_chainable_setter, synchronous_request};
use crate::frame::{
    Ack, BasicProperties, Cancel, Consume, ContentBody, ContentHeader, ContentHeaderCommon, Frame,
    Get, Nack, Publish, Qos, Recover, RecoverAsync, Reject,
};

use super::{Channel, DispatcherCommand, GetMessage, PublishConfirm, RpcKind, RpcReply};

/// Content class id of `basic`.
const BASIC_CLASS: u16 = 60;

/// Arguments for [`Channel::basic_qos`].
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.qos).
#[derive(Debug, Clone, Default)]
pub struct BasicQosArguments {
    /// Default: 0.
    pub prefetch_size: u32,
    /// Default: 0.
    pub prefetch_count: u16,
    /// Default: `false`.
    pub global: bool,
}

impl BasicQosArguments {
    pub fn new(prefetch_size: u32, prefetch_count: u16, global: bool) -> Self {
        Self {
            prefetch_size,
            prefetch_count,
            global,
        }
    }

    impl_chainable_setter! {
        prefetch_size, u32
    }
    impl_chainable_setter! {
        prefetch_count, u16
    }
    impl_chainable_setter! {
        global, bool
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

/// Arguments for [`Channel::basic_consume`].
///
/// An empty `consumer_tag` asks the server to generate one; the tag the
/// subscription ends up under is returned by `basic_consume`.
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.consume).
#[derive(Debug, Clone, Default)]
pub struct BasicConsumeArguments {
    pub queue: String,
    pub consumer_tag: String,
    pub no_local: bool,
    pub no_ack: bool,
    pub exclusive: bool,
    pub no_wait: bool,
    pub arguments: FieldTable,
}

impl BasicConsumeArguments {
    pub fn new(queue: &str, consumer_tag: &str) -> Self {
        Self {
            queue: queue.to_owned(),
            consumer_tag: consumer_tag.to_owned(),
            ..Default::default()
        }
    }

    impl_chainable_setter! {
        queue, String
    }
    impl_chainable_setter! {
        consumer_tag, String
    }
    impl_chainable_setter! {
        no_local, bool
    }
    impl_chainable_setter! {
        no_ack, bool
    }
    impl_chainable_setter! {
        exclusive, bool
    }
    impl_chainable_setter! {
        no_wait, bool
    }
    impl_chainable_setter! {
        arguments, FieldTable
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

/// Arguments for [`Channel::basic_cancel`].
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.cancel).
#[derive(Debug, Clone, Default)]
pub struct BasicCancelArguments {
    pub consumer_tag: String,
    pub no_wait: bool,
}

impl BasicCancelArguments {
    pub fn new(consumer_tag: &str) -> Self {
        Self {
            consumer_tag: consumer_tag.to_owned(),
            no_wait: false,
        }
    }

    impl_chainable_setter! {
        consumer_tag, String
    }
    impl_chainable_setter! {
        no_wait, bool
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

/// Arguments for [`Channel::basic_get`].
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.get).
#[derive(Debug, Clone, Default)]
pub struct BasicGetArguments {
    pub queue: String,
    pub no_ack: bool,
}

impl BasicGetArguments {
    pub fn new(queue: &str) -> Self {
        Self {
            queue: queue.to_owned(),
            no_ack: false,
        }
    }

    impl_chainable_setter! {
        queue, String
    }
    impl_chainable_setter! {
        no_ack, bool
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

/// Arguments for [`Channel::basic_ack`].
#[derive(Debug, Clone, Default)]
pub struct BasicAckArguments {
    pub delivery_tag: AmqpDeliveryTag,
    pub multiple: bool,
}

impl BasicAckArguments {
    pub fn new(delivery_tag: AmqpDeliveryTag, multiple: bool) -> Self {
        Self {
            delivery_tag,
            multiple,
        }
    }
}

/// Arguments for [`Channel::basic_nack`].
#[derive(Debug, Clone)]
pub struct BasicNackArguments {
    pub delivery_tag: AmqpDeliveryTag,
    pub multiple: bool,
    /// Default: `true`.
    pub requeue: bool,
}

impl Default for BasicNackArguments {
    fn default() -> Self {
        Self {
            delivery_tag: 0,
            multiple: false,
            requeue: true,
        }
    }
}

impl BasicNackArguments {
    pub fn new(delivery_tag: AmqpDeliveryTag, multiple: bool, requeue: bool) -> Self {
        Self {
            delivery_tag,
            multiple,
            requeue,
        }
    }
}

/// Arguments for [`Channel::basic_reject`].
#[derive(Debug, Clone)]
pub struct BasicRejectArguments {
    pub delivery_tag: AmqpDeliveryTag,
    /// Default: `true`.
    pub requeue: bool,
}

impl Default for BasicRejectArguments {
    fn default() -> Self {
        Self {
            delivery_tag: 0,
            requeue: true,
        }
    }
}

impl BasicRejectArguments {
    pub fn new(delivery_tag: AmqpDeliveryTag, requeue: bool) -> Self {
        Self {
            delivery_tag,
            requeue,
        }
    }
}

/// Arguments for [`Channel::basic_publish`].
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.publish).
#[derive(Debug, Clone, Default)]
pub struct BasicPublishArguments {
    pub exchange: String,
    pub routing_key: String,
    /// Route-or-return; returned messages reach the channel callback.
    pub mandatory: bool,
    pub immediate: bool,
}

impl BasicPublishArguments {
    pub fn new(exchange: &str, routing_key: &str) -> Self {
        Self {
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            ..Default::default()
        }
    }

    impl_chainable_setter! {
        exchange, String
    }
    impl_chainable_setter! {
        routing_key, String
    }
    impl_chainable_setter! {
        mandatory, bool
    }
    impl_chainable_setter! {
        immediate, bool
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

impl Channel {
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.qos).
    pub async fn basic_qos(&self, args: BasicQosArguments) -> Result<()> {
        let qos = Qos::new(args.prefetch_size, args.prefetch_count, args.global);
        synchronous_request!(self, vec![qos.into_frame()], Frame::QosOk)?;
        Ok(())
    }

    /// `basic_qos` with only a message-count window.
    pub async fn prefetch(&self, count: u16) -> Result<()> {
        self.basic_qos(BasicQosArguments::new(0, count, false)).await
    }

    /// Start a subscription, returning the consumer tag it runs under
    /// (server-assigned when `args.consumer_tag` is empty).
    ///
    /// The consumer is registered before the frame is written, so no
    /// delivery can slip past it.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.consume).
    pub async fn basic_consume<C>(&self, consumer: C, args: BasicConsumeArguments) -> Result<String>
    where
        C: Consumer + 'static,
    {
        if !self.is_open() {
            return Err(Error::ChannelClosed);
        }

        let mut consume = Consume::new(
            ShortStr::try_from(args.queue)?,
            ShortStr::try_from(args.consumer_tag.as_str())?,
            args.arguments,
        );
        consume.set_no_local(args.no_local);
        consume.set_no_ack(args.no_ack);
        consume.set_exclusive(args.exclusive);
        consume.set_no_wait(args.no_wait);

        // the table needs a key before the server names the subscription
        let provisional_tag = if args.consumer_tag.is_empty() {
            format!("ctag-{}.{}", self.channel_id(), self.next_consumer_seq())
        } else {
            args.consumer_tag.clone()
        };

        if args.no_wait {
            self.command(DispatcherCommand::Consume {
                frames: vec![consume.into_frame()],
                provisional_tag: provisional_tag.clone(),
                consumer: Box::new(consumer),
                responder: None,
            })
            .await?;
            return Ok(provisional_tag);
        }

        let (responder, rx) = oneshot::channel();
        self.command(DispatcherCommand::Consume {
            frames: vec![consume.into_frame()],
            provisional_tag,
            consumer: Box::new(consumer),
            responder: Some(responder),
        })
        .await?;

        match rx.await.map_err(|_| Error::ChannelClosed)?? {
            RpcReply::Method(Frame::ConsumeOk(_, consume_ok)) => {
                Ok(consume_ok.consumer_tag.into())
            }
            other => Err(Error::ProtocolError(format!(
                "unexpected reply {:?}",
                other
            ))),
        }
    }

    /// End a subscription, returning its consumer tag.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.cancel).
    pub async fn basic_cancel(&self, args: BasicCancelArguments) -> Result<String> {
        if !self.is_open() {
            return Err(Error::ChannelClosed);
        }

        let cancel = Cancel::new(
            ShortStr::try_from(args.consumer_tag.as_str())?,
            args.no_wait,
        );

        if args.no_wait {
            self.command(DispatcherCommand::Cancel {
                frames: vec![cancel.into_frame()],
                consumer_tag: args.consumer_tag.clone(),
                responder: None,
            })
            .await?;
            return Ok(args.consumer_tag);
        }

        let (responder, rx) = oneshot::channel();
        self.command(DispatcherCommand::Cancel {
            frames: vec![cancel.into_frame()],
            consumer_tag: args.consumer_tag,
            responder: Some(responder),
        })
        .await?;

        match rx.await.map_err(|_| Error::ChannelClosed)?? {
            RpcReply::Method(Frame::CancelOk(_, cancel_ok)) => Ok(cancel_ok.consumer_tag.into()),
            other => Err(Error::ProtocolError(format!(
                "unexpected reply {:?}",
                other
            ))),
        }
    }

    /// Pull a single message, or `None` when the queue is empty.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.get).
    pub async fn basic_get(&self, args: BasicGetArguments) -> Result<Option<GetMessage>> {
        let get = Get::new(ShortStr::try_from(args.queue)?, args.no_ack);
        match self.rpc(vec![get.into_frame()], RpcKind::Get).await? {
            RpcReply::Get(message) => Ok(message),
            other => Err(Error::ProtocolError(format!(
                "unexpected reply {:?}",
                other
            ))),
        }
    }

    /// Acknowledge a delivery. Resolves once the frame is handed to the
    /// socket funnel; there is no broker reply.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.ack).
    pub async fn basic_ack(&self, args: BasicAckArguments) -> Result<()> {
        let ack = Ack::new(args.delivery_tag, args.multiple);
        self.send_nowait(vec![ack.into_frame()]).await
    }

    /// Negatively acknowledge one or more deliveries.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.nack).
    pub async fn basic_nack(&self, args: BasicNackArguments) -> Result<()> {
        let mut nack = Nack::new(args.delivery_tag);
        nack.set_multiple(args.multiple);
        nack.set_requeue(args.requeue);
        self.send_nowait(vec![nack.into_frame()]).await
    }

    /// Reject a single delivery.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.reject).
    pub async fn basic_reject(&self, args: BasicRejectArguments) -> Result<()> {
        let reject = Reject::new(args.delivery_tag, args.requeue);
        self.send_nowait(vec![reject.into_frame()]).await
    }

    /// Redeliver unacknowledged messages, waiting for `recover-ok`.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.recover).
    pub async fn basic_recover(&self, requeue: bool) -> Result<()> {
        synchronous_request!(self, vec![Recover::new(requeue).into_frame()], Frame::RecoverOk)?;
        Ok(())
    }

    /// Fire-and-forget variant of recover, kept for servers that still
    /// speak it.
    pub async fn basic_recover_async(&self, requeue: bool) -> Result<()> {
        self.send_nowait(vec![RecoverAsync::new(requeue).into_frame()])
            .await
    }

    /// Publish `content` and return a completion handle.
    ///
    /// The method, header, and body frames are emitted as one contiguous
    /// group; bodies longer than the negotiated frame size are split at
    /// `frame_max` minus the envelope overhead. See [`PublishConfirm`] for
    /// how the handle resolves in and out of confirm mode.
    ///
    /// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#basic.publish).
    pub async fn basic_publish(
        &self,
        properties: BasicProperties,
        content: Vec<u8>,
        args: BasicPublishArguments,
    ) -> Result<PublishConfirm> {
        if !self.is_open() {
            return Err(Error::ChannelClosed);
        }
        properties.validate()?;

        let mut publish = Publish::new(
            ShortStr::try_from(args.exchange)?,
            ShortStr::try_from(args.routing_key)?,
        );
        publish.set_mandatory(args.mandatory);
        publish.set_immediate(args.immediate);

        let header = ContentHeader::new(
            ContentHeaderCommon {
                class: BASIC_CLASS,
                weight: 0,
                body_size: content.len() as u64,
            },
            properties,
        );

        let chunk_size = (self.frame_max() as usize).saturating_sub(FRAME_OVERHEAD);
        if chunk_size == 0 {
            return Err(Error::EncodingError(
                "frame_max leaves no room for a body frame".to_owned(),
            ));
        }

        let mut frames = Vec::with_capacity(2 + content.len() / chunk_size + 1);
        frames.push(publish.into_frame());
        frames.push(header.into_frame());
        for chunk in content.chunks(chunk_size) {
            frames.push(ContentBody::new(chunk.to_vec()).into_frame());
        }

        let (responder, rx) = oneshot::channel();
        self.command(DispatcherCommand::Publish { frames, responder })
            .await?;
        Ok(PublishConfirm { rx })
    }
}
