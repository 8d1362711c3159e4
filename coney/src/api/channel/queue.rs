//! Queue-class operations.

use coney_wire::types::{AmqpMessageCount, FieldTable, LongUint, ShortStr};

use crate::api::error::Result;
use crate::api::{impl_chainable_setter, synchronous_request};
use crate::frame::{BindQueue, DeclareQueue, DeleteQueue, Frame, PurgeQueue, UnbindQueue};

use super::Channel;

/// Arguments for [`Channel::queue_declare`].
///
/// The default is a server-named, transient, non-exclusive queue.
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#queue.declare).
#[derive(Debug, Clone, Default)]
pub struct QueueDeclareArguments {
    pub queue: String,
    pub passive: bool,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
    pub no_wait: bool,
    pub arguments: FieldTable,
}

impl QueueDeclareArguments {
    pub fn new(queue: &str) -> Self {
        Self {
            queue: queue.to_owned(),
            ..Default::default()
        }
    }

    impl_chainable_setter! {
        queue, String
    }
    impl_chainable_setter! {
        passive, bool
    }
    impl_chainable_setter! {
        durable, bool
    }
    impl_chainable_setter! {
        exclusive, bool
    }
    impl_chainable_setter! {
        auto_delete, bool
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

/// Arguments for [`Channel::queue_bind`].
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#queue.bind).
#[derive(Debug, Clone, Default)]
pub struct QueueBindArguments {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
    pub no_wait: bool,
    pub arguments: FieldTable,
}

impl QueueBindArguments {
    pub fn new(queue: &str, exchange: &str, routing_key: &str) -> Self {
        Self {
            queue: queue.to_owned(),
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            ..Default::default()
        }
    }

    impl_chainable_setter! {
        queue, String
    }
    impl_chainable_setter! {
        exchange, String
    }
    impl_chainable_setter! {
        routing_key, String
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

/// Arguments for [`Channel::queue_unbind`].
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#queue.unbind).
#[derive(Debug, Clone, Default)]
pub struct QueueUnbindArguments {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
    pub arguments: FieldTable,
}

impl QueueUnbindArguments {
    pub fn new(queue: &str, exchange: &str, routing_key: &str) -> Self {
        Self {
            queue: queue.to_owned(),
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            arguments: FieldTable::new(),
        }
    }

    impl_chainable_setter! {
        arguments, FieldTable
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

/// Arguments for [`Channel::queue_purge`].
#[derive(Debug, Clone, Default)]
pub struct QueuePurgeArguments {
    pub queue: String,
    pub no_wait: bool,
}

impl QueuePurgeArguments {
    pub fn new(queue: &str) -> Self {
        Self {
            queue: queue.to_owned(),
            no_wait: false,
        }
    }

    impl_chainable_setter! {
        no_wait, bool
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

/// Arguments for [`Channel::queue_delete`].
#[derive(Debug, Clone, Default)]
pub struct QueueDeleteArguments {
    pub queue: String,
    pub if_unused: bool,
    pub if_empty: bool,
    pub no_wait: bool,
}

impl QueueDeleteArguments {
    pub fn new(queue: &str) -> Self {
        Self {
            queue: queue.to_owned(),
            ..Default::default()
        }
    }

    impl_chainable_setter! {
        if_unused, bool
    }
    impl_chainable_setter! {
        if_empty, bool
    }
    impl_chainable_setter! {
        no_wait, bool
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

impl Channel {
    /// Declare a queue.
    ///
    /// With `no_wait` the server sends no reply and this returns `None`.
    /// Otherwise it returns `(queue_name, message_count, consumer_count)`;
    /// declaring with an empty name yields the server-generated name.
    pub async fn queue_declare(
        &self,
        args: QueueDeclareArguments,
    ) -> Result<Option<(String, AmqpMessageCount, LongUint)>> {
        let mut declare = DeclareQueue::new(ShortStr::try_from(args.queue)?, args.arguments);
        declare.set_passive(args.passive);
        declare.set_durable(args.durable);
        declare.set_exclusive(args.exclusive);
        declare.set_auto_delete(args.auto_delete);
        declare.set_no_wait(args.no_wait);

        if args.no_wait {
            self.send_nowait(vec![declare.into_frame()]).await?;
            Ok(None)
        } else {
            let ok =
                synchronous_request!(self, vec![declare.into_frame()], Frame::DeclareQueueOk)?;
            Ok(Some((ok.queue.into(), ok.message_count, ok.consumer_count)))
        }
    }

    /// Bind a queue to an exchange.
    pub async fn queue_bind(&self, args: QueueBindArguments) -> Result<()> {
        let bind = BindQueue {
            ticket: 0,
            queue: ShortStr::try_from(args.queue)?,
            exchange: ShortStr::try_from(args.exchange)?,
            routing_key: ShortStr::try_from(args.routing_key)?,
            nowait: args.no_wait as u8,
            arguments: args.arguments,
        };
        if args.no_wait {
            self.send_nowait(vec![bind.into_frame()]).await
        } else {
            synchronous_request!(self, vec![bind.into_frame()], Frame::BindQueueOk)?;
            Ok(())
        }
    }

    /// Remove a binding.
    pub async fn queue_unbind(&self, args: QueueUnbindArguments) -> Result<()> {
        let unbind = UnbindQueue {
            ticket: 0,
            queue: ShortStr::try_from(args.queue)?,
            exchange: ShortStr::try_from(args.exchange)?,
            routing_key: ShortStr::try_from(args.routing_key)?,
            arguments: args.arguments,
        };
        synchronous_request!(self, vec![unbind.into_frame()], Frame::UnbindQueueOk)?;
        Ok(())
    }

    /// Drop a queue's ready messages, returning how many were purged
    /// (`None` with `no_wait`).
    pub async fn queue_purge(
        &self,
        args: QueuePurgeArguments,
    ) -> Result<Option<AmqpMessageCount>> {
        let purge = PurgeQueue {
            ticket: 0,
            queue: ShortStr::try_from(args.queue)?,
            nowait: args.no_wait as u8,
        };
        if args.no_wait {
            self.send_nowait(vec![purge.into_frame()]).await?;
            Ok(None)
        } else {
            let ok = synchronous_request!(self, vec![purge.into_frame()], Frame::PurgeQueueOk)?;
            Ok(Some(ok.message_count))
        }
    }

    /// Delete a queue, returning how many messages it still held (`None`
    /// with `no_wait`).
    pub async fn queue_delete(
        &self,
        args: QueueDeleteArguments,
    ) -> Result<Option<AmqpMessageCount>> {
        let mut delete = DeleteQueue::new(ShortStr::try_from(args.queue)?);
        delete.set_if_unused(args.if_unused);
        delete.set_if_empty(args.if_empty);
        delete.set_no_wait(args.no_wait);

        if args.no_wait {
            self.send_nowait(vec![delete.into_frame()]).await?;
            Ok(None)
        } else {
            let ok = synchronous_request!(self, vec![delete.into_frame()], Frame::DeleteQueueOk)?;
            Ok(Some(ok.message_count))
        }
    }
}
