//! Exchange-class operations.

use coney_wire::types::{FieldTable, ShortStr};

use crate::api::error::Result;
use crate::api::{impl_chainable_setter, synchronous_request};
use crate::frame::{Bind, Declare, Delete, Frame, Unbind};

use super::Channel;

/// Arguments for [`Channel::exchange_declare`].
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#exchange.declare).
#[derive(Debug, Clone)]
pub struct ExchangeDeclareArguments {
    pub exchange: String,
    /// Exchange type. Default: `"direct"`.
    pub typ: String,
    pub passive: bool,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub no_wait: bool,
    pub arguments: FieldTable,
}

impl Default for ExchangeDeclareArguments {
    fn default() -> Self {
        Self {
            exchange: String::new(),
            typ: "direct".to_owned(),
            passive: false,
            durable: false,
            auto_delete: false,
            internal: false,
            no_wait: false,
            arguments: FieldTable::new(),
        }
    }
}

impl ExchangeDeclareArguments {
    pub fn new(exchange: &str, typ: &str) -> Self {
        Self {
            exchange: exchange.to_owned(),
            typ: typ.to_owned(),
            ..Default::default()
        }
    }

    impl_chainable_setter! {
        exchange, String
    }
    impl_chainable_setter! {
        typ, String
    }
    impl_chainable_setter! {
        passive, bool
    }
    impl_chainable_setter! {
        durable, bool
    }
    impl_chainable_setter! {
        auto_delete, bool
    }
    impl_chainable_setter! {
        internal, bool
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

/// Arguments for [`Channel::exchange_delete`].
#[derive(Debug, Clone, Default)]
pub struct ExchangeDeleteArguments {
    pub exchange: String,
    pub if_unused: bool,
    pub no_wait: bool,
}

impl ExchangeDeleteArguments {
    pub fn new(exchange: &str) -> Self {
        Self {
            exchange: exchange.to_owned(),
            ..Default::default()
        }
    }

    impl_chainable_setter! {
        if_unused, bool
    }
    impl_chainable_setter! {
        no_wait, bool
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }
}

/// Arguments for [`Channel::exchange_bind`] and
/// [`Channel::exchange_unbind`].
///
/// See [AMQP 0-9-1 reference](https://www.rabbitmq.com/amqp-0-9-1-reference.html#exchange.bind).
#[derive(Debug, Clone, Default)]
pub struct ExchangeBindArguments {
    pub destination: String,
    pub source: String,
    pub routing_key: String,
    pub no_wait: bool,
    pub arguments: FieldTable,
}

impl ExchangeBindArguments {
    pub fn new(destination: &str, source: &str, routing_key: &str) -> Self {
        Self {
            destination: destination.to_owned(),
            source: source.to_owned(),
            routing_key: routing_key.to_owned(),
            ..Default::default()
        }
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

impl Channel {
    /// Declare an exchange.
    pub async fn exchange_declare(&self, args: ExchangeDeclareArguments) -> Result<()> {
        let mut declare = Declare::new(
            ShortStr::try_from(args.exchange)?,
            ShortStr::try_from(args.typ)?,
            args.arguments,
        );
        declare.set_passive(args.passive);
        declare.set_durable(args.durable);
        declare.set_auto_delete(args.auto_delete);
        declare.set_internal(args.internal);
        declare.set_no_wait(args.no_wait);

        if args.no_wait {
            self.send_nowait(vec![declare.into_frame()]).await
        } else {
            synchronous_request!(self, vec![declare.into_frame()], Frame::DeclareOk)?;
            Ok(())
        }
    }

    /// Delete an exchange.
    pub async fn exchange_delete(&self, args: ExchangeDeleteArguments) -> Result<()> {
        let mut delete = Delete::new(ShortStr::try_from(args.exchange)?);
        delete.set_if_unused(args.if_unused);
        delete.set_no_wait(args.no_wait);

        if args.no_wait {
            self.send_nowait(vec![delete.into_frame()]).await
        } else {
            synchronous_request!(self, vec![delete.into_frame()], Frame::DeleteOk)?;
            Ok(())
        }
    }

    /// Bind `destination` to `source` (exchange-to-exchange routing).
    pub async fn exchange_bind(&self, args: ExchangeBindArguments) -> Result<()> {
        let bind = Bind {
            ticket: 0,
            destination: ShortStr::try_from(args.destination)?,
            source: ShortStr::try_from(args.source)?,
            routing_key: ShortStr::try_from(args.routing_key)?,
            nowait: args.no_wait as u8,
            arguments: args.arguments,
        };
        if args.no_wait {
            self.send_nowait(vec![bind.into_frame()]).await
        } else {
            synchronous_request!(self, vec![bind.into_frame()], Frame::BindOk)?;
            Ok(())
        }
    }

    /// Remove an exchange-to-exchange binding.
    pub async fn exchange_unbind(&self, args: ExchangeBindArguments) -> Result<()> {
        let unbind = Unbind {
            ticket: 0,
            destination: ShortStr::try_from(args.destination)?,
            source: ShortStr::try_from(args.source)?,
            routing_key: ShortStr::try_from(args.routing_key)?,
            nowait: args.no_wait as u8,
            arguments: args.arguments,
        };
        if args.no_wait {
            self.send_nowait(vec![unbind.into_frame()]).await
        } else {
            synchronous_request!(self, vec![unbind.into_frame()], Frame::UnbindOk)?;
            Ok(())
        }
    }
}
