pub mod callbacks;
pub mod channel;
pub mod connection;
pub mod consumer;
pub mod error;

mod macros {
    /// Issue a synchronous method through the channel's RPC engine and
    /// match the expected reply variant.
    macro_rules! synchronous_request {
        ($channel:expr, $frames:expr, $reply:path) => {{
            match $channel
                .rpc($frames, crate::api::channel::RpcKind::Method)
                .await?
            {
                crate::api::channel::RpcReply::Method($reply(_, method)) => Ok(method),
                other => Err(crate::api::error::Error::ProtocolError(format!(
                    "unexpected reply {:?}",
                    other
                ))),
            }
        }};
    }

    /// Chainable setter on an arguments struct.
    macro_rules! impl_chainable_setter {
        ($(#[$meta:meta])* $field:ident, $ty:ty) => {
            $(#[$meta])*
            pub fn $field(&mut self, value: $ty) -> &mut Self {
                self.$field = value;
                self
            }
        };
    }

    pub(crate) use impl_chainable_setter;
    pub(crate) use synchronous_request;
}

pub(crate) use macros::{impl_chainable_setter, synchronous_request};
