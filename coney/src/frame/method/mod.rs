use coney_wire::types::{AmqpClassId, AmqpMethodId};
use serde::{Deserialize, Serialize};

mod basic;
mod channel;
mod confirm;
mod connection;
mod exchange;
mod queue;
mod tx;

pub use basic::*;
pub use channel::*;
pub use confirm::*;
pub use connection::*;
pub use exchange::*;
pub use queue::*;
pub use tx::*;

/// Class and method ids preceding every method payload.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodHeader {
    class_id: AmqpClassId,
    method_id: AmqpMethodId,
}

impl MethodHeader {
    pub const fn new(class_id: AmqpClassId, method_id: AmqpMethodId) -> Self {
        Self {
            class_id,
            method_id,
        }
    }

    pub fn class_id(&self) -> AmqpClassId {
        self.class_id
    }

    pub fn method_id(&self) -> AmqpMethodId {
        self.method_id
    }
}

/// Ties a method struct to its wire identity and `Frame` variant.
macro_rules! impl_method {
    ($name:ident, $class_id:literal, $method_id:literal) => {
        impl $name {
            pub fn header() -> &'static crate::frame::MethodHeader {
                static HEADER: crate::frame::MethodHeader =
                    crate::frame::MethodHeader::new($class_id, $method_id);
                &HEADER
            }

            pub fn into_frame(self) -> crate::frame::Frame {
                crate::frame::Frame::$name(Self::header(), self)
            }
        }
    };
}
pub(crate) use impl_method;
