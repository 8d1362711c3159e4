use std::{fmt, io};

use coney_wire::types::{AmqpClassId, AmqpDeliveryTag, AmqpMethodId, AmqpReplyCode};

use crate::frame;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by channel and connection operations.
///
/// Cloneable so one failure can settle every waiter a teardown drains.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Operation on a channel that is closed or closing.
    ChannelClosed,
    /// Server closed the channel via `channel.close`.
    ChannelError {
        reply_code: AmqpReplyCode,
        reply_text: String,
        class_id: AmqpClassId,
        method_id: AmqpMethodId,
    },
    /// Transport fault; every channel of the connection fails with this.
    ConnectionError(String),
    /// Malformed frame, unexpected sequence, or confirm bookkeeping
    /// violation. The channel closes itself upstream when it raises this.
    ProtocolError(String),
    /// Value cannot be represented on the wire (e.g. short string > 255).
    EncodingError(String),
    /// Broker negatively acknowledged the publish with this delivery tag.
    PublishNacked(AmqpDeliveryTag),
    /// Plumbing fault that indicates a bug, never normal operation.
    InternalError(String),
}

impl From<coney_wire::Error> for Error {
    fn from(err: coney_wire::Error) -> Self {
        match err {
            coney_wire::Error::StringTooLong(_) => Error::EncodingError(err.to_string()),
            other => Error::ProtocolError(other.to_string()),
        }
    }
}

impl From<frame::Error> for Error {
    fn from(err: frame::Error) -> Self {
        match err {
            frame::Error::Wire(wire) => wire.into(),
            other => Error::ProtocolError(other.to_string()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::ConnectionError(err.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ChannelClosed => f.write_str("channel is closed"),
            Error::ChannelError {
                reply_code,
                reply_text,
                class_id,
                method_id,
            } => write!(
                f,
                "server closed channel: code={} text={} class={} method={}",
                reply_code, reply_text, class_id, method_id
            ),
            Error::ConnectionError(msg) => write!(f, "connection error: {}", msg),
            Error::ProtocolError(msg) => write!(f, "protocol error: {}", msg),
            Error::EncodingError(msg) => write!(f, "encoding error: {}", msg),
            Error::PublishNacked(tag) => write!(f, "publish nacked, delivery tag {}", tag),
            Error::InternalError(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
