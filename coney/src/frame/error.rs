use std::fmt;

use coney_wire::types::{AmqpClassId, AmqpMethodId, Octet};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Frame end octet missing or envelope malformed.
    Corrupted,
    /// Frame type octet outside METHOD/HEADER/BODY/HEARTBEAT.
    UnsupportedFrameType(Octet),
    /// Method id pair not part of the supported protocol surface.
    UnknownMethod(AmqpClassId, AmqpMethodId),
    Wire(coney_wire::Error),
}

impl From<coney_wire::Error> for Error {
    fn from(err: coney_wire::Error) -> Self {
        Self::Wire(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Corrupted => f.write_str("corrupted frame"),
            Error::UnsupportedFrameType(typ) => write!(f, "unsupported frame type {}", typ),
            Error::UnknownMethod(class_id, method_id) => {
                write!(f, "unknown method ({}, {})", class_id, method_id)
            }
            Error::Wire(err) => write!(f, "wire format error: {}", err),
        }
    }
}

impl std::error::Error for Error {}
