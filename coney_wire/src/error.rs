use std::fmt;

use crate::types::Octet;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Message(String),
    /// Ran out of input mid-value.
    Eof,
    /// Input does not follow the grammar.
    Syntax,
    /// A string or byte run was requested without a preceding length field.
    ExpectedLength,
    /// Short strings carry a `u8` length and cannot exceed 255 bytes.
    StringTooLong(usize),
    /// Field table value tag outside the RabbitMQ 0-9-1 dialect table.
    UnknownFieldTag(Octet),
    /// A text field did not hold valid UTF-8.
    InvalidUtf8,
    /// Deserialization finished with input left over.
    TrailingBytes,
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Message(msg) => f.write_str(msg),
            Error::Eof => f.write_str("unexpected end of input"),
            Error::Syntax => f.write_str("input does not follow the AMQP grammar"),
            Error::ExpectedLength => f.write_str("string run without a preceding length"),
            Error::StringTooLong(len) => {
                write!(f, "short string of {} bytes exceeds 255", len)
            }
            Error::UnknownFieldTag(tag) => write!(f, "unknown field value tag 0x{:02x}", tag),
            Error::InvalidUtf8 => f.write_str("text field is not valid UTF-8"),
            Error::TrailingBytes => f.write_str("trailing bytes after value"),
        }
    }
}

impl std::error::Error for Error {}
