//! AMQP 0-9-1 data type grammar, modelled as a serde data format.
//!
//! The protocol's elementary domains (octet, short, long, short string,
//! long string, field table, ...) map onto serde's data model so that
//! method payloads can derive `Serialize`/`Deserialize` and still hit the
//! wire bit-for-bit.

mod de;
mod error;
mod ser;

pub mod constants;
pub mod types;

pub use de::{from_bytes, Deserializer};
pub use error::{Error, Result};
pub use ser::{to_buffer, to_bytes, Serializer};
