//! Typed views of the AMQP 0-9-1 elementary domains.
//!
//! Integer widths follow the protocol names: octet, short, long, long-long.
//! Strings carry their length field explicitly so the serde format can emit
//! and consume them without out-of-band information.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type Octet = u8;
/// 0 is false, anything else is true.
pub type Boolean = Octet;
pub type ShortShortUint = u8;
pub type ShortShortInt = i8;
pub type ShortUint = u16;
pub type ShortInt = i16;
pub type LongUint = u32;
pub type LongInt = i32;
pub type LongLongUint = u64;
pub type LongLongInt = i64;
/// Seconds since the epoch.
pub type TimeStamp = u64;
pub type Float = f32;
pub type Double = f64;

// Named domains used across method definitions.
pub type AmqpChannelId = ShortUint;
pub type AmqpClassId = ShortUint;
pub type AmqpMethodId = ShortUint;
pub type AmqpDeliveryTag = LongLongUint;
pub type AmqpReplyCode = ShortUint;
pub type AmqpMessageCount = LongUint;
pub type AmqpQueueName = ShortStr;
pub type AmqpExchangeName = ShortStr;
pub type AmqpConsumerTag = ShortStr;

/// `u8` length followed by that many bytes of UTF-8.
///
/// Constructors are fallible: the length field caps the payload at 255
/// bytes, and handing out anything longer would corrupt the stream.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone, Default)]
pub struct ShortStr(Octet, String);

impl ShortStr {
    pub fn as_str(&self) -> &str {
        &self.1
    }

    pub fn len(&self) -> usize {
        self.1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.1.is_empty()
    }
}

impl TryFrom<String> for ShortStr {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let len = Octet::try_from(s.len()).map_err(|_| Error::StringTooLong(s.len()))?;
        Ok(Self(len, s))
    }
}

impl TryFrom<&str> for ShortStr {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.to_owned().try_into()
    }
}

impl From<ShortStr> for String {
    fn from(s: ShortStr) -> Self {
        s.1
    }
}

impl AsRef<str> for ShortStr {
    fn as_ref(&self) -> &str {
        &self.1
    }
}

impl fmt::Display for ShortStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.1)
    }
}

/// `u32` length followed by that many bytes.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone, Default)]
pub struct LongStr(LongUint, String);

impl LongStr {
    pub fn as_str(&self) -> &str {
        &self.1
    }

    pub fn len(&self) -> usize {
        self.1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.1.is_empty()
    }
}

impl TryFrom<String> for LongStr {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let len = LongUint::try_from(s.len()).map_err(|_| Error::StringTooLong(s.len()))?;
        Ok(Self(len, s))
    }
}

impl TryFrom<&str> for LongStr {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.to_owned().try_into()
    }
}

impl From<LongStr> for String {
    fn from(s: LongStr) -> Self {
        s.1
    }
}

impl AsRef<str> for LongStr {
    fn as_ref(&self) -> &str {
        &self.1
    }
}

impl fmt::Display for LongStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.1)
    }
}

/// Scale octet plus unsigned mantissa.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct DecimalValue(Octet, LongUint);

impl DecimalValue {
    pub fn new(scale: Octet, value: LongUint) -> Self {
        Self(scale, value)
    }

    pub fn scale(&self) -> Octet {
        self.0
    }

    pub fn value(&self) -> LongUint {
        self.1
    }
}

// Field value tags per the RabbitMQ 0-9-1 dialect:
//
//   t bool   b i8    B u8    s i16   u u16   I i32   i u32   l i64
//   f f32    d f64   D decimal       S longstr       A array
//   T timestamp      F nested table  V void
//
// Variant names are the wire tags; the serializer emits the variant name
// byte, the deserializer matches on it.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[allow(non_camel_case_types)]
pub enum FieldValue {
    t(Boolean),
    b(ShortShortInt),
    B(ShortShortUint),
    s(ShortInt),
    u(ShortUint),
    I(LongInt),
    i(LongUint),
    l(LongLongInt),
    f(Float),
    d(Double),
    D(DecimalValue),
    S(LongStr),
    A(FieldArray),
    T(TimeStamp),
    F(FieldTable),
    V,
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::t(v as Boolean)
    }
}

impl From<LongStr> for FieldValue {
    fn from(v: LongStr) -> Self {
        FieldValue::S(v)
    }
}

/// Wire tags accepted when decoding a field value.
pub(crate) const FIELD_VALUE_TAGS: &[u8] = b"tbBsuIilfdDSATFV";

pub type FieldName = ShortStr;
pub type FieldTable = HashMap<FieldName, FieldValue>;

/// Field array: `u32` byte length followed by packed field values.
///
/// The length is computed while encoding and consumed as a boundary while
/// decoding; callers only ever see the values.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct FieldArray(pub Vec<FieldValue>);

impl Serialize for FieldArray {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        // `None` selects the length-prefixed encoding in this format.
        let mut seq = serializer.serialize_seq(None)?;
        for value in &self.0 {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for FieldArray {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ArrayVisitor;

        impl<'de> serde::de::Visitor<'de> for ArrayVisitor {
            type Value = FieldArray;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an AMQP field array")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut values = Vec::new();
                while let Some(value) = seq.next_element()? {
                    values.push(value);
                }
                Ok(FieldArray(values))
            }
        }

        deserializer.deserialize_seq(ArrayVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_str_rejects_overlong_input() {
        let s = "x".repeat(256);
        assert_eq!(
            ShortStr::try_from(s).unwrap_err(),
            Error::StringTooLong(256)
        );
    }

    #[test]
    fn short_str_accepts_255_bytes() {
        let s = "y".repeat(255);
        let short: ShortStr = s.clone().try_into().unwrap();
        assert_eq!(short.as_str(), s);
    }
}
