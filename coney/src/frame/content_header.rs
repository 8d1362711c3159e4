use std::fmt;

use coney_wire::types::{FieldTable, LongLongUint, Octet, ShortStr, ShortUint, TimeStamp};
use serde::de::Visitor;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

use super::Frame;

/// Content header frame payload: fixed part plus the property list.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContentHeader {
    pub common: ContentHeaderCommon,
    pub basic_properties: BasicProperties,
}

impl ContentHeader {
    pub fn new(common: ContentHeaderCommon, basic_properties: BasicProperties) -> Self {
        Self {
            common,
            basic_properties,
        }
    }

    pub fn into_frame(self) -> Frame {
        Frame::ContentHeader(self)
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ContentHeaderCommon {
    pub class: ShortUint,
    pub weight: ShortUint,
    pub body_size: LongLongUint,
}

// Property presence bits, MSB first across the 16-bit flags word.
mod flag {
    pub mod first {
        pub const CONTENT_TYPE: u8 = 1 << 7;
        pub const CONTENT_ENCODING: u8 = 1 << 6;
        pub const HEADERS: u8 = 1 << 5;
        pub const DELIVERY_MODE: u8 = 1 << 4;
        pub const PRIORITY: u8 = 1 << 3;
        pub const CORRELATION_ID: u8 = 1 << 2;
        pub const REPLY_TO: u8 = 1 << 1;
        pub const EXPIRATION: u8 = 1 << 0;
    }
    pub mod second {
        pub const MESSAGE_ID: u8 = 1 << 7;
        pub const TIMESTAMP: u8 = 1 << 6;
        pub const TYP: u8 = 1 << 5;
        pub const USER_ID: u8 = 1 << 4;
        pub const APP_ID: u8 = 1 << 3;
        pub const CLUSTER_ID: u8 = 1 << 2;
    }
}

/// The 14 standard properties of the basic content class.
///
/// The flags word travels inside the struct so the encoded form and the
/// option fields can never disagree; the chainable `with_*` setters keep
/// both in step. String fields are validated against the short-string
/// limit at encode time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicProperties {
    property_flags: [Octet; 2],
    content_type: Option<String>,
    content_encoding: Option<String>,
    headers: Option<FieldTable>,
    delivery_mode: Option<Octet>,
    priority: Option<Octet>,
    correlation_id: Option<String>,
    reply_to: Option<String>,
    expiration: Option<String>,
    message_id: Option<String>,
    timestamp: Option<TimeStamp>,
    typ: Option<String>,
    user_id: Option<String>,
    app_id: Option<String>,
    cluster_id: Option<String>,
}

impl BasicProperties {
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.property_flags[0] |= flag::first::CONTENT_TYPE;
        self.content_type = Some(content_type.to_owned());
        self
    }

    pub fn with_content_encoding(mut self, content_encoding: &str) -> Self {
        self.property_flags[0] |= flag::first::CONTENT_ENCODING;
        self.content_encoding = Some(content_encoding.to_owned());
        self
    }

    pub fn with_headers(mut self, headers: FieldTable) -> Self {
        self.property_flags[0] |= flag::first::HEADERS;
        self.headers = Some(headers);
        self
    }

    pub fn with_delivery_mode(mut self, delivery_mode: Octet) -> Self {
        self.property_flags[0] |= flag::first::DELIVERY_MODE;
        self.delivery_mode = Some(delivery_mode);
        self
    }

    pub fn with_priority(mut self, priority: Octet) -> Self {
        self.property_flags[0] |= flag::first::PRIORITY;
        self.priority = Some(priority);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        self.property_flags[0] |= flag::first::CORRELATION_ID;
        self.correlation_id = Some(correlation_id.to_owned());
        self
    }

    pub fn with_reply_to(mut self, reply_to: &str) -> Self {
        self.property_flags[0] |= flag::first::REPLY_TO;
        self.reply_to = Some(reply_to.to_owned());
        self
    }

    pub fn with_expiration(mut self, expiration: &str) -> Self {
        self.property_flags[0] |= flag::first::EXPIRATION;
        self.expiration = Some(expiration.to_owned());
        self
    }

    pub fn with_message_id(mut self, message_id: &str) -> Self {
        self.property_flags[1] |= flag::second::MESSAGE_ID;
        self.message_id = Some(message_id.to_owned());
        self
    }

    pub fn with_timestamp(mut self, timestamp: TimeStamp) -> Self {
        self.property_flags[1] |= flag::second::TIMESTAMP;
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_typ(mut self, typ: &str) -> Self {
        self.property_flags[1] |= flag::second::TYP;
        self.typ = Some(typ.to_owned());
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.property_flags[1] |= flag::second::USER_ID;
        self.user_id = Some(user_id.to_owned());
        self
    }

    pub fn with_app_id(mut self, app_id: &str) -> Self {
        self.property_flags[1] |= flag::second::APP_ID;
        self.app_id = Some(app_id.to_owned());
        self
    }

    pub fn with_cluster_id(mut self, cluster_id: &str) -> Self {
        self.property_flags[1] |= flag::second::CLUSTER_ID;
        self.cluster_id = Some(cluster_id.to_owned());
        self
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }

    /// Check every string property against the short-string limit, so a
    /// publish can be refused before any of its frames are written.
    pub fn validate(&self) -> Result<(), coney_wire::Error> {
        let strings = [
            &self.content_type,
            &self.content_encoding,
            &self.correlation_id,
            &self.reply_to,
            &self.expiration,
            &self.message_id,
            &self.typ,
            &self.user_id,
            &self.app_id,
            &self.cluster_id,
        ];
        for value in strings.into_iter().flatten() {
            if value.len() > u8::MAX as usize {
                return Err(coney_wire::Error::StringTooLong(value.len()));
            }
        }
        Ok(())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.content_encoding.as_deref()
    }

    pub fn headers(&self) -> Option<&FieldTable> {
        self.headers.as_ref()
    }

    pub fn delivery_mode(&self) -> Option<Octet> {
        self.delivery_mode
    }

    pub fn priority(&self) -> Option<Octet> {
        self.priority
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn expiration(&self) -> Option<&str> {
        self.expiration.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn timestamp(&self) -> Option<TimeStamp> {
        self.timestamp
    }

    pub fn typ(&self) -> Option<&str> {
        self.typ.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id.as_deref()
    }
}

impl Serialize for BasicProperties {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        fn short<E: serde::ser::Error>(v: &str) -> Result<ShortStr, E> {
            ShortStr::try_from(v).map_err(E::custom)
        }

        let mut state = serializer.serialize_struct("BasicProperties", 15)?;
        state.serialize_field("property_flags", &self.property_flags)?;
        if let Some(v) = &self.content_type {
            state.serialize_field("content_type", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = &self.content_encoding {
            state.serialize_field("content_encoding", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = &self.headers {
            state.serialize_field("headers", v)?;
        }
        if let Some(v) = self.delivery_mode {
            state.serialize_field("delivery_mode", &v)?;
        }
        if let Some(v) = self.priority {
            state.serialize_field("priority", &v)?;
        }
        if let Some(v) = &self.correlation_id {
            state.serialize_field("correlation_id", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = &self.reply_to {
            state.serialize_field("reply_to", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = &self.expiration {
            state.serialize_field("expiration", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = &self.message_id {
            state.serialize_field("message_id", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = self.timestamp {
            state.serialize_field("timestamp", &v)?;
        }
        if let Some(v) = &self.typ {
            state.serialize_field("typ", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = &self.user_id {
            state.serialize_field("user_id", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = &self.app_id {
            state.serialize_field("app_id", &short::<S::Error>(v)?)?;
        }
        if let Some(v) = &self.cluster_id {
            state.serialize_field("cluster_id", &short::<S::Error>(v)?)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for BasicProperties {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = BasicProperties;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("basic properties")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                fn next<'de, A, T>(seq: &mut A) -> Result<T, A::Error>
                where
                    A: serde::de::SeqAccess<'de>,
                    T: Deserialize<'de>,
                {
                    seq.next_element()?
                        .ok_or_else(|| serde::de::Error::custom("property list cut short"))
                }

                let flags: [Octet; 2] = next(&mut seq)?;
                let mut props = BasicProperties {
                    property_flags: flags,
                    ..Default::default()
                };
                if flags[0] & flag::first::CONTENT_TYPE != 0 {
                    props.content_type = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[0] & flag::first::CONTENT_ENCODING != 0 {
                    props.content_encoding = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[0] & flag::first::HEADERS != 0 {
                    props.headers = Some(next(&mut seq)?);
                }
                if flags[0] & flag::first::DELIVERY_MODE != 0 {
                    props.delivery_mode = Some(next(&mut seq)?);
                }
                if flags[0] & flag::first::PRIORITY != 0 {
                    props.priority = Some(next(&mut seq)?);
                }
                if flags[0] & flag::first::CORRELATION_ID != 0 {
                    props.correlation_id = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[0] & flag::first::REPLY_TO != 0 {
                    props.reply_to = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[0] & flag::first::EXPIRATION != 0 {
                    props.expiration = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[1] & flag::second::MESSAGE_ID != 0 {
                    props.message_id = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[1] & flag::second::TIMESTAMP != 0 {
                    props.timestamp = Some(next(&mut seq)?);
                }
                if flags[1] & flag::second::TYP != 0 {
                    props.typ = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[1] & flag::second::USER_ID != 0 {
                    props.user_id = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[1] & flag::second::APP_ID != 0 {
                    props.app_id = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                if flags[1] & flag::second::CLUSTER_ID != 0 {
                    props.cluster_id = Some(next::<A, ShortStr>(&mut seq)?.into());
                }
                Ok(props)
            }
        }

        const FIELDS: &[&str] = &[
            "property_flags",
            "content_type",
            "content_encoding",
            "headers",
            "delivery_mode",
            "priority",
            "correlation_id",
            "reply_to",
            "expiration",
            "message_id",
            "timestamp",
            "typ",
            "user_id",
            "app_id",
            "cluster_id",
        ];
        deserializer.deserialize_struct("BasicProperties", FIELDS, PropertiesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coney_wire::{from_bytes, to_bytes};

    #[test]
    fn empty_properties_are_two_zero_flag_bytes() {
        let props = BasicProperties::default();
        assert_eq!(to_bytes(&props).unwrap(), vec![0x00, 0x00]);
    }

    #[test]
    fn flags_word_tracks_setters() {
        let props = BasicProperties::default()
            .with_content_type("text/plain")
            .with_delivery_mode(2)
            .finish();
        let encoded = to_bytes(&props).unwrap();
        // content-type bit 15, delivery-mode bit 12
        assert_eq!(encoded[0], 0b1001_0000);
        assert_eq!(encoded[1], 0x00);
        assert_eq!(encoded[2] as usize, "text/plain".len());
    }

    #[test]
    fn properties_round_trip() {
        let props = BasicProperties::default()
            .with_content_type("application/json")
            .with_correlation_id("corr-7")
            .with_timestamp(1_640_035_100)
            .with_app_id("coney")
            .finish();
        let decoded: BasicProperties = from_bytes(&to_bytes(&props).unwrap()).unwrap();
        assert_eq!(decoded, props);
    }

    #[test]
    fn overlong_property_fails_to_encode() {
        let props = BasicProperties::default()
            .with_correlation_id(&"c".repeat(300))
            .finish();
        assert!(to_bytes(&props).is_err());
    }
}
