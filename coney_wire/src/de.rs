use serde::de::{
    self, Deserialize, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};

use crate::error::{Error, Result};
use crate::types::FIELD_VALUE_TAGS;

/// Deserializer over a borrowed payload slice.
///
/// AMQP is not self-describing: every value is decoded against the type the
/// caller asks for. Strings and byte runs are preceded by an integer length
/// field in the containing struct; the most recently decoded `u8`/`u32` is
/// remembered so the following run knows how far to read.
pub struct Deserializer<'de> {
    input: &'de [u8],
    pos: usize,
    pending_len: Option<usize>,
}

impl<'de> Deserializer<'de> {
    pub fn from_bytes(input: &'de [u8]) -> Self {
        Deserializer {
            input,
            pos: 0,
            pending_len: None,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'de [u8]> {
        if self.input.len() - self.pos < n {
            return Err(Error::Eof);
        }
        let run = &self.input[self.pos..self.pos + n];
        self.pos += n;
        Ok(run)
    }

    fn take_pending(&mut self) -> Result<&'de [u8]> {
        let len = self.pending_len.take().ok_or(Error::ExpectedLength)?;
        self.take(len)
    }
}

/// Decode a `T` from `input`, requiring the whole slice to be consumed.
pub fn from_bytes<'a, T>(input: &'a [u8]) -> Result<T>
where
    T: Deserialize<'a>,
{
    let mut deserializer = Deserializer::from_bytes(input);
    let value = T::deserialize(&mut deserializer)?;
    if deserializer.pos == input.len() {
        Ok(value)
    } else {
        Err(Error::TrailingBytes)
    }
}

macro_rules! impl_read_num {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self) -> Result<$ty> {
            let mut raw = [0u8; std::mem::size_of::<$ty>()];
            raw.copy_from_slice(self.take(std::mem::size_of::<$ty>())?);
            Ok(<$ty>::from_be_bytes(raw))
        }
    };
}

impl<'de> Deserializer<'de> {
    impl_read_num!(read_u8, u8);
    impl_read_num!(read_i8, i8);
    impl_read_num!(read_u16, u16);
    impl_read_num!(read_i16, i16);
    impl_read_num!(read_u32, u32);
    impl_read_num!(read_i32, i32);
    impl_read_num!(read_u64, u64);
    impl_read_num!(read_i64, i64);
    impl_read_num!(read_f32, f32);
    impl_read_num!(read_f64, f64);
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = Error;

    // Nothing on the wire announces its own type.
    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        Err(Error::Syntax)
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_bool(self.read_u8()? != 0)
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_i8(self.read_i8()?)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_i16(self.read_i16()?)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_i32(self.read_i32()?)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_i64(self.read_i64()?)
    }

    // `u8` and `u32` double as the length fields of short and long runs.
    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let v = self.read_u8()?;
        self.pending_len = Some(v as usize);
        visitor.visit_u8(v)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_u16(self.read_u16()?)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let v = self.read_u32()?;
        self.pending_len = Some(v as usize);
        visitor.visit_u32(v)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_u64(self.read_u64()?)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_f32(self.read_f32()?)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.pending_len = None;
        visitor.visit_f64(self.read_f64()?)
    }

    fn deserialize_char<V>(self, _visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        Err(Error::Syntax)
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let run = self.take_pending()?;
        let s = std::str::from_utf8(run).map_err(|_| Error::InvalidUtf8)?;
        visitor.visit_borrowed_str(s)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let run = self.take_pending()?;
        visitor.visit_borrowed_bytes(run)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    // Presence of optional values (basic properties) is decided by the
    // caller from the flags word; when one is requested it exists.
    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    // Sequences only occur as field arrays: a `u32` byte length bounds the
    // packed values.
    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let len = self.read_u32()? as usize;
        self.pending_len = None;
        if self.input.len() - self.pos < len {
            return Err(Error::Eof);
        }
        let end = self.pos + len;
        let value = visitor.visit_seq(Bounded { de: &mut *self, end })?;
        if self.pos != end {
            return Err(Error::Syntax);
        }
        Ok(value)
    }

    // Tuples and structs are field concatenations driven by the visitor.
    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(Fields { de: &mut *self })
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(Fields { de: &mut *self })
    }

    // Field tables: a `u32` byte length bounds the name/tag/value entries.
    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let len = self.read_u32()? as usize;
        self.pending_len = None;
        if self.input.len() - self.pos < len {
            return Err(Error::Eof);
        }
        let end = self.pos + len;
        let value = visitor.visit_map(Bounded { de: &mut *self, end })?;
        if self.pos != end {
            return Err(Error::Syntax);
        }
        Ok(value)
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(Fields { de: &mut *self })
    }

    // Field values: one tag byte selects the variant.
    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let tag = self.read_u8()?;
        self.pending_len = None;
        if !FIELD_VALUE_TAGS.contains(&tag) {
            return Err(Error::UnknownFieldTag(tag));
        }
        visitor.visit_enum(FieldTag { de: self, tag })
    }

    fn deserialize_identifier<V>(self, _visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        Err(Error::Syntax)
    }

    fn deserialize_ignored_any<V>(self, _visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        Err(Error::Syntax)
    }
}

/// Visitor-driven field access for tuples and structs.
struct Fields<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'de> SeqAccess<'de> for Fields<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de).map(Some)
    }
}

/// Byte-length-bounded access for field tables and arrays.
struct Bounded<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    end: usize,
}

impl<'de> SeqAccess<'de> for Bounded<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.de.pos >= self.end {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

impl<'de> MapAccess<'de> for Bounded<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if self.de.pos >= self.end {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }
}

struct FieldTag<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    tag: u8,
}

impl<'de, 'a> EnumAccess<'de> for FieldTag<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        // owned so the variant name is not tied to the input lifetime
        let name = (self.tag as char).to_string();
        let value = seed.deserialize(name.into_deserializer())?;
        Ok((value, self))
    }
}

impl<'de> VariantAccess<'de> for FieldTag<'_, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V>(self, _len: usize, _visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        Err(Error::Syntax)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], _visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        Err(Error::Syntax)
    }
}

#[cfg(test)]
mod tests {
    use crate::types::*;
    use crate::{from_bytes, to_bytes, Error};

    fn table_with(name: &str, value: FieldValue) -> FieldTable {
        let mut table = FieldTable::new();
        table.insert(name.try_into().unwrap(), value);
        table
    }

    #[test]
    fn short_str_round_trip() {
        let s: ShortStr = "queue-name".try_into().unwrap();
        let decoded: ShortStr = from_bytes(&to_bytes(&s).unwrap()).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn every_field_value_tag_round_trips() {
        let mut nested = FieldTable::new();
        nested.insert("inner".try_into().unwrap(), FieldValue::u(65535));

        let values = vec![
            FieldValue::t(1),
            FieldValue::b(-8),
            FieldValue::B(200),
            FieldValue::s(-31000),
            FieldValue::u(31000),
            FieldValue::I(-2_000_000),
            FieldValue::i(4_000_000_000),
            FieldValue::l(-9_000_000_000),
            FieldValue::f(2.25),
            FieldValue::d(-0.5),
            FieldValue::D(DecimalValue::new(3, 123_456)),
            FieldValue::S("long string value".try_into().unwrap()),
            FieldValue::A(FieldArray(vec![FieldValue::t(0), FieldValue::i(42)])),
            FieldValue::T(1_640_035_100),
            FieldValue::F(nested),
            FieldValue::V,
        ];

        for value in values {
            let table = table_with("k", value);
            let encoded = to_bytes(&table).unwrap();
            let decoded: FieldTable = from_bytes(&encoded).unwrap();
            assert_eq!(decoded, table);
            // single-entry tables are order-free: the bytes round-trip too
            assert_eq!(to_bytes(&decoded).unwrap(), encoded);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        // name "k", then tag 'Z'
        let bytes = [0x00, 0x00, 0x00, 0x03, 0x01, b'k', b'Z'];
        let result: Result<FieldTable, _> = from_bytes(&bytes);
        assert_eq!(result.unwrap_err(), Error::UnknownFieldTag(b'Z'));
    }

    #[test]
    fn truncated_table_is_eof() {
        // claims 10 bytes of entries, supplies 3
        let bytes = [0x00, 0x00, 0x00, 0x0A, 0x01, b'k', b'V'];
        let result: Result<FieldTable, _> = from_bytes(&bytes);
        assert_eq!(result.unwrap_err(), Error::Eof);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let bytes = [0x00, 0x05, 0xFF];
        let result: Result<ShortUint, _> = from_bytes(&bytes);
        assert_eq!(result.unwrap_err(), Error::TrailingBytes);
    }

    #[test]
    fn invalid_utf8_in_short_str() {
        let bytes = [0x02, 0xC3, 0x28];
        let result: Result<ShortStr, _> = from_bytes(&bytes);
        assert_eq!(result.unwrap_err(), Error::InvalidUtf8);
    }

    #[test]
    fn bool_decodes_any_nonzero() {
        let decoded: bool = from_bytes(&[0x05]).unwrap();
        assert!(decoded);
    }
}
