use bytes::{BufMut, BytesMut};
use serde::{ser, Serialize};

use crate::error::{Error, Result};

/// Serializer appending the wire encoding to a caller-owned buffer.
///
/// Appending lets the frame layer reserve the envelope header, encode the
/// payload directly behind it, and patch the size afterwards without an
/// intermediate allocation.
pub struct Serializer<'a> {
    buf: &'a mut BytesMut,
}

/// Encode `value` onto the end of `buf`, returning the number of bytes
/// written.
pub fn to_buffer<T>(value: &T, buf: &mut BytesMut) -> Result<usize>
where
    T: Serialize,
{
    let start = buf.len();
    let mut serializer = Serializer { buf };
    value.serialize(&mut serializer)?;
    Ok(serializer.buf.len() - start)
}

/// Encode `value` into a fresh byte vector.
pub fn to_bytes<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    let mut buf = BytesMut::new();
    to_buffer(value, &mut buf)?;
    Ok(buf.to_vec())
}

impl Serializer<'_> {
    fn patch_length(&mut self, at: usize) {
        let len = (self.buf.len() - at - 4) as u32;
        self.buf[at..at + 4].copy_from_slice(&len.to_be_bytes());
    }
}

/// Compound encoder for sequences, tuples, and structs.
///
/// `length_at` is set when the run is length-prefixed (field arrays); plain
/// tuples and structs concatenate their fields with no framing of their own.
pub struct Compound<'a, 'b> {
    ser: &'b mut Serializer<'a>,
    length_at: Option<usize>,
}

/// Field tables are always prefixed with their byte length; the length is
/// reserved up front and patched once the entries are written.
pub struct MapSerializer<'a, 'b> {
    ser: &'b mut Serializer<'a>,
    length_at: usize,
}

impl<'a, 'b> ser::Serializer for &'b mut Serializer<'a> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Compound<'a, 'b>;
    type SerializeTuple = Compound<'a, 'b>;
    type SerializeTupleStruct = Compound<'a, 'b>;
    type SerializeTupleVariant = Compound<'a, 'b>;
    type SerializeMap = MapSerializer<'a, 'b>;
    type SerializeStruct = Compound<'a, 'b>;
    type SerializeStructVariant = Compound<'a, 'b>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.buf.put_u8(v as u8);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.buf.put_i8(v);
        Ok(())
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.buf.put_i16(v);
        Ok(())
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.buf.put_i32(v);
        Ok(())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.buf.put_i64(v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.buf.put_u8(v);
        Ok(())
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.buf.put_u16(v);
        Ok(())
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.buf.put_u32(v);
        Ok(())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.buf.put_u64(v);
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.buf.put_f32(v);
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.buf.put_f64(v);
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.serialize_str(&v.to_string())
    }

    // Length fields travel as separate struct members (`ShortStr`,
    // `LongStr`), so a bare string is just its bytes.
    fn serialize_str(self, v: &str) -> Result<()> {
        self.buf.put_slice(v.as_bytes());
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.buf.put_slice(v);
        Ok(())
    }

    // Absent optional values (unset basic properties) emit nothing; their
    // presence is recorded in the property flags word.
    fn serialize_none(self) -> Result<()> {
        Ok(())
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    // Unit variants are the tag byte alone (`FieldValue::V`).
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.buf.put_slice(variant.as_bytes());
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    // Tag byte, then the tagged value.
    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: Serialize,
    {
        self.buf.put_slice(variant.as_bytes());
        value.serialize(self)
    }

    // `Some(len)` is the derive path for tuples/structs: raw concatenation.
    // `None` is requested explicitly by `FieldArray` and selects the
    // length-prefixed run.
    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        let length_at = match len {
            Some(_) => None,
            None => {
                let at = self.buf.len();
                self.buf.put_u32(0);
                Some(at)
            }
        };
        Ok(Compound {
            ser: self,
            length_at,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.buf.put_slice(variant.as_bytes());
        self.serialize_seq(Some(len))
    }

    // Field tables: reserve the `u32` byte length, patch it in `end`.
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        let length_at = self.buf.len();
        self.buf.put_u32(0);
        Ok(MapSerializer {
            ser: self,
            length_at,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.buf.put_slice(variant.as_bytes());
        self.serialize_seq(Some(len))
    }
}

impl ser::SerializeSeq for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<()> {
        if let Some(at) = self.length_at {
            self.ser.patch_length(at);
        }
        Ok(())
    }
}

macro_rules! impl_compound {
    ($trait:ident, $method:ident) => {
        impl ser::$trait for Compound<'_, '_> {
            type Ok = ();
            type Error = Error;

            fn $method<T: ?Sized>(&mut self, value: &T) -> Result<()>
            where
                T: Serialize,
            {
                value.serialize(&mut *self.ser)
            }

            fn end(self) -> Result<()> {
                if let Some(at) = self.length_at {
                    self.ser.patch_length(at);
                }
                Ok(())
            }
        }
    };
}

impl_compound!(SerializeTuple, serialize_element);
impl_compound!(SerializeTupleStruct, serialize_field);
impl_compound!(SerializeTupleVariant, serialize_field);

macro_rules! impl_compound_keyed {
    ($trait:ident) => {
        impl ser::$trait for Compound<'_, '_> {
            type Ok = ();
            type Error = Error;

            fn serialize_field<T: ?Sized>(&mut self, _key: &'static str, value: &T) -> Result<()>
            where
                T: Serialize,
            {
                value.serialize(&mut *self.ser)
            }

            fn end(self) -> Result<()> {
                if let Some(at) = self.length_at {
                    self.ser.patch_length(at);
                }
                Ok(())
            }
        }
    };
}

impl_compound_keyed!(SerializeStruct);
impl_compound_keyed!(SerializeStructVariant);

impl ser::SerializeMap for MapSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize,
    {
        key.serialize(&mut *self.ser)
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<()> {
        self.ser.patch_length(self.length_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FRAME_END;
    use crate::types::*;

    #[test]
    fn frame_shaped_struct_hits_the_wire() {
        #[derive(Serialize)]
        struct Envelope {
            type_id: Octet,
            channel_id: ShortUint,
            size: LongUint,
            payload: LongStr,
            end: Octet,
        }

        let envelope = Envelope {
            type_id: 1,
            channel_id: 2,
            size: 3,
            payload: "ABCD".try_into().unwrap(),
            end: FRAME_END,
        };
        let expected = vec![
            0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x04, b'A', b'B', b'C',
            b'D', 0xCE,
        ];
        assert_eq!(to_bytes(&envelope).unwrap(), expected);
    }

    #[test]
    fn field_table_entries_carry_name_tag_value() {
        let mut table = FieldTable::new();
        table.insert("A".try_into().unwrap(), FieldValue::t(1));

        let encoded = to_bytes(&table).unwrap();
        assert_eq!(encoded, vec![0x00, 0x00, 0x00, 0x04, 0x01, b'A', b't', 0x01]);
    }

    #[test]
    fn field_table_length_counts_all_entries() {
        let mut table = FieldTable::new();
        table.insert("A".try_into().unwrap(), FieldValue::t(1));
        table.insert("B".try_into().unwrap(), FieldValue::u(9));
        table.insert("C".try_into().unwrap(), FieldValue::f(1.5));
        table.insert("D".try_into().unwrap(), FieldValue::V);

        let encoded = to_bytes(&table).unwrap();
        // 4 + 5 + 7 + 3 entry bytes
        assert_eq!(encoded[..4], [0x00, 0x00, 0x00, 19]);
        assert_eq!(encoded.len(), 4 + 19);

        // HashMap iteration order is arbitrary; locate each entry by name.
        let a = encoded.iter().position(|b| *b == b'A').unwrap();
        assert_eq!(encoded[a - 1..a + 3], [0x01, b'A', b't', 0x01]);
        let b = encoded.iter().position(|b| *b == b'B').unwrap();
        assert_eq!(encoded[b - 1..b + 4], [0x01, b'B', b'u', 0x00, 0x09]);
        let c = encoded.iter().position(|b| *b == b'C').unwrap();
        assert_eq!(
            encoded[c - 1..c + 6],
            [0x01, b'C', b'f', 0x3F, 0xC0, 0x00, 0x00]
        );
        let d = encoded.iter().position(|b| *b == b'D').unwrap();
        assert_eq!(encoded[d - 1..d + 2], [0x01, b'D', b'V']);
    }

    #[test]
    fn field_array_is_byte_length_prefixed() {
        let array = FieldArray(vec![FieldValue::B(7), FieldValue::t(0)]);
        let encoded = to_bytes(&FieldValue::A(array)).unwrap();
        // tag, u32 byte length, then tagged items
        assert_eq!(
            encoded,
            vec![b'A', 0x00, 0x00, 0x00, 0x04, b'B', 0x07, b't', 0x00]
        );
    }

    #[test]
    fn decimal_is_scale_then_mantissa() {
        let encoded = to_bytes(&FieldValue::D(DecimalValue::new(2, 512))).unwrap();
        assert_eq!(encoded, vec![b'D', 0x02, 0x00, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn nested_table_recurses() {
        let mut inner = FieldTable::new();
        inner.insert("k".try_into().unwrap(), FieldValue::V);
        let encoded = to_bytes(&FieldValue::F(inner)).unwrap();
        assert_eq!(encoded, vec![b'F', 0x00, 0x00, 0x00, 0x03, 0x01, b'k', b'V']);
    }

    #[test]
    fn buffer_reuse_appends() {
        let mut buf = BytesMut::new();
        let first = to_buffer(&1u16, &mut buf).unwrap();
        let second = to_buffer(&2u8, &mut buf).unwrap();
        assert_eq!((first, second), (2, 1));
        assert_eq!(&buf[..], &[0x00, 0x01, 0x02]);
    }
}
