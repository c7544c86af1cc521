//! A serde `Serializer` that builds [`AttributeValue`]s directly.
//!
//! Strings become `S`, numbers `N`, booleans `BOOL`, `None` and unit `NULL`,
//! byte slices `B`, sequences `L` and structs or maps `M`. Attribute values
//! nested anywhere in the record are kept as they are.

use std::collections::HashMap;
use std::fmt::Display;

use serde::Serialize;
use serde::ser::{self, Impossible};

use crate::attribute_value::{AttributeValue, WIRE_MARKER, untag};
use crate::convert::ConvertError;

impl ser::Error for ConvertError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Message(msg.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AttributeValueSerializer;

fn number(value: impl Display) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

/// Wrap `value` as `{variant: value}` for enum variants carrying data.
fn tag_variant(variant: Option<&'static str>, value: AttributeValue) -> AttributeValue {
    match variant {
        Some(name) => AttributeValue::M(HashMap::from([(name.to_owned(), value)])),
        None => value,
    }
}

impl ser::Serializer for AttributeValueSerializer {
    type Ok = AttributeValue;
    type Error = ConvertError;

    type SerializeSeq = ListSerializer;
    type SerializeTuple = ListSerializer;
    type SerializeTupleStruct = ListSerializer;
    type SerializeTupleVariant = ListSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = MapSerializer;

    fn serialize_bool(self, v: bool) -> Result<AttributeValue, ConvertError> {
        Ok(AttributeValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_i16(self, v: i16) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_i32(self, v: i32) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_i64(self, v: i64) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_i128(self, v: i128) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_u8(self, v: u8) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_u16(self, v: u16) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_u32(self, v: u32) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_u64(self, v: u64) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_u128(self, v: u128) -> Result<AttributeValue, ConvertError> {
        Ok(number(v))
    }

    fn serialize_f32(self, v: f32) -> Result<AttributeValue, ConvertError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<AttributeValue, ConvertError> {
        if !v.is_finite() {
            return Err(ConvertError::InvalidNumber(v.to_string()));
        }
        Ok(number(v))
    }

    fn serialize_char(self, v: char) -> Result<AttributeValue, ConvertError> {
        Ok(AttributeValue::S(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<AttributeValue, ConvertError> {
        Ok(AttributeValue::S(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<AttributeValue, ConvertError> {
        Ok(AttributeValue::B(bytes::Bytes::copy_from_slice(v)))
    }

    fn serialize_none(self) -> Result<AttributeValue, ConvertError> {
        Ok(AttributeValue::Null(true))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<AttributeValue, ConvertError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<AttributeValue, ConvertError> {
        Ok(AttributeValue::Null(true))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<AttributeValue, ConvertError> {
        Ok(AttributeValue::Null(true))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<AttributeValue, ConvertError> {
        Ok(AttributeValue::S(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<AttributeValue, ConvertError> {
        if name != WIRE_MARKER {
            return value.serialize(self);
        }
        match value.serialize(self)? {
            AttributeValue::M(tagged) => untag(tagged).map_err(|entries| {
                ConvertError::Message(format!(
                    "malformed attribute value with keys {:?}",
                    entries.keys().collect::<Vec<_>>()
                ))
            }),
            other => Err(ConvertError::Message(format!(
                "malformed attribute value of type {}",
                other.type_descriptor()
            ))),
        }
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<AttributeValue, ConvertError> {
        Ok(tag_variant(Some(variant), value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<ListSerializer, ConvertError> {
        Ok(ListSerializer::new(len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<ListSerializer, ConvertError> {
        Ok(ListSerializer::new(len, None))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<ListSerializer, ConvertError> {
        Ok(ListSerializer::new(len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<ListSerializer, ConvertError> {
        Ok(ListSerializer::new(len, Some(variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapSerializer, ConvertError> {
        Ok(MapSerializer::new(len.unwrap_or(0), None))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<MapSerializer, ConvertError> {
        Ok(MapSerializer::new(len, None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapSerializer, ConvertError> {
        Ok(MapSerializer::new(len, Some(variant)))
    }
}

pub(crate) struct ListSerializer {
    items: Vec<AttributeValue>,
    variant: Option<&'static str>,
}

impl ListSerializer {
    fn new(len: usize, variant: Option<&'static str>) -> Self {
        Self {
            items: Vec::with_capacity(len),
            variant,
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConvertError> {
        self.items.push(value.serialize(AttributeValueSerializer)?);
        Ok(())
    }

    fn finish(self) -> AttributeValue {
        tag_variant(self.variant, AttributeValue::L(self.items))
    }
}

impl ser::SerializeSeq for ListSerializer {
    type Ok = AttributeValue;
    type Error = ConvertError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConvertError> {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, ConvertError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for ListSerializer {
    type Ok = AttributeValue;
    type Error = ConvertError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConvertError> {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, ConvertError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for ListSerializer {
    type Ok = AttributeValue;
    type Error = ConvertError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConvertError> {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, ConvertError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for ListSerializer {
    type Ok = AttributeValue;
    type Error = ConvertError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConvertError> {
        self.push(value)
    }

    fn end(self) -> Result<AttributeValue, ConvertError> {
        Ok(self.finish())
    }
}

pub(crate) struct MapSerializer {
    entries: HashMap<String, AttributeValue>,
    next_key: Option<String>,
    variant: Option<&'static str>,
}

impl MapSerializer {
    fn new(len: usize, variant: Option<&'static str>) -> Self {
        Self {
            entries: HashMap::with_capacity(len),
            next_key: None,
            variant,
        }
    }

    fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), ConvertError> {
        let value = value.serialize(AttributeValueSerializer)?;
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn finish(self) -> AttributeValue {
        tag_variant(self.variant, AttributeValue::M(self.entries))
    }
}

impl ser::SerializeMap for MapSerializer {
    type Ok = AttributeValue;
    type Error = ConvertError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ConvertError> {
        self.next_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ConvertError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| ConvertError::Message("map value serialized before its key".to_owned()))?;
        self.insert(&key, value)
    }

    fn end(self) -> Result<AttributeValue, ConvertError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = AttributeValue;
    type Error = ConvertError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ConvertError> {
        self.insert(key, value)
    }

    fn end(self) -> Result<AttributeValue, ConvertError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapSerializer {
    type Ok = AttributeValue;
    type Error = ConvertError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ConvertError> {
        self.insert(key, value)
    }

    fn end(self) -> Result<AttributeValue, ConvertError> {
        Ok(self.finish())
    }
}

/// Attribute names: strings, chars, integers and unit variants.
struct KeySerializer;

fn key_error() -> ConvertError {
    ConvertError::Message("map keys must be strings or integers".to_owned())
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = ConvertError;

    type SerializeSeq = Impossible<String, ConvertError>;
    type SerializeTuple = Impossible<String, ConvertError>;
    type SerializeTupleStruct = Impossible<String, ConvertError>;
    type SerializeTupleVariant = Impossible<String, ConvertError>;
    type SerializeMap = Impossible<String, ConvertError>;
    type SerializeStruct = Impossible<String, ConvertError>;
    type SerializeStructVariant = Impossible<String, ConvertError>;

    fn serialize_bool(self, _v: bool) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_i8(self, v: i8) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_f64(self, _v: f64) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_char(self, v: char) -> Result<String, ConvertError> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, ConvertError> {
        Ok(v.to_owned())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_none(self) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_unit(self) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, ConvertError> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, ConvertError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, ConvertError> {
        Err(key_error())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ConvertError> {
        Err(key_error())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ConvertError> {
        Err(key_error())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ConvertError> {
        Err(key_error())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ConvertError> {
        Err(key_error())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ConvertError> {
        Err(key_error())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ConvertError> {
        Err(key_error())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ConvertError> {
        Err(key_error())
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    enum Shape {
        Dot,
        Circle(u32),
        Rect { w: u32, h: u32 },
    }

    #[test]
    fn test_should_encode_enum_variants_like_json() {
        let dot = Shape::Dot.serialize(AttributeValueSerializer).unwrap();
        assert_eq!(dot, AttributeValue::S("Dot".to_owned()));

        let circle = Shape::Circle(3).serialize(AttributeValueSerializer).unwrap();
        assert_eq!(
            circle,
            AttributeValue::M(HashMap::from([(
                "Circle".to_owned(),
                AttributeValue::N("3".to_owned())
            )]))
        );

        let rect = Shape::Rect { w: 1, h: 2 }
            .serialize(AttributeValueSerializer)
            .unwrap();
        let fields = rect.as_m().and_then(|m| m.get("Rect")).and_then(AttributeValue::as_m);
        assert_eq!(fields.map(HashMap::len), Some(2));
    }

    #[test]
    fn test_should_keep_nested_attribute_values() {
        let nested = vec![
            AttributeValue::Ss(vec!["a".to_owned()]),
            AttributeValue::B(bytes::Bytes::from_static(b"raw")),
            AttributeValue::Null(true),
        ];
        let value = nested.serialize(AttributeValueSerializer).unwrap();
        assert_eq!(value, AttributeValue::L(nested));
    }

    #[test]
    fn test_should_stringify_integer_map_keys() {
        let map = HashMap::from([(7_u32, "seven")]);
        let value = map.serialize(AttributeValueSerializer).unwrap();
        assert_eq!(
            value.as_m().and_then(|m| m.get("7")),
            Some(&AttributeValue::S("seven".to_owned()))
        );
    }

    #[test]
    fn test_should_reject_non_finite_numbers() {
        let err = f64::NAN.serialize(AttributeValueSerializer).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidNumber(_)));
    }
}
