//! Conversion between caller records and DynamoDB attribute maps.
//!
//! Records serialize straight into attribute values: strings become `S`,
//! numbers `N`, booleans `BOOL`, `None` `NULL`, sequences `L` and structs or
//! maps `M`. Fields that already hold an [`AttributeValue`] (a returned
//! `Key`, say) are kept as they are.
//!
//! The way back goes through `serde_json::Value`, which also accepts the set
//! and binary variants even though they have no JSON counterpart of their own.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::attribute_value::{AttributeValue, Item};
use crate::serializer::AttributeValueSerializer;

/// Errors raised while converting records to or from attribute maps.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// serde_json rejected the value.
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// The record's `Serialize` impl failed or produced something no
    /// attribute value can hold.
    #[error("serialization failed: {0}")]
    Message(String),
    /// A whole record must serialize to a map.
    #[error("expected a record that serializes to a map, got {found}")]
    NotAMap {
        /// The attribute type that was produced instead.
        found: &'static str,
    },
    /// A number attribute did not hold a parseable number.
    #[error("invalid number attribute: {0}")]
    InvalidNumber(String),
}

/// Serialize a record into a DynamoDB item.
///
/// # Errors
///
/// Returns [`ConvertError::NotAMap`] when the record is not a struct or map,
/// or [`ConvertError::Message`] when its `Serialize` impl fails.
pub fn to_item<T: Serialize + ?Sized>(record: &T) -> Result<Item, ConvertError> {
    match record.serialize(AttributeValueSerializer)? {
        AttributeValue::M(map) => Ok(map),
        other => Err(ConvertError::NotAMap {
            found: other.type_descriptor(),
        }),
    }
}

/// Serialize any value into a single attribute value.
///
/// # Errors
///
/// Returns [`ConvertError::Message`] when the value's `Serialize` impl fails
/// and [`ConvertError::InvalidNumber`] for NaN or infinite floats.
pub fn to_attribute_value<T: Serialize + ?Sized>(value: &T) -> Result<AttributeValue, ConvertError> {
    value.serialize(AttributeValueSerializer)
}

/// Deserialize a DynamoDB item into a caller record.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidNumber`] for malformed `N` attributes and
/// [`ConvertError::Json`] when the record type does not match the item.
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T, ConvertError> {
    let mut map = Map::with_capacity(item.len());
    for (k, v) in item {
        map.insert(k, attribute_to_json(v)?);
    }
    Ok(serde_json::from_value(Value::Object(map))?)
}

fn attribute_to_json(value: AttributeValue) -> Result<Value, ConvertError> {
    use base64::Engine;

    let json = match value {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => Value::Number(parse_number(&n)?),
        AttributeValue::B(b) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        AttributeValue::Ss(v) => Value::Array(v.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(v) => Value::Array(
            v.iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<Vec<_>, ConvertError>>()?,
        ),
        AttributeValue::Bs(v) => Value::Array(
            v.iter()
                .map(|b| Value::String(base64::engine::general_purpose::STANDARD.encode(b)))
                .collect(),
        ),
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(list) => Value::Array(
            list.into_iter()
                .map(attribute_to_json)
                .collect::<Result<Vec<_>, ConvertError>>()?,
        ),
        AttributeValue::M(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k, attribute_to_json(v)?);
            }
            Value::Object(out)
        }
    };
    Ok(json)
}

fn parse_number(s: &str) -> Result<Number, ConvertError> {
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Ok(Number::from(u));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| ConvertError::InvalidNumber(s.to_owned()))
}
