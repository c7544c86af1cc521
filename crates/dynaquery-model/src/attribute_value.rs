//! DynamoDB `AttributeValue` type with custom serialization.
//!
//! `AttributeValue` is a tagged union where exactly one variant is present.
//! It serializes to single-key objects like `{"S": "hello"}`, wrapped in a
//! marker newtype so that [`crate::to_item`] can pass it through unchanged.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A stored item: attribute name to typed value.
pub type Item = HashMap<String, AttributeValue>;

/// A primary key, also used as the pagination cursor (`ExclusiveStartKey` /
/// `LastEvaluatedKey`).
pub type Key = HashMap<String, AttributeValue>;

/// DynamoDB attribute value.
///
/// Numbers are always string-encoded to preserve arbitrary precision.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value (string-encoded for arbitrary precision).
    N(String),
    /// Binary value (base64-encoded in JSON).
    B(bytes::Bytes),
    /// String Set.
    Ss(Vec<String>),
    /// Number Set (string-encoded).
    Ns(Vec<String>),
    /// Binary Set (base64-encoded in JSON).
    Bs(Vec<bytes::Bytes>),
    /// Boolean value.
    Bool(bool),
    /// Null value.
    Null(bool),
    /// List of attribute values.
    L(Vec<AttributeValue>),
    /// Map of attribute values.
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Returns `true` if this is a string value.
    #[must_use]
    pub fn is_s(&self) -> bool {
        matches!(self, Self::S(_))
    }

    /// Returns `true` if this is a number value.
    #[must_use]
    pub fn is_n(&self) -> bool {
        matches!(self, Self::N(_))
    }

    /// Returns `true` if this is a list value.
    #[must_use]
    pub fn is_l(&self) -> bool {
        matches!(self, Self::L(_))
    }

    /// Returns the string value if this is an `S` variant.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number string if this is an `N` variant.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the list if this is an `L` variant.
    #[must_use]
    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the map if this is an `M` variant.
    #[must_use]
    pub fn as_m(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the DynamoDB type descriptor string (e.g., "S", "N", "BOOL").
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }
}

impl Eq for AttributeValue {}

impl std::hash::Hash for AttributeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::S(s) => s.hash(state),
            Self::N(n) => n.hash(state),
            Self::B(b) => b.hash(state),
            Self::Bool(b) | Self::Null(b) => b.hash(state),
            Self::Ss(v) | Self::Ns(v) => v.hash(state),
            Self::Bs(v) => {
                for b in v {
                    b.hash(state);
                }
            }
            Self::L(v) => v.hash(state),
            Self::M(m) => {
                // Deterministic hash for maps: sort keys.
                let mut pairs: Vec<_> = m.iter().collect();
                pairs.sort_by_key(|(k, _)| *k);
                for (k, v) in pairs {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{{S: {s}}}"),
            Self::N(n) => write!(f, "{{N: {n}}}"),
            Self::B(b) => write!(f, "{{B: {} bytes}}", b.len()),
            Self::Ss(v) => write!(f, "{{SS: {v:?}}}"),
            Self::Ns(v) => write!(f, "{{NS: {v:?}}}"),
            Self::Bs(v) => write!(f, "{{BS: {} items}}", v.len()),
            Self::Bool(b) => write!(f, "{{BOOL: {b}}}"),
            Self::Null(b) => write!(f, "{{NULL: {b}}}"),
            Self::L(v) => write!(f, "{{L: {} items}}", v.len()),
            Self::M(m) => write!(f, "{{M: {} keys}}", m.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions from Rust values
// ---------------------------------------------------------------------------

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<&String> for AttributeValue {
    fn from(value: &String) -> Self {
        Self::S(value.clone())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self {
                    Self::N(value.to_string())
                }
            }
        )*
    };
}

impl_from_number!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        Self::L(values.into_iter().map(Into::into).collect())
    }
}

impl From<HashMap<String, AttributeValue>> for AttributeValue {
    fn from(map: HashMap<String, AttributeValue>) -> Self {
        Self::M(map)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Newtype name under which an `AttributeValue` hands its tagged form to a
/// serializer. Serializers that produce attribute values recognise it and
/// rebuild the value instead of nesting the tag as a map.
pub(crate) const WIRE_MARKER: &str = "$dynaquery::AttributeValue";

const TYPE_KEYS: [&str; 10] = ["S", "N", "B", "SS", "NS", "BS", "BOOL", "NULL", "L", "M"];

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(WIRE_MARKER, &Tagged(self))
    }
}

/// The `{"S": "hello"}` single-key form.
struct Tagged<'a>(&'a AttributeValue);

impl Serialize for Tagged<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use base64::Engine;

        let mut map = serializer.serialize_map(Some(1))?;
        match self.0 {
            AttributeValue::S(s) => map.serialize_entry("S", s)?,
            AttributeValue::N(n) => map.serialize_entry("N", n)?,
            AttributeValue::B(b) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(b);
                map.serialize_entry("B", &encoded)?;
            }
            AttributeValue::Ss(v) => map.serialize_entry("SS", v)?,
            AttributeValue::Ns(v) => map.serialize_entry("NS", v)?,
            AttributeValue::Bs(v) => {
                let encoded: Vec<String> = v
                    .iter()
                    .map(|b| base64::engine::general_purpose::STANDARD.encode(b))
                    .collect();
                map.serialize_entry("BS", &encoded)?;
            }
            AttributeValue::Bool(b) => map.serialize_entry("BOOL", b)?,
            AttributeValue::Null(b) => map.serialize_entry("NULL", b)?,
            AttributeValue::L(list) => map.serialize_entry("L", list)?,
            AttributeValue::M(m) => map.serialize_entry("M", m)?,
        }
        map.end()
    }
}

/// Rebuild an attribute value from a single-key tagged map.
///
/// Gives the map back untouched when it is not exactly one known type key
/// holding a value of the matching shape.
pub(crate) fn untag(
    mut map: HashMap<String, AttributeValue>,
) -> Result<AttributeValue, HashMap<String, AttributeValue>> {
    if map.len() != 1 {
        return Err(map);
    }
    let Some(tag) = map.keys().next().cloned() else {
        return Err(map);
    };
    let Some(value) = map.remove(&tag) else {
        return Err(map);
    };
    match decode_tagged(&tag, value) {
        Ok(decoded) => Ok(decoded),
        Err(value) => {
            map.insert(tag, value);
            Err(map)
        }
    }
}

fn decode_tagged(tag: &str, value: AttributeValue) -> Result<AttributeValue, AttributeValue> {
    match (tag, value) {
        ("S", AttributeValue::S(s)) => Ok(AttributeValue::S(s)),
        ("N", AttributeValue::S(n) | AttributeValue::N(n)) => Ok(AttributeValue::N(n)),
        ("B", AttributeValue::S(encoded)) => match decode_binary(&encoded) {
            Some(b) => Ok(AttributeValue::B(b)),
            None => Err(AttributeValue::S(encoded)),
        },
        ("SS", AttributeValue::L(list)) => {
            scalar_strings(list).map(AttributeValue::Ss).map_err(AttributeValue::L)
        }
        ("NS", AttributeValue::L(list)) => {
            scalar_strings(list).map(AttributeValue::Ns).map_err(AttributeValue::L)
        }
        ("BS", AttributeValue::L(list)) => {
            let encoded = scalar_strings(list).map_err(AttributeValue::L)?;
            match encoded.iter().map(|e| decode_binary(e)).collect::<Option<Vec<_>>>() {
                Some(decoded) => Ok(AttributeValue::Bs(decoded)),
                None => Err(AttributeValue::L(
                    encoded.into_iter().map(AttributeValue::S).collect(),
                )),
            }
        }
        ("BOOL", AttributeValue::Bool(b)) => Ok(AttributeValue::Bool(b)),
        ("NULL", AttributeValue::Bool(b)) => Ok(AttributeValue::Null(b)),
        ("L", AttributeValue::L(list)) => Ok(AttributeValue::L(list)),
        ("M", AttributeValue::M(m)) => Ok(AttributeValue::M(m)),
        (_, value) => Err(value),
    }
}

fn scalar_strings(list: Vec<AttributeValue>) -> Result<Vec<String>, Vec<AttributeValue>> {
    if !list.iter().all(|v| v.is_s() || v.is_n()) {
        return Err(list);
    }
    Ok(list
        .into_iter()
        .filter_map(|v| match v {
            AttributeValue::S(s) | AttributeValue::N(s) => Some(s),
            _ => None,
        })
        .collect())
}

fn decode_binary(encoded: &str) -> Option<bytes::Bytes> {
    use base64::Engine;

    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()
        .map(bytes::Bytes::from)
}

/// Accepts both the tagged form and plain values: strings become `S`,
/// numbers `N`, booleans `BOOL`, null `NULL`, sequences `L` and maps `M`,
/// unless the map is a tagged value.
impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AttributeValueVisitor)
    }
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "a DynamoDB AttributeValue, tagged with one of {TYPE_KEYS:?} or as a plain value"
        )
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(AttributeValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(AttributeValue::N(v.to_string()))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
        Ok(AttributeValue::N(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(AttributeValue::N(v.to_string()))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
        Ok(AttributeValue::N(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() {
            return Err(E::custom(format!("number attribute must be finite, got {v}")));
        }
        Ok(AttributeValue::N(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(AttributeValue::S(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(AttributeValue::S(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(AttributeValue::B(bytes::Bytes::copy_from_slice(v)))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(AttributeValue::B(bytes::Bytes::from(v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(AttributeValue::Null(true))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(AttributeValue::Null(true))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        AttributeValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut list = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(value) = seq.next_element()? {
            list.push(value);
        }
        Ok(AttributeValue::L(list))
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let mut entries = HashMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, AttributeValue>()? {
            entries.insert(key, value);
        }
        Ok(untag(entries).unwrap_or_else(AttributeValue::M))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_string_value() {
        let val = AttributeValue::S("hello".to_owned());
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"S":"hello"}"#);
    }

    #[test]
    fn test_should_serialize_list_value() {
        let val = AttributeValue::L(vec![
            AttributeValue::S("a".to_owned()),
            AttributeValue::N("1".to_owned()),
        ]);
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"L":[{"S":"a"},{"N":"1"}]}"#);
    }

    #[test]
    fn test_should_deserialize_map_value() {
        let json = r#"{"M":{"id":{"S":"1"},"count":{"N":"5"}}}"#;
        let val: AttributeValue = serde_json::from_str(json).unwrap();
        let map = val.as_m().unwrap();
        assert_eq!(map.get("id"), Some(&AttributeValue::S("1".to_owned())));
        assert_eq!(map.get("count"), Some(&AttributeValue::N("5".to_owned())));
    }

    #[test]
    fn test_should_deserialize_binary_value() {
        let val: AttributeValue = serde_json::from_str(r#"{"B":"dGVzdA=="}"#).unwrap();
        assert_eq!(val, AttributeValue::B(bytes::Bytes::from_static(b"test")));
    }

    #[test]
    fn test_should_read_untagged_map_as_map_attribute() {
        let val: AttributeValue = serde_json::from_str(r#"{"X":"1"}"#).unwrap();
        assert_eq!(
            val,
            AttributeValue::M(HashMap::from([(
                "X".to_owned(),
                AttributeValue::S("1".to_owned())
            )]))
        );

        // A known type key holding the wrong shape is an ordinary map too.
        let val: AttributeValue = serde_json::from_str(r#"{"BOOL":"yes"}"#).unwrap();
        assert_eq!(val.as_m().map(HashMap::len), Some(1));
    }

    #[test]
    fn test_should_deserialize_plain_values() {
        let val: AttributeValue = serde_json::from_str(r#"["a", 2, true, null]"#).unwrap();
        assert_eq!(
            val,
            AttributeValue::L(vec![
                AttributeValue::S("a".to_owned()),
                AttributeValue::N("2".to_owned()),
                AttributeValue::Bool(true),
                AttributeValue::Null(true),
            ])
        );
    }

    #[test]
    fn test_should_round_trip_sets_through_json() {
        let val = AttributeValue::Bs(vec![bytes::Bytes::from_static(b"test")]);
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"BS":["dGVzdA=="]}"#);
        let back: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, val);

        let back: AttributeValue = serde_json::from_str(r#"{"NS":["1","2.5"]}"#).unwrap();
        assert_eq!(back, AttributeValue::Ns(vec!["1".to_owned(), "2.5".to_owned()]));
    }

    #[test]
    fn test_should_convert_integers_to_numbers() {
        assert_eq!(AttributeValue::from(5_i32), AttributeValue::N("5".to_owned()));
        assert_eq!(AttributeValue::from(-7_i64), AttributeValue::N("-7".to_owned()));
        assert_eq!(AttributeValue::from(3_u8), AttributeValue::N("3".to_owned()));
    }

    #[test]
    fn test_should_convert_strings_and_vectors() {
        assert_eq!(AttributeValue::from("x"), AttributeValue::S("x".to_owned()));
        assert_eq!(
            AttributeValue::from(vec!["a", "b"]),
            AttributeValue::L(vec![
                AttributeValue::S("a".to_owned()),
                AttributeValue::S("b".to_owned()),
            ])
        );
    }
}
