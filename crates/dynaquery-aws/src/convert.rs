//! Conversion between model attribute values and SDK attribute values.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue as SdkAttributeValue;
use bytes::Bytes;

use dynaquery_model::{AttributeValue, DynamoDBError, Item};

/// SDK representation of an item.
pub type SdkItem = HashMap<String, SdkAttributeValue>;

/// Convert a model value into an SDK value.
#[must_use]
pub fn to_sdk(value: &AttributeValue) -> SdkAttributeValue {
    match value {
        AttributeValue::S(s) => SdkAttributeValue::S(s.clone()),
        AttributeValue::N(n) => SdkAttributeValue::N(n.clone()),
        AttributeValue::B(b) => SdkAttributeValue::B(Blob::new(b.to_vec())),
        AttributeValue::Ss(ss) => SdkAttributeValue::Ss(ss.clone()),
        AttributeValue::Ns(ns) => SdkAttributeValue::Ns(ns.clone()),
        AttributeValue::Bs(bs) => {
            SdkAttributeValue::Bs(bs.iter().map(|b| Blob::new(b.to_vec())).collect())
        }
        AttributeValue::Bool(b) => SdkAttributeValue::Bool(*b),
        AttributeValue::Null(n) => SdkAttributeValue::Null(*n),
        AttributeValue::L(l) => SdkAttributeValue::L(l.iter().map(to_sdk).collect()),
        AttributeValue::M(m) => SdkAttributeValue::M(to_sdk_item(m)),
    }
}

/// Convert an SDK value into a model value.
///
/// # Errors
///
/// Returns an internal error for value kinds the SDK does not recognise.
pub fn from_sdk(value: &SdkAttributeValue) -> Result<AttributeValue, DynamoDBError> {
    Ok(match value {
        SdkAttributeValue::S(s) => AttributeValue::S(s.clone()),
        SdkAttributeValue::N(n) => AttributeValue::N(n.clone()),
        SdkAttributeValue::B(b) => AttributeValue::B(Bytes::copy_from_slice(b.as_ref())),
        SdkAttributeValue::Ss(ss) => AttributeValue::Ss(ss.clone()),
        SdkAttributeValue::Ns(ns) => AttributeValue::Ns(ns.clone()),
        SdkAttributeValue::Bs(bs) => AttributeValue::Bs(
            bs.iter()
                .map(|b| Bytes::copy_from_slice(b.as_ref()))
                .collect(),
        ),
        SdkAttributeValue::Bool(b) => AttributeValue::Bool(*b),
        SdkAttributeValue::Null(n) => AttributeValue::Null(*n),
        SdkAttributeValue::L(l) => {
            AttributeValue::L(l.iter().map(from_sdk).collect::<Result<_, _>>()?)
        }
        SdkAttributeValue::M(m) => AttributeValue::M(from_sdk_item(m)?),
        _ => {
            return Err(DynamoDBError::internal_error(
                "response contained an unsupported attribute value type",
            ));
        }
    })
}

/// Convert a model item into an SDK item.
#[must_use]
pub fn to_sdk_item(item: &Item) -> SdkItem {
    item.iter().map(|(k, v)| (k.clone(), to_sdk(v))).collect()
}

/// Convert an SDK item into a model item.
pub fn from_sdk_item(item: &SdkItem) -> Result<Item, DynamoDBError> {
    item.iter()
        .map(|(k, v)| from_sdk(v).map(|v| (k.clone(), v)))
        .collect()
}

/// `None` for an empty map, so the SDK omits the field.
pub(crate) fn non_empty(item: &Item) -> Option<SdkItem> {
    (!item.is_empty()).then(|| to_sdk_item(item))
}
