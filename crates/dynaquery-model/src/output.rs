//! DynamoDB output types for the item-level operations.

use std::collections::HashMap;

use crate::attribute_value::AttributeValue;

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Output for the `PutItem` operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutItemOutput {
    /// The attribute values as they appeared before the `PutItem` operation
    /// (only returned when `ReturnValues` is specified).
    pub attributes: HashMap<String, AttributeValue>,
}

/// Output for the `UpdateItem` operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateItemOutput {
    /// The attribute values as they appeared before or after the update
    /// (depending on the `ReturnValues` setting).
    pub attributes: HashMap<String, AttributeValue>,
}

/// Output for the `DeleteItem` operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteItemOutput {
    /// The attribute values as they appeared before the deletion (only
    /// returned when `ReturnValues` is `ALL_OLD`).
    pub attributes: HashMap<String, AttributeValue>,
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Output for the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    /// An array of item attributes that match the query conditions.
    pub items: Vec<HashMap<String, AttributeValue>>,

    /// The number of items in the response.
    pub count: i32,

    /// The number of items evaluated before the filter expression was applied.
    pub scanned_count: i32,

    /// The primary key of the item where the query operation stopped. Use this
    /// value as `ExclusiveStartKey` in a subsequent query to continue.
    pub last_evaluated_key: HashMap<String, AttributeValue>,
}

/// Output for the `Scan` operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutput {
    /// An array of item attributes that match the scan conditions.
    pub items: Vec<HashMap<String, AttributeValue>>,

    /// The number of items in the response.
    pub count: i32,

    /// The number of items evaluated before the filter expression was applied.
    pub scanned_count: i32,

    /// The primary key of the item where the scan operation stopped. Use this
    /// value as `ExclusiveStartKey` in a subsequent scan to continue.
    pub last_evaluated_key: HashMap<String, AttributeValue>,
}
