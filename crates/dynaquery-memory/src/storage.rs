//! In-memory item storage for one table.
//!
//! ```text
//! DashMap<PartitionKey, BTreeMap<SortableAttributeValue, Item>>
//! ```
//!
//! Each partition keeps its items ordered by sort key, so key-condition
//! queries are `BTreeMap` range walks. Tables without a sort key store their
//! single item per partition under [`SortableAttributeValue::Sentinel`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use dynaquery_core::ComparisonOperator;
use dynaquery_model::types::ScalarAttributeType;
use dynaquery_model::{AttributeValue, Item, Key};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by key extraction and validation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required key attribute was not found.
    #[error("One or more parameter values were invalid: Missing the key {attr} in the item")]
    MissingKeyAttribute {
        /// The name of the missing attribute.
        attr: String,
    },
    /// A key attribute has the wrong type.
    #[error(
        "One or more parameter values were invalid: Type mismatch for key {attr} expected: {expected} actual: {actual}"
    )]
    InvalidKeyType {
        /// The name of the attribute.
        attr: String,
        /// The expected type descriptor.
        expected: &'static str,
        /// The actual type descriptor.
        actual: &'static str,
    },
    /// A key map carried an attribute that is not part of the key schema.
    #[error("The provided key element does not match the schema: unexpected attribute {attr}")]
    UnexpectedKeyAttribute {
        /// The offending attribute.
        attr: String,
    },
}

// ---------------------------------------------------------------------------
// Key types
// ---------------------------------------------------------------------------

/// Partition key and optional sort key of a table or index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// Partition (HASH) key.
    pub partition_key: KeyAttribute,
    /// Sort (RANGE) key.
    pub sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    /// Whether `name` is one of the key attributes.
    #[must_use]
    pub fn is_key(&self, name: &str) -> bool {
        self.partition_key.name == name || self.sort_key.as_ref().is_some_and(|k| k.name == name)
    }

    /// Copy the key attributes of `item`.
    #[must_use]
    pub fn key_of(&self, item: &Item) -> Key {
        std::iter::once(&self.partition_key)
            .chain(self.sort_key.as_ref())
            .filter_map(|k| item.get(&k.name).map(|v| (k.name.clone(), v.clone())))
            .collect()
    }
}

/// A key attribute name with its scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    /// The attribute name.
    pub name: String,
    /// The scalar type (S, N, or B).
    pub attr_type: ScalarAttributeType,
}

impl KeyAttribute {
    /// Create a key attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, attr_type: ScalarAttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }

    /// A string-typed key attribute.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ScalarAttributeType::S)
    }

    /// A number-typed key attribute.
    #[must_use]
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ScalarAttributeType::N)
    }
}

/// A primary key: partition key value and optional sort key value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    /// The partition key value.
    pub partition_key: AttributeValue,
    /// The sort key value.
    pub sort_key: Option<SortableAttributeValue>,
}

impl PrimaryKey {
    /// Position of the key in scan order: partition key, then sort key.
    #[must_use]
    pub fn order(&self) -> (SortableAttributeValue, SortableAttributeValue) {
        (
            partition_order(&self.partition_key),
            self.sort_key.clone().unwrap_or(SortableAttributeValue::Sentinel),
        )
    }
}

/// Partition keys are always S, N or B once stored.
fn partition_order(value: &AttributeValue) -> SortableAttributeValue {
    SortableAttributeValue::from_attribute_value("", value).unwrap_or(SortableAttributeValue::Sentinel)
}

// ---------------------------------------------------------------------------
// SortableAttributeValue
// ---------------------------------------------------------------------------

/// A key-eligible attribute value with a total order.
///
/// - **S**: UTF-8 byte order.
/// - **N**: numeric order, parsed as `f64`.
/// - **B**: unsigned byte order.
/// - **Sentinel**: placeholder sort key for tables without one.
#[derive(Debug, Clone)]
pub enum SortableAttributeValue {
    /// String key.
    S(String),
    /// Number key, kept in its original string form.
    N(String),
    /// Binary key.
    B(bytes::Bytes),
    /// Sort key of a table that has none.
    Sentinel,
}

impl SortableAttributeValue {
    /// Wrap a key value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKeyType`] unless the value is S, N or B.
    pub fn from_attribute_value(attr_name: &str, value: &AttributeValue) -> Result<Self, StorageError> {
        match value {
            AttributeValue::S(s) => Ok(Self::S(s.clone())),
            AttributeValue::N(n) => Ok(Self::N(n.clone())),
            AttributeValue::B(b) => Ok(Self::B(b.clone())),
            other => Err(StorageError::InvalidKeyType {
                attr: attr_name.to_owned(),
                expected: "S, N, or B",
                actual: other.type_descriptor(),
            }),
        }
    }
}

fn parse_number(s: &str) -> f64 {
    s.parse::<f64>().unwrap_or(f64::NAN)
}

impl PartialEq for SortableAttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortableAttributeValue {}

impl PartialOrd for SortableAttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableAttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::N(a), Self::N(b)) => parse_number(a)
                .partial_cmp(&parse_number(b))
                .unwrap_or(Ordering::Equal),
            (Self::B(a), Self::B(b)) => a.as_ref().cmp(b.as_ref()),
            (Self::Sentinel, Self::Sentinel) => Ordering::Equal,
            // Mixed variants never share a map; keep the order total anyway.
            (Self::S(_), _) => Ordering::Less,
            (_, Self::S(_)) => Ordering::Greater,
            (Self::N(_), _) => Ordering::Less,
            (_, Self::N(_)) => Ordering::Greater,
            (Self::B(_), _) => Ordering::Less,
            (_, Self::B(_)) => Ordering::Greater,
        }
    }
}

// ---------------------------------------------------------------------------
// SortKeyRange
// ---------------------------------------------------------------------------

/// The sort-key interval selected by a key condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKeyRange {
    lower: Bound<SortableAttributeValue>,
    upper: Bound<SortableAttributeValue>,
}

impl Default for SortKeyRange {
    fn default() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }
}

impl SortKeyRange {
    /// Intersect the range with `sort_key op value`.
    pub fn narrow(&mut self, op: ComparisonOperator, value: SortableAttributeValue) {
        let (lower, upper) = match op {
            ComparisonOperator::Equal => (Bound::Included(value.clone()), Bound::Included(value)),
            ComparisonOperator::GreaterThan => (Bound::Excluded(value), Bound::Unbounded),
            ComparisonOperator::GreaterOrEqual => (Bound::Included(value), Bound::Unbounded),
            ComparisonOperator::LessThan => (Bound::Unbounded, Bound::Excluded(value)),
            ComparisonOperator::LessOrEqual => (Bound::Unbounded, Bound::Included(value)),
        };
        self.lower = tighter_lower(std::mem::replace(&mut self.lower, Bound::Unbounded), lower);
        self.upper = tighter_upper(std::mem::replace(&mut self.upper, Bound::Unbounded), upper);
    }

    /// Whether `value` lies inside the range.
    #[must_use]
    pub fn contains(&self, value: &SortableAttributeValue) -> bool {
        let above = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(l) => value >= l,
            Bound::Excluded(l) => value > l,
        };
        let below = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(u) => value <= u,
            Bound::Excluded(u) => value < u,
        };
        above && below
    }

    /// Bounds of the part of the range that lies after `start` in the walk
    /// direction.
    fn after(
        &self,
        start: Option<&SortableAttributeValue>,
        forward: bool,
    ) -> (Bound<SortableAttributeValue>, Bound<SortableAttributeValue>) {
        let (mut lower, mut upper) = (self.lower.clone(), self.upper.clone());
        if let Some(start) = start {
            if forward {
                lower = tighter_lower(lower, Bound::Excluded(start.clone()));
            } else {
                upper = tighter_upper(upper, Bound::Excluded(start.clone()));
            }
        }
        (lower, upper)
    }
}

fn tighter_lower(
    a: Bound<SortableAttributeValue>,
    b: Bound<SortableAttributeValue>,
) -> Bound<SortableAttributeValue> {
    match (&a, &b) {
        (Bound::Unbounded, _) => b,
        (_, Bound::Unbounded) => a,
        (Bound::Included(x) | Bound::Excluded(x), Bound::Included(y) | Bound::Excluded(y)) => {
            match x.cmp(y) {
                Ordering::Less => b,
                Ordering::Greater => a,
                Ordering::Equal if matches!(b, Bound::Excluded(_)) => b,
                Ordering::Equal => a,
            }
        }
    }
}

fn tighter_upper(
    a: Bound<SortableAttributeValue>,
    b: Bound<SortableAttributeValue>,
) -> Bound<SortableAttributeValue> {
    match (&a, &b) {
        (Bound::Unbounded, _) => b,
        (_, Bound::Unbounded) => a,
        (Bound::Included(x) | Bound::Excluded(x), Bound::Included(y) | Bound::Excluded(y)) => {
            match x.cmp(y) {
                Ordering::Less => a,
                Ordering::Greater => b,
                Ordering::Equal if matches!(b, Bound::Excluded(_)) => b,
                Ordering::Equal => a,
            }
        }
    }
}

/// `BTreeMap::range` panics on inverted bounds; detect them first.
fn is_empty_range(lower: &Bound<SortableAttributeValue>, upper: &Bound<SortableAttributeValue>) -> bool {
    match (lower, upper) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l) | Bound::Excluded(l), Bound::Included(u) | Bound::Excluded(u)) => l >= u,
    }
}

// ---------------------------------------------------------------------------
// TableStorage
// ---------------------------------------------------------------------------

/// One page of stored items plus whether more remain after it.
pub type StoragePage = (Vec<Item>, bool);

/// Item storage for a single table.
#[derive(Debug)]
pub struct TableStorage {
    data: DashMap<AttributeValue, BTreeMap<SortableAttributeValue, Item>>,
    key_schema: KeySchema,
    item_count: AtomicU64,
}

impl TableStorage {
    /// Create empty storage for `key_schema`.
    #[must_use]
    pub fn new(key_schema: KeySchema) -> Self {
        Self {
            data: DashMap::new(),
            key_schema,
            item_count: AtomicU64::new(0),
        }
    }

    /// The table key schema.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// Number of stored items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(AtomicOrdering::Relaxed)
    }

    /// Insert or replace an item, returning the replaced one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the item lacks a key attribute or a key
    /// attribute has the wrong type.
    pub fn put_item(&self, item: Item) -> Result<Option<Item>, StorageError> {
        let primary_key = extract_primary_key(&self.key_schema, &item)?;
        let sort_key = primary_key
            .sort_key
            .unwrap_or(SortableAttributeValue::Sentinel);

        let old = self
            .data
            .entry(primary_key.partition_key)
            .or_default()
            .insert(sort_key, item);

        if old.is_some() {
            debug!("replaced existing item");
        } else {
            self.item_count.fetch_add(1, AtomicOrdering::Relaxed);
            debug!("inserted new item");
        }
        Ok(old)
    }

    /// Fetch an item by primary key.
    #[must_use]
    pub fn get_item(&self, key: &PrimaryKey) -> Option<Item> {
        let sort_key = key.sort_key.as_ref().unwrap_or(&SortableAttributeValue::Sentinel);
        self.data
            .get(&key.partition_key)
            .and_then(|partition| partition.get(sort_key).cloned())
    }

    /// Remove an item by primary key, returning it if it existed.
    pub fn delete_item(&self, key: &PrimaryKey) -> Option<Item> {
        let sort_key = key.sort_key.as_ref().unwrap_or(&SortableAttributeValue::Sentinel);
        let removed = self.data.get_mut(&key.partition_key)?.remove(sort_key)?;
        self.item_count.fetch_sub(1, AtomicOrdering::Relaxed);
        debug!("deleted item");
        Some(removed)
    }

    /// Walk one partition through `range`, resuming after `start`.
    #[must_use]
    pub fn query(
        &self,
        partition_key: &AttributeValue,
        range: &SortKeyRange,
        forward: bool,
        limit: Option<usize>,
        start: Option<&SortableAttributeValue>,
    ) -> StoragePage {
        let Some(partition) = self.data.get(partition_key) else {
            return (Vec::new(), false);
        };
        let (lower, upper) = range.after(start, forward);
        if is_empty_range(&lower, &upper) {
            return (Vec::new(), false);
        }

        let walk = partition.range((lower, upper)).map(|(_, item)| item);
        let walk: Box<dyn Iterator<Item = &Item>> = if forward {
            Box::new(walk)
        } else {
            Box::new(walk.rev())
        };
        take_page(walk, limit)
    }

    /// All items ordered by partition key, then sort key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Item> {
        let mut partitions: Vec<(SortableAttributeValue, Vec<Item>)> = self
            .data
            .iter()
            .map(|entry| {
                (
                    partition_order(entry.key()),
                    entry.value().values().cloned().collect(),
                )
            })
            .collect();
        partitions.sort_by(|a, b| a.0.cmp(&b.0));
        partitions.into_iter().flat_map(|(_, items)| items).collect()
    }

    /// Scan the whole table in snapshot order, resuming after `start`.
    ///
    /// `start` need not name a stored item: the scan picks up at the first
    /// key ordered after it.
    #[must_use]
    pub fn scan(&self, limit: Option<usize>, start: Option<&PrimaryKey>) -> StoragePage {
        let items = self.snapshot();
        let skip = start.map_or(0, |start| {
            let start = start.order();
            items.partition_point(|item| {
                extract_primary_key(&self.key_schema, item).is_ok_and(|pk| pk.order() <= start)
            })
        });
        take_page(items[skip..].iter(), limit)
    }
}

/// Take up to `limit` items and report whether any were left behind.
pub fn take_page<'a>(mut items: impl Iterator<Item = &'a Item>, limit: Option<usize>) -> StoragePage {
    let page: Vec<Item> = items
        .by_ref()
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    let more = limit.is_some() && items.next().is_some();
    (page, more)
}

// ---------------------------------------------------------------------------
// Key extraction
// ---------------------------------------------------------------------------

/// Extract the primary key of `item` under `key_schema`.
///
/// # Errors
///
/// Returns [`StorageError`] when a key attribute is missing or mistyped.
pub fn extract_primary_key(key_schema: &KeySchema, item: &Item) -> Result<PrimaryKey, StorageError> {
    let pk_value = key_value(&key_schema.partition_key, item)?;
    let sort_key = match &key_schema.sort_key {
        Some(sk_def) => Some(SortableAttributeValue::from_attribute_value(
            &sk_def.name,
            key_value(sk_def, item)?,
        )?),
        None => None,
    };
    Ok(PrimaryKey {
        partition_key: pk_value.clone(),
        sort_key,
    })
}

/// Extract a primary key from a key map, rejecting non-key attributes.
///
/// # Errors
///
/// Returns [`StorageError`] for missing, mistyped or extra attributes.
pub fn extract_key(key_schema: &KeySchema, key: &Key) -> Result<PrimaryKey, StorageError> {
    if let Some(extra) = key.keys().find(|name| !key_schema.is_key(name)) {
        return Err(StorageError::UnexpectedKeyAttribute {
            attr: extra.clone(),
        });
    }
    extract_primary_key(key_schema, key)
}

fn key_value<'a>(def: &KeyAttribute, item: &'a Item) -> Result<&'a AttributeValue, StorageError> {
    let value = item
        .get(&def.name)
        .ok_or_else(|| StorageError::MissingKeyAttribute {
            attr: def.name.clone(),
        })?;
    validate_key_type(def, value)?;
    Ok(value)
}

/// Check that `value` has the scalar type declared by `def`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKeyType`] on mismatch.
pub fn validate_key_type(def: &KeyAttribute, value: &AttributeValue) -> Result<(), StorageError> {
    if matches!(
        (&def.attr_type, value),
        (ScalarAttributeType::S, AttributeValue::S(_))
            | (ScalarAttributeType::N, AttributeValue::N(_))
            | (ScalarAttributeType::B, AttributeValue::B(_))
    ) {
        Ok(())
    } else {
        Err(StorageError::InvalidKeyType {
            attr: def.name.clone(),
            expected: def.attr_type.as_str(),
            actual: value.type_descriptor(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
