//! The in-memory DynamoDB engine.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use dynaquery_core::{ComparisonOperator, DynamoClient};
use dynaquery_model::input::{
    DeleteItemInput, PutItemInput, QueryInput, ScanInput, UpdateItemInput,
};
use dynaquery_model::output::{
    DeleteItemOutput, PutItemOutput, QueryOutput, ScanOutput, UpdateItemOutput,
};
use dynaquery_model::types::ReturnValue;
use dynaquery_model::{AttributeValue, DynamoDBError, Item, Key};

use crate::error::{expression_error_to_dynamodb, storage_error_to_dynamodb};
use crate::expression::{Condition, matches, parse_condition, parse_update, resolve};
use crate::storage::{
    KeySchema, PrimaryKey, SortKeyRange, SortableAttributeValue, StorageError, StoragePage,
    extract_key, extract_primary_key, take_page, validate_key_type,
};
use crate::table::{MemoryTable, TableDefinition};

/// A set of in-memory tables answering item-level DynamoDB requests.
#[derive(Debug, Default)]
pub struct MemoryDynamo {
    tables: DashMap<String, Arc<MemoryTable>>,
}

impl MemoryDynamo {
    /// Create an engine with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table.
    ///
    /// # Errors
    ///
    /// Returns `ResourceInUseException` if the table exists and
    /// `ValidationException` for a malformed definition.
    pub fn create_table(&self, definition: TableDefinition) -> Result<(), DynamoDBError> {
        definition.validate()?;
        match self.tables.entry(definition.name.clone()) {
            Entry::Occupied(e) => Err(DynamoDBError::resource_in_use(format!(
                "Table already exists: {}",
                e.key()
            ))),
            Entry::Vacant(e) => {
                debug!(
                    table = %definition.name,
                    indexes = definition.indexes.len(),
                    "created table"
                );
                e.insert(Arc::new(MemoryTable::new(definition)));
                Ok(())
            }
        }
    }

    /// Drop a table and all of its items.
    pub fn delete_table(&self, name: &str) -> Result<(), DynamoDBError> {
        self.tables
            .remove(name)
            .map(|_| debug!(table = name, "deleted table"))
            .ok_or_else(|| table_not_found(name))
    }

    /// Names of all tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of items stored in `table`.
    pub fn item_count(&self, table: &str) -> Result<u64, DynamoDBError> {
        Ok(self.require_table(table)?.storage.item_count())
    }

    fn require_table(&self, name: &str) -> Result<Arc<MemoryTable>, DynamoDBError> {
        self.tables
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| table_not_found(name))
    }

    /// Handle a `Query` request.
    pub fn handle_query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let limit = validate_limit(input.limit)?;

        let key_condition = input.key_condition_expression.as_deref().ok_or_else(|| {
            DynamoDBError::validation("KeyConditionExpression is required for Query")
        })?;
        let key_conditions = parse_condition(key_condition).map_err(expression_error_to_dynamodb)?;
        let filter = parse_filter(input.filter_expression.as_deref())?;

        let table_schema = table.storage.key_schema();
        let index_schema = input
            .index_name
            .as_deref()
            .map(|name| table.index_schema(name))
            .transpose()?;
        let schema = index_schema.as_ref().unwrap_or(table_schema);

        let (partition_value, range) =
            extract_key_condition(&key_conditions, schema, &input.expression_attribute_values)?;
        let forward = input.scan_index_forward.unwrap_or(true);

        let (items, more) = if index_schema.is_some() {
            let mut candidates = index_candidates(&table, schema, |key| {
                key.partition_key == partition_value
                    && key.sort_key.as_ref().is_none_or(|sk| range.contains(sk))
            });
            if !forward {
                candidates.reverse();
            }
            page_after(
                table_schema,
                schema,
                &candidates,
                forward,
                limit,
                &input.exclusive_start_key,
            )?
        } else {
            let start = start_key(table_schema, &input.exclusive_start_key)?
                .map(|k| k.sort_key.unwrap_or(SortableAttributeValue::Sentinel));
            table
                .storage
                .query(&partition_value, &range, forward, limit, start.as_ref())
        };

        let last_evaluated_key = last_key(more, &items, table_schema, index_schema.as_ref());
        let scanned_count = count(items.len());
        let items = apply_filter(items, filter.as_deref(), &input.expression_attribute_values)?;

        debug!(
            table = %input.table_name,
            index = ?input.index_name,
            scanned = scanned_count,
            returned = items.len(),
            "query"
        );
        Ok(QueryOutput {
            count: count(items.len()),
            items,
            scanned_count,
            last_evaluated_key,
        })
    }

    /// Handle a `Scan` request.
    pub fn handle_scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let limit = validate_limit(input.limit)?;
        let filter = parse_filter(input.filter_expression.as_deref())?;

        let table_schema = table.storage.key_schema();
        let index_schema = input
            .index_name
            .as_deref()
            .map(|name| table.index_schema(name))
            .transpose()?;

        let (items, more) = match &index_schema {
            Some(schema) => {
                let candidates = index_candidates(&table, schema, |_| true);
                page_after(
                    table_schema,
                    schema,
                    &candidates,
                    true,
                    limit,
                    &input.exclusive_start_key,
                )?
            }
            None => {
                let start = start_key(table_schema, &input.exclusive_start_key)?;
                table.storage.scan(limit, start.as_ref())
            }
        };

        let last_evaluated_key = last_key(more, &items, table_schema, index_schema.as_ref());
        let scanned_count = count(items.len());
        let items = apply_filter(items, filter.as_deref(), &input.expression_attribute_values)?;

        debug!(
            table = %input.table_name,
            scanned = scanned_count,
            returned = items.len(),
            "scan"
        );
        Ok(ScanOutput {
            count: count(items.len()),
            items,
            scanned_count,
            last_evaluated_key,
        })
    }

    /// Handle a `PutItem` request.
    pub fn handle_put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let _guard = table.write_lock.lock();
        table
            .storage
            .put_item(input.item)
            .map_err(storage_error_to_dynamodb)?;
        Ok(PutItemOutput::default())
    }

    /// Handle an `UpdateItem` request. Missing items are created from the key.
    pub fn handle_update_item(
        &self,
        input: UpdateItemInput,
    ) -> Result<UpdateItemOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let schema = table.storage.key_schema();
        let primary_key = extract_key(schema, &input.key).map_err(storage_error_to_dynamodb)?;

        let actions = match input.update_expression.as_deref() {
            Some(expression) => parse_update(expression).map_err(expression_error_to_dynamodb)?,
            None => Vec::new(),
        };
        let mut sets = Vec::with_capacity(actions.len());
        for action in actions {
            if schema.is_key(&action.name) {
                return Err(DynamoDBError::validation(format!(
                    "Cannot update attribute {}. This attribute is part of the key",
                    action.name
                )));
            }
            let value = resolve(&input.expression_attribute_values, &action.placeholder)
                .map_err(expression_error_to_dynamodb)?;
            sets.push((action.name, value.clone()));
        }

        let _guard = table.write_lock.lock();
        let old = table.storage.get_item(&primary_key);
        let mut item = old.clone().unwrap_or_else(|| input.key.clone());
        let mut updated_old = Item::new();
        let mut updated_new = Item::new();
        for (name, value) in sets {
            if let Some(previous) = item.insert(name.clone(), value.clone()) {
                updated_old.insert(name.clone(), previous);
            }
            updated_new.insert(name, value);
        }
        table
            .storage
            .put_item(item.clone())
            .map_err(storage_error_to_dynamodb)?;
        debug!(
            table = %input.table_name,
            attributes = updated_new.len(),
            created = old.is_none(),
            "updated item"
        );

        let attributes = match input.return_values.unwrap_or_default() {
            ReturnValue::None => Item::new(),
            ReturnValue::AllOld => old.unwrap_or_default(),
            ReturnValue::UpdatedOld => updated_old,
            ReturnValue::AllNew => item,
            ReturnValue::UpdatedNew => updated_new,
        };
        Ok(UpdateItemOutput { attributes })
    }

    /// Handle a `DeleteItem` request. Deleting a missing item succeeds.
    pub fn handle_delete_item(
        &self,
        input: DeleteItemInput,
    ) -> Result<DeleteItemOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let primary_key =
            extract_key(table.storage.key_schema(), &input.key).map_err(storage_error_to_dynamodb)?;
        let _guard = table.write_lock.lock();
        table.storage.delete_item(&primary_key);
        Ok(DeleteItemOutput::default())
    }
}

impl DynamoClient for MemoryDynamo {
    fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        self.handle_query(input)
    }

    fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        self.handle_scan(input)
    }

    fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        self.handle_put_item(input)
    }

    fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError> {
        self.handle_update_item(input)
    }

    fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError> {
        self.handle_delete_item(input)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn table_not_found(name: &str) -> DynamoDBError {
    DynamoDBError::resource_not_found(format!(
        "Requested resource not found: Table: {name} not found"
    ))
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn validate_limit(limit: Option<i32>) -> Result<Option<usize>, DynamoDBError> {
    match limit {
        Some(l) if l <= 0 => Err(DynamoDBError::validation("Limit must be greater than 0")),
        Some(l) => Ok(Some(usize::try_from(l).unwrap_or(usize::MAX))),
        None => Ok(None),
    }
}

fn parse_filter(filter: Option<&str>) -> Result<Option<Vec<Condition>>, DynamoDBError> {
    filter
        .map(parse_condition)
        .transpose()
        .map_err(expression_error_to_dynamodb)
}

fn apply_filter(
    items: Vec<Item>,
    filter: Option<&[Condition]>,
    values: &HashMap<String, AttributeValue>,
) -> Result<Vec<Item>, DynamoDBError> {
    let Some(filter) = filter else {
        return Ok(items);
    };
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if matches(filter, &item, values).map_err(expression_error_to_dynamodb)? {
            kept.push(item);
        }
    }
    Ok(kept)
}

fn start_key(
    schema: &KeySchema,
    key: &Key,
) -> Result<Option<PrimaryKey>, DynamoDBError> {
    if key.is_empty() {
        return Ok(None);
    }
    extract_primary_key(schema, key)
        .map(Some)
        .map_err(storage_error_to_dynamodb)
}

/// Split a key condition into the partition value and the sort-key range.
fn extract_key_condition(
    conditions: &[Condition],
    schema: &KeySchema,
    values: &HashMap<String, AttributeValue>,
) -> Result<(AttributeValue, SortKeyRange), DynamoDBError> {
    let mut partition = None;
    let mut range = SortKeyRange::default();

    for condition in conditions {
        let value = resolve(values, &condition.placeholder).map_err(expression_error_to_dynamodb)?;
        if condition.name == schema.partition_key.name {
            if condition.op != ComparisonOperator::Equal {
                return Err(DynamoDBError::validation(
                    "Query key condition not supported: the partition key must use '='",
                ));
            }
            if partition.is_some() {
                return Err(DynamoDBError::validation(
                    "KeyConditionExpressions must only contain one condition per partition key",
                ));
            }
            validate_key_type(&schema.partition_key, value).map_err(storage_error_to_dynamodb)?;
            partition = Some(value.clone());
        } else if let Some(sort_key) = schema.sort_key.as_ref().filter(|k| k.name == condition.name) {
            validate_key_type(sort_key, value).map_err(storage_error_to_dynamodb)?;
            let bound = SortableAttributeValue::from_attribute_value(&sort_key.name, value)
                .map_err(storage_error_to_dynamodb)?;
            range.narrow(condition.op, bound);
        } else {
            return Err(DynamoDBError::validation(format!(
                "Query condition missed key schema element: {}",
                condition.name
            )));
        }
    }

    let partition = partition.ok_or_else(|| {
        DynamoDBError::validation(format!(
            "Query condition missed key schema element: {}",
            schema.partition_key.name
        ))
    })?;
    Ok((partition, range))
}

/// Where an index entry sits: index key first, then the table key so that
/// entries sharing an index key still have a fixed order.
type IndexOrder = (
    (SortableAttributeValue, SortableAttributeValue),
    (SortableAttributeValue, SortableAttributeValue),
);

fn index_order(
    table_schema: &KeySchema,
    index_schema: &KeySchema,
    item: &Item,
) -> Result<IndexOrder, StorageError> {
    let index_key = extract_primary_key(index_schema, item)?;
    let table_key = extract_primary_key(table_schema, item)?;
    Ok((index_key.order(), table_key.order()))
}

/// Items carrying the index keys that pass `keep`, in index order.
fn index_candidates(
    table: &MemoryTable,
    schema: &KeySchema,
    keep: impl Fn(&PrimaryKey) -> bool,
) -> Vec<(IndexOrder, Item)> {
    let table_schema = table.storage.key_schema();
    let mut candidates: Vec<(IndexOrder, Item)> = table
        .storage
        .snapshot()
        .into_iter()
        .filter_map(|item| {
            let key = extract_primary_key(schema, &item).ok()?;
            if !keep(&key) {
                return None;
            }
            let order = index_order(table_schema, schema, &item).ok()?;
            Some((order, item))
        })
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    candidates
}

/// Page through `candidates`, resuming after the position named by `start`.
///
/// The cursor is compared by key order, so it stays valid when its item has
/// since been removed or has moved out of the index.
fn page_after(
    table_schema: &KeySchema,
    index_schema: &KeySchema,
    candidates: &[(IndexOrder, Item)],
    forward: bool,
    limit: Option<usize>,
    start: &Key,
) -> Result<StoragePage, DynamoDBError> {
    let skip = if start.is_empty() {
        0
    } else {
        let cursor =
            index_order(table_schema, index_schema, start).map_err(storage_error_to_dynamodb)?;
        candidates.partition_point(|(order, _)| {
            if forward {
                *order <= cursor
            } else {
                *order >= cursor
            }
        })
    };
    Ok(take_page(
        candidates[skip..].iter().map(|(_, item)| item),
        limit,
    ))
}

/// The cursor for the next page: the last evaluated item's table key, plus
/// its index key when reading an index.
fn last_key(
    more: bool,
    items: &[Item],
    table_schema: &KeySchema,
    index_schema: Option<&KeySchema>,
) -> Key {
    let Some(last) = items.last().filter(|_| more) else {
        return Key::new();
    };
    let mut key = table_schema.key_of(last);
    if let Some(index_schema) = index_schema {
        key.extend(index_schema.key_of(last));
    }
    key
}
