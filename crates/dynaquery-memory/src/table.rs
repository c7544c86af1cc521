//! Table definitions and per-table state.

use parking_lot::Mutex;

use dynaquery_model::DynamoDBError;

use crate::storage::{KeyAttribute, KeySchema, TableStorage};

/// Shape of a table to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Partition key.
    pub partition_key: KeyAttribute,
    /// Optional sort key.
    pub sort_key: Option<KeyAttribute>,
    /// Secondary indexes queryable by name.
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    /// A table keyed by `partition_key` only.
    #[must_use]
    pub fn new(name: impl Into<String>, partition_key: KeyAttribute) -> Self {
        Self {
            name: name.into(),
            partition_key,
            sort_key: None,
            indexes: Vec::new(),
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: KeyAttribute) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    /// Add a secondary index.
    #[must_use]
    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub(crate) fn key_schema(&self) -> KeySchema {
        KeySchema {
            partition_key: self.partition_key.clone(),
            sort_key: self.sort_key.clone(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), DynamoDBError> {
        if self.name.trim().is_empty() {
            return Err(DynamoDBError::validation("TableName must not be empty"));
        }
        if self
            .sort_key
            .as_ref()
            .is_some_and(|sk| sk.name == self.partition_key.name)
        {
            return Err(DynamoDBError::validation(
                "Both the Hash Key and the Range Key element in the KeySchema have the same name",
            ));
        }
        for (i, index) in self.indexes.iter().enumerate() {
            if self.indexes[..i].iter().any(|other| other.name == index.name) {
                return Err(DynamoDBError::validation(format!(
                    "Duplicate index name: {}",
                    index.name
                )));
            }
        }
        Ok(())
    }
}

/// A secondary index: its own partition key and optional sort key.
///
/// Items lacking the index's key attributes are not part of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Index partition key.
    pub partition_key: KeyAttribute,
    /// Index sort key.
    pub sort_key: Option<KeyAttribute>,
}

impl IndexDefinition {
    /// An index keyed by `partition_key` only.
    #[must_use]
    pub fn new(name: impl Into<String>, partition_key: KeyAttribute) -> Self {
        Self {
            name: name.into(),
            partition_key,
            sort_key: None,
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: KeyAttribute) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    pub(crate) fn key_schema(&self) -> KeySchema {
        KeySchema {
            partition_key: self.partition_key.clone(),
            sort_key: self.sort_key.clone(),
        }
    }
}

/// A live table.
#[derive(Debug)]
pub struct MemoryTable {
    /// The definition the table was created with.
    pub definition: TableDefinition,
    /// Item storage.
    pub storage: TableStorage,
    /// Serializes read-modify-write updates.
    pub(crate) write_lock: Mutex<()>,
}

impl MemoryTable {
    pub(crate) fn new(definition: TableDefinition) -> Self {
        let storage = TableStorage::new(definition.key_schema());
        Self {
            definition,
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Key schema of the named index.
    pub(crate) fn index_schema(&self, name: &str) -> Result<KeySchema, DynamoDBError> {
        self.definition
            .indexes
            .iter()
            .find(|index| index.name == name)
            .map(IndexDefinition::key_schema)
            .ok_or_else(|| {
                DynamoDBError::validation(format!(
                    "The table does not have the specified index: {name}"
                ))
            })
    }
}
