//! An in-process DynamoDB-compatible table engine.
//!
//! [`MemoryDynamo`] implements [`dynaquery_core::DynamoClient`] over
//! concurrent in-memory tables, so the query builders can run without a
//! database. It understands the expression subset the builders emit:
//! conjunctions of `name op :placeholder` comparisons and `SET` update
//! clauses.
//!
//! ```
//! use dynaquery_core::{ComparisonOperator, Dynamo, ReadMode, ReadOperation};
//! use dynaquery_memory::{KeyAttribute, MemoryDynamo, TableDefinition};
//!
//! let engine = MemoryDynamo::new();
//! engine
//!     .create_table(TableDefinition::new("notes", KeyAttribute::string("resource_id")))
//!     .unwrap();
//! let dynamo = Dynamo::from_client(engine);
//! let page = dynamo
//!     .query("notes", ReadMode::Table)
//!     .criterion("resource_id", ComparisonOperator::Equal, "r1")
//!     .execute()
//!     .unwrap();
//! assert!(page.items.is_empty());
//! ```
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod error;
pub mod expression;
pub mod provider;
pub mod storage;
pub mod table;

pub use provider::MemoryDynamo;
pub use storage::{KeyAttribute, KeySchema};
pub use table::{IndexDefinition, MemoryTable, TableDefinition};
