//! Fluent query builders for DynamoDB-style tables.
//!
//! A [`Dynamo`] facade hands out single-use builders. Read builders translate
//! chained comparison calls into one key-condition or filter expression plus a
//! placeholder value map; write builders assemble put, update and delete
//! requests. Nothing touches the database until `execute` is called, at which
//! point the [`Dispatcher`] forwards the request to a [`DynamoClient`] or
//! returns a canned [`Substitute`] result.
//!
//! ```no_run
//! # fn run(dynamo: dynaquery_core::Dynamo) -> Result<(), dynaquery_core::DynaqueryError> {
//! use dynaquery_core::{ComparisonOperator, Order, ReadMode, ReadOperation};
//!
//! let page = dynamo
//!     .query("notes", ReadMode::Table)
//!     .criterion("resource_id", ComparisonOperator::Equal, "myResourceTest")
//!     .order(Order::Ascending)
//!     .execute()?;
//! println!("{} items", page.items.len());
//! # Ok(())
//! # }
//! ```
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod comparison;
pub mod dispatch;
pub mod dynamo;
pub mod error;
pub mod expression;
pub mod read;
pub mod write;

#[cfg(test)]
pub(crate) mod test_support;

pub use comparison::ComparisonOperator;
pub use dispatch::{Dispatcher, DynamoClient, Substitute};
pub use dynamo::Dynamo;
pub use error::{DynaqueryError, DynaqueryResult};
pub use expression::{ExpressionState, Slot};
pub use read::{Order, Page, QueryBuilder, ReadBuilder, ReadMode, ReadOperation, ScanBuilder};
pub use write::{DeleteBuilder, InsertBuilder, UpdateBuilder};

pub use dynaquery_model::{AttributeValue, DynamoDBError, DynamoDBErrorCode, Item, Key};
