//! DynamoDB model types for dynaquery.
//!
//! This crate holds the typed attribute model and the request/response payloads
//! exchanged between the query builders and whichever client executes them.
//! The payloads mirror DynamoDB's request and response shapes.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod convert;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
mod serializer;
pub mod types;

pub use attribute_value::{AttributeValue, Item, Key};
pub use convert::{ConvertError, from_item, to_attribute_value, to_item};
pub use error::{DynamoDBError, DynamoDBErrorCode};
pub use operations::DynamoDBOperation;
