//! AWS SDK backed [`DynamoClient`](dynaquery_core::DynamoClient).
//!
//! ```no_run
//! use dynaquery_aws::SdkClient;
//! use dynaquery_core::Dynamo;
//!
//! let client = SdkClient::from_env()?;
//! let dynamo = Dynamo::from_client(client);
//! # Ok::<(), dynaquery_aws::ConnectError>(())
//! ```
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod convert;

pub use client::{ConnectError, SdkClient};
pub use config::AwsConfig;
