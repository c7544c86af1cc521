//! dynaquery demo - read and write notes through the fluent builders.
//!
//! Queries every note for `myResourceTest` in ascending sort-key order, then
//! saves a new note for the same resource.
//!
//! # Usage
//!
//! ```text
//! DYNAMODB_ENDPOINT_URL=http://localhost:4566 dynaquery-demo
//! dynaquery-demo --in-memory
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DYNAMODB_TABLE` | `notes` | Table holding the notes |
//! | `DYNAMODB_ENDPOINT_URL` | *(unset)* | Endpoint override |
//! | `AWS_REGION` | `us-east-1` | Region (falls back to `DEFAULT_REGION`) |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dynaquery_aws::SdkClient;
use dynaquery_core::{ComparisonOperator, Dynamo, Order, ReadMode, ReadOperation};
use dynaquery_memory::{KeyAttribute, MemoryDynamo, TableDefinition};

const RESOURCE_ID: &str = "myResourceTest";

/// Demo settings.
#[derive(Debug, Clone)]
struct DemoConfig {
    table: String,
    log_level: String,
}

impl DemoConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            table: std::env::var("DYNAMODB_TABLE").unwrap_or(defaults.table),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            table: "notes".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}

/// A note attached to a resource.
#[derive(Debug, Serialize, Deserialize)]
struct Note {
    resource_id: String,
    created_at: i64,
    id: String,
    note: String,
    written_by: String,
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

/// A memory-backed facade with the notes table already created.
fn memory_dynamo(table: &str) -> Result<Dynamo> {
    let engine = MemoryDynamo::new();
    engine
        .create_table(
            TableDefinition::new(table, KeyAttribute::string("resource_id"))
                .with_sort_key(KeyAttribute::number("created_at")),
        )
        .with_context(|| format!("failed to create table {table}"))?;
    Ok(Dynamo::from_client(engine))
}

fn main() -> Result<()> {
    let config = DemoConfig::from_env();
    init_tracing(&config.log_level)?;

    let dynamo = if std::env::args().any(|a| a == "--in-memory") {
        info!(table = %config.table, "using in-memory tables");
        memory_dynamo(&config.table)?
    } else {
        Dynamo::from_client(SdkClient::from_env().context("failed to create DynamoDB client")?)
    };

    let page = dynamo
        .query(&config.table, ReadMode::Table)
        .criterion("resource_id", ComparisonOperator::Equal, RESOURCE_ID)
        .order(Order::Ascending)
        .execute()
        .context("failed to query notes")?;
    let notes: Vec<Note> = page
        .deserialize_items()
        .context("failed to decode notes")?;
    info!(count = notes.len(), more = page.has_more(), "queried notes");
    for note in &notes {
        info!(id = %note.id, created_at = note.created_at, note = %note.note, "note");
    }

    let note = Note {
        resource_id: RESOURCE_ID.to_owned(),
        created_at: chrono::Utc::now().timestamp(),
        id: uuid::Uuid::new_v4().to_string(),
        note: "written by dynaquery-demo".to_owned(),
        written_by: "dynaquery-demo".to_owned(),
    };
    dynamo
        .save(&config.table)
        .entity(&note)
        .execute()
        .context("failed to save note")?;
    info!(id = %note.id, "saved note");

    Ok(())
}
