//! Integration tests for dynaquery against a DynamoDB-compatible endpoint.
//!
//! These tests require a server at `localhost:4566` (override with
//! `DYNAMODB_ENDPOINT_URL`). They are marked `#[ignore]` so they don't run
//! during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p dynaquery-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    Projection, ProjectionType, ScalarAttributeType,
};
use dynaquery_aws::{AwsConfig, SdkClient};
use dynaquery_core::Dynamo;

mod test_dynaquery;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("DYNAMODB_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Create a blocking client pointing at the local server.
#[must_use]
pub fn sdk_client() -> Arc<SdkClient> {
    init_tracing();
    let client = SdkClient::connect(&AwsConfig::local(endpoint_url()))
        .unwrap_or_else(|e| panic!("failed to create client: {e}"));
    Arc::new(client)
}

/// A builder facade sharing `client`.
#[must_use]
pub fn dynamo(client: &Arc<SdkClient>) -> Dynamo {
    Dynamo::new(Arc::clone(client) as Arc<dyn dynaquery_core::DynamoClient>)
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

fn key_element(name: &str, key_type: KeyType) -> KeySchemaElement {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .unwrap()
}

fn attribute(name: &str, attr_type: ScalarAttributeType) -> AttributeDefinition {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(attr_type)
        .build()
        .unwrap()
}

/// Create a notes table keyed by `resource_id` (S) and `created_at` (N),
/// with a `by_author` index on `written_by` (S) and `created_at`.
pub fn create_notes_table(client: &SdkClient, table_name: &str) {
    let index = GlobalSecondaryIndex::builder()
        .index_name("by_author")
        .key_schema(key_element("written_by", KeyType::Hash))
        .key_schema(key_element("created_at", KeyType::Range))
        .projection(
            Projection::builder()
                .projection_type(ProjectionType::All)
                .build(),
        )
        .build()
        .unwrap();

    client
        .block_on(
            client
                .inner()
                .create_table()
                .table_name(table_name)
                .key_schema(key_element("resource_id", KeyType::Hash))
                .key_schema(key_element("created_at", KeyType::Range))
                .attribute_definitions(attribute("resource_id", ScalarAttributeType::S))
                .attribute_definitions(attribute("created_at", ScalarAttributeType::N))
                .attribute_definitions(attribute("written_by", ScalarAttributeType::S))
                .global_secondary_indexes(index)
                .billing_mode(BillingMode::PayPerRequest)
                .send(),
        )
        .unwrap_or_else(|e| panic!("failed to create table {table_name}: {e}"));
}

/// Delete a table created by a test.
pub fn delete_table(client: &SdkClient, table_name: &str) {
    client
        .block_on(client.inner().delete_table().table_name(table_name).send())
        .unwrap_or_else(|e| panic!("failed to delete table {table_name}: {e}"));
}
