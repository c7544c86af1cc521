//! Execution dispatch.
//!
//! Builders never talk to a database directly. They hand their assembled
//! request to a [`Dispatcher`], which either returns the installed
//! [`Substitute`] outcome or forwards the request to its [`DynamoClient`].
//! Client errors pass through untouched.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use dynaquery_model::input::{
    DeleteItemInput, PutItemInput, QueryInput, ScanInput, UpdateItemInput,
};
use dynaquery_model::output::{
    DeleteItemOutput, PutItemOutput, QueryOutput, ScanOutput, UpdateItemOutput,
};
use dynaquery_model::{DynamoDBError, DynamoDBOperation, Item};

use crate::error::DynaqueryResult;
use crate::read::Page;

/// A synchronous DynamoDB client.
///
/// Each call blocks until the service answers. Implementations report
/// failures as [`DynamoDBError`]s; the dispatcher does not retry or reclassify
/// them.
pub trait DynamoClient: Send + Sync + fmt::Debug {
    /// Run a `Query`.
    fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError>;

    /// Run a `Scan`.
    fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError>;

    /// Run a `PutItem`.
    fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError>;

    /// Run an `UpdateItem`.
    fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError>;

    /// Run a `DeleteItem`.
    fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError>;
}

/// A canned outcome returned instead of contacting the client.
#[derive(Debug, Clone)]
pub enum Substitute {
    /// Reads return these items with no cursor; writes succeed. An update
    /// returns the first item as its new attributes.
    Items(Vec<Item>),
    /// Every operation fails with this error.
    Error(DynamoDBError),
}

impl Substitute {
    /// Substitute that yields `items`.
    #[must_use]
    pub fn items(items: Vec<Item>) -> Self {
        Self::Items(items)
    }

    /// Substitute that fails with `error`.
    #[must_use]
    pub fn error(error: DynamoDBError) -> Self {
        Self::Error(error)
    }

    fn outcome(&self) -> Result<Vec<Item>, DynamoDBError> {
        match self {
            Self::Items(items) => Ok(items.clone()),
            Self::Error(e) => Err(e.clone()),
        }
    }
}

/// Routes built requests to a client or to an installed substitute.
///
/// The substitute is scoped to this dispatcher; builders obtained from other
/// dispatchers are unaffected by it.
#[derive(Debug)]
pub struct Dispatcher {
    client: Arc<dyn DynamoClient>,
    substitute: RwLock<Option<Substitute>>,
}

impl Dispatcher {
    /// Create a dispatcher that forwards to `client`.
    #[must_use]
    pub fn new(client: Arc<dyn DynamoClient>) -> Self {
        Self {
            client,
            substitute: RwLock::new(None),
        }
    }

    /// Install a substitute, replacing any previous one.
    pub fn install(&self, substitute: Substitute) {
        *self.substitute.write() = Some(substitute);
    }

    /// Remove the installed substitute, if any.
    pub fn clear(&self) {
        *self.substitute.write() = None;
    }

    /// Whether a substitute is currently installed.
    #[must_use]
    pub fn is_substituted(&self) -> bool {
        self.substitute.read().is_some()
    }

    fn substituted(
        &self,
        operation: DynamoDBOperation,
        table: &str,
    ) -> Option<Result<Vec<Item>, DynamoDBError>> {
        let guard = self.substitute.read();
        let substitute = guard.as_ref()?;
        debug!(%operation, table, "returning substituted outcome");
        Some(substitute.outcome())
    }

    /// Dispatch a query.
    pub fn query(&self, input: QueryInput) -> DynaqueryResult<Page> {
        if let Some(outcome) = self.substituted(DynamoDBOperation::Query, &input.table_name) {
            return Ok(Page::from_items(outcome?));
        }
        debug!(
            operation = %DynamoDBOperation::Query,
            table = %input.table_name,
            index = ?input.index_name,
            "dispatching request"
        );
        let output = self.client.query(input)?;
        Ok(Page::new(output.items, output.last_evaluated_key))
    }

    /// Dispatch a scan.
    pub fn scan(&self, input: ScanInput) -> DynaqueryResult<Page> {
        if let Some(outcome) = self.substituted(DynamoDBOperation::Scan, &input.table_name) {
            return Ok(Page::from_items(outcome?));
        }
        debug!(
            operation = %DynamoDBOperation::Scan,
            table = %input.table_name,
            "dispatching request"
        );
        let output = self.client.scan(input)?;
        Ok(Page::new(output.items, output.last_evaluated_key))
    }

    /// Dispatch a put.
    pub fn put_item(&self, input: PutItemInput) -> DynaqueryResult<()> {
        if let Some(outcome) = self.substituted(DynamoDBOperation::PutItem, &input.table_name) {
            outcome?;
            return Ok(());
        }
        debug!(
            operation = %DynamoDBOperation::PutItem,
            table = %input.table_name,
            attributes = input.item.len(),
            "dispatching request"
        );
        self.client.put_item(input)?;
        Ok(())
    }

    /// Dispatch an update and return the updated attributes.
    pub fn update_item(&self, input: UpdateItemInput) -> DynaqueryResult<Item> {
        if let Some(outcome) = self.substituted(DynamoDBOperation::UpdateItem, &input.table_name)
        {
            return Ok(outcome?.into_iter().next().unwrap_or_default());
        }
        debug!(
            operation = %DynamoDBOperation::UpdateItem,
            table = %input.table_name,
            expression = ?input.update_expression,
            "dispatching request"
        );
        let output = self.client.update_item(input)?;
        Ok(output.attributes)
    }

    /// Dispatch a delete.
    pub fn delete_item(&self, input: DeleteItemInput) -> DynaqueryResult<()> {
        if let Some(outcome) = self.substituted(DynamoDBOperation::DeleteItem, &input.table_name)
        {
            outcome?;
            return Ok(());
        }
        debug!(
            operation = %DynamoDBOperation::DeleteItem,
            table = %input.table_name,
            "dispatching request"
        );
        self.client.delete_item(input)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dynaquery_model::{AttributeValue, DynamoDBErrorCode};

    use super::*;
    use crate::error::DynaqueryError;
    use crate::test_support::RecordingClient;

    fn item(id: &str) -> Item {
        let mut item = Item::new();
        item.insert("id".to_owned(), AttributeValue::S(id.to_owned()));
        item
    }

    #[test]
    fn test_should_forward_to_client_without_substitute() {
        let client = Arc::new(RecordingClient::with_items(vec![item("from-client")]));
        let dispatcher = Dispatcher::new(client.clone());

        let page = dispatcher
            .scan(ScanInput {
                table_name: "notes".to_owned(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(page.items, vec![item("from-client")]);
        assert_eq!(client.calls(), vec![DynamoDBOperation::Scan]);
    }

    #[test]
    fn test_should_bypass_client_when_substituted() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Dispatcher::new(client.clone());
        dispatcher.install(Substitute::items(vec![item("1")]));

        let page = dispatcher.query(QueryInput::default()).unwrap();

        assert_eq!(page.items, vec![item("1")]);
        assert!(page.last_evaluated_key.is_none());
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_should_return_substituted_error_for_writes() {
        let dispatcher = Dispatcher::new(Arc::new(RecordingClient::default()));
        dispatcher.install(Substitute::error(DynamoDBError::with_message(
            DynamoDBErrorCode::ProvisionedThroughputExceededException,
            "slow down",
        )));

        let err = dispatcher.delete_item(DeleteItemInput::default()).unwrap_err();
        let DynaqueryError::Client(client_err) = err else {
            panic!("expected client error, got {err:?}");
        };
        assert_eq!(
            client_err.code,
            DynamoDBErrorCode::ProvisionedThroughputExceededException
        );
        assert_eq!(client_err.message, "slow down");
    }

    #[test]
    fn test_should_reach_client_again_after_clear() {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Dispatcher::new(client.clone());
        dispatcher.install(Substitute::items(Vec::new()));
        assert!(dispatcher.is_substituted());

        dispatcher.clear();
        dispatcher.put_item(PutItemInput::default()).unwrap();

        assert!(!dispatcher.is_substituted());
        assert_eq!(client.calls(), vec![DynamoDBOperation::PutItem]);
    }

    #[test]
    fn test_should_pass_client_error_through_unchanged() {
        let client = Arc::new(RecordingClient::failing(DynamoDBError::resource_not_found(
            "Requested resource not found",
        )));
        let dispatcher = Dispatcher::new(client);

        let err = dispatcher.update_item(UpdateItemInput::default()).unwrap_err();
        let client_err = err.as_client().unwrap();
        assert_eq!(client_err.code, DynamoDBErrorCode::ResourceNotFoundException);
        assert_eq!(client_err.message, "Requested resource not found");
    }
}
