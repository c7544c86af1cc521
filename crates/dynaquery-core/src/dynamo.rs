//! The builder factory.

use std::sync::Arc;

use crate::dispatch::{Dispatcher, DynamoClient, Substitute};
use crate::read::{ReadBuilder, ReadMode};
use crate::write::{DeleteBuilder, InsertBuilder, UpdateBuilder};

/// Entry point handing out single-use builders bound to one client.
///
/// Clones share the same dispatcher, so a substitute installed through one
/// clone is seen by builders created from any of them.
#[derive(Debug, Clone)]
pub struct Dynamo {
    dispatcher: Arc<Dispatcher>,
}

impl Dynamo {
    /// Create a facade over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn DynamoClient>) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(client)),
        }
    }

    /// Create a facade that owns `client`.
    #[must_use]
    pub fn from_client(client: impl DynamoClient + 'static) -> Self {
        Self::new(Arc::new(client))
    }

    /// Start a read against `table`.
    #[must_use]
    pub fn query(&self, table: impl Into<String>, mode: ReadMode) -> ReadBuilder {
        ReadBuilder::new(self.dispatcher.clone(), table.into(), mode)
    }

    /// Start an insert into `table`.
    #[must_use]
    pub fn save(&self, table: impl Into<String>) -> InsertBuilder {
        InsertBuilder::new(self.dispatcher.clone(), table.into())
    }

    /// Start an update in `table`.
    #[must_use]
    pub fn update(&self, table: impl Into<String>) -> UpdateBuilder {
        UpdateBuilder::new(self.dispatcher.clone(), table.into())
    }

    /// Start a delete from `table`.
    #[must_use]
    pub fn remove(&self, table: impl Into<String>) -> DeleteBuilder {
        DeleteBuilder::new(self.dispatcher.clone(), table.into())
    }

    /// Make every subsequent `execute` return `substitute` instead of calling
    /// the client.
    pub fn install_substitute(&self, substitute: Substitute) {
        self.dispatcher.install(substitute);
    }

    /// Go back to calling the client.
    pub fn clear_substitute(&self) {
        self.dispatcher.clear();
    }

    /// The dispatcher shared by this facade's builders.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use dynaquery_model::{AttributeValue, DynamoDBOperation, Item};

    use super::*;
    use crate::comparison::ComparisonOperator;
    use crate::read::ReadOperation;
    use crate::test_support::RecordingClient;

    #[test]
    fn test_should_keep_substitute_per_instance() {
        let client = Arc::new(RecordingClient::default());
        let substituted = Dynamo::new(client.clone());
        let live = Dynamo::new(client.clone());
        let mut item = Item::new();
        item.insert("id".to_owned(), AttributeValue::S("1".to_owned()));
        substituted.install_substitute(Substitute::items(vec![item.clone()]));

        let page = substituted
            .query("t", ReadMode::Scan)
            .criterion("x", ComparisonOperator::Equal, 1)
            .execute()
            .unwrap();
        live.remove("t").criterion("id", "1").execute().unwrap();

        assert_eq!(page.items, vec![item]);
        assert_eq!(client.calls(), vec![DynamoDBOperation::DeleteItem]);
    }

    #[test]
    fn test_should_share_substitute_between_clones() {
        let client = Arc::new(RecordingClient::default());
        let dynamo = Dynamo::new(client.clone());
        let clone = dynamo.clone();

        dynamo.install_substitute(Substitute::items(Vec::new()));
        clone.save("t").item(Item::new()).execute().unwrap();
        dynamo.clear_substitute();
        clone.update("t").criterion("id", "1").execute().unwrap();

        assert!(!clone.dispatcher().is_substituted());
        assert_eq!(client.calls(), vec![DynamoDBOperation::UpdateItem]);
    }
}
