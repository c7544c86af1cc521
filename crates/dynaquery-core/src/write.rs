//! Write builders: insert, update and delete.
//!
//! None of these use the conditional-expression machinery. Insert and delete
//! are unconditional; update emits a plain `set` action list.

use std::sync::Arc;

use serde::Serialize;

use dynaquery_model::input::{DeleteItemInput, PutItemInput, UpdateItemInput};
use dynaquery_model::types::ReturnValue;
use dynaquery_model::{AttributeValue, Item, Key, to_attribute_value, to_item};

use crate::dispatch::Dispatcher;
use crate::error::{DynaqueryError, DynaqueryResult, defer};

/// Unconditional put of a whole record.
#[derive(Debug)]
pub struct InsertBuilder {
    dispatcher: Arc<Dispatcher>,
    table: String,
    item: Item,
    pending: Option<DynaqueryError>,
}

impl InsertBuilder {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, table: String) -> Self {
        Self {
            dispatcher,
            table,
            item: Item::new(),
            pending: None,
        }
    }

    /// Serialize `record` into the item to store.
    ///
    /// The record must serialize to a map (a struct or a map type); anything
    /// else makes `execute` fail with a serialization error.
    #[must_use]
    pub fn entity<T: Serialize + ?Sized>(mut self, record: &T) -> Self {
        match to_item(record) {
            Ok(item) => self.item = item,
            Err(source) => defer(
                &mut self.pending,
                DynaqueryError::Serialization {
                    target: "entity",
                    source,
                },
            ),
        }
        self
    }

    /// Use a prebuilt attribute map as the item.
    #[must_use]
    pub fn item(mut self, item: Item) -> Self {
        self.item = item;
        self
    }

    /// The request `execute` would send.
    #[must_use]
    pub fn request(&self) -> PutItemInput {
        PutItemInput {
            table_name: self.table.clone(),
            item: self.item.clone(),
        }
    }

    /// Store the item, replacing any existing item with the same key.
    pub fn execute(self) -> DynaqueryResult<()> {
        if let Some(err) = self.pending {
            return Err(err);
        }
        let request = self.request();
        self.dispatcher.put_item(request)
    }
}

/// Partial update of one item.
///
/// Each `value`, `number_value` or `list_value` call adds a `set` action;
/// setting the same attribute again replaces its value and keeps its
/// position.
#[derive(Debug)]
pub struct UpdateBuilder {
    dispatcher: Arc<Dispatcher>,
    table: String,
    key: Key,
    sets: Vec<(String, AttributeValue)>,
    pending: Option<DynaqueryError>,
}

impl UpdateBuilder {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, table: String) -> Self {
        Self {
            dispatcher,
            table,
            key: Key::new(),
            sets: Vec::new(),
            pending: None,
        }
    }

    /// Add an exact-match key attribute. Call once per key attribute.
    #[must_use]
    pub fn criterion(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.key.insert(key.to_owned(), value.into());
        self
    }

    /// Set `key` to `value`.
    #[must_use]
    pub fn value(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.set(key, value.into());
        self
    }

    /// Set `key` to an integer, stored as a number attribute.
    #[must_use]
    pub fn number_value(mut self, key: &str, value: i64) -> Self {
        self.set(key, AttributeValue::N(value.to_string()));
        self
    }

    /// Set `key` to a list built from `values`.
    #[must_use]
    pub fn list_value<T: Serialize>(mut self, key: &str, values: &[T]) -> Self {
        match to_attribute_value(values) {
            Ok(list) => self.set(key, list),
            Err(source) => defer(
                &mut self.pending,
                DynaqueryError::Serialization {
                    target: "list value",
                    source,
                },
            ),
        }
        self
    }

    fn set(&mut self, key: &str, value: AttributeValue) {
        match self.sets.iter_mut().find(|(name, _)| name == key) {
            Some((_, slot)) => *slot = value,
            None => self.sets.push((key.to_owned(), value)),
        }
    }

    /// The request `execute` would send.
    #[must_use]
    pub fn request(&self) -> UpdateItemInput {
        let update_expression = (!self.sets.is_empty()).then(|| {
            let actions: Vec<String> = self
                .sets
                .iter()
                .map(|(name, _)| format!("{name} = :{name}"))
                .collect();
            format!("set {}", actions.join(", "))
        });
        let expression_attribute_values = self
            .sets
            .iter()
            .map(|(name, value)| (format!(":{name}"), value.clone()))
            .collect();

        UpdateItemInput {
            table_name: self.table.clone(),
            key: self.key.clone(),
            update_expression,
            expression_attribute_values,
            return_values: Some(ReturnValue::UpdatedNew),
        }
    }

    /// Apply the update and return the updated attributes.
    pub fn execute(self) -> DynaqueryResult<Item> {
        if let Some(err) = self.pending {
            return Err(err);
        }
        let request = self.request();
        self.dispatcher.update_item(request)
    }
}

/// Unconditional delete by key.
#[derive(Debug)]
pub struct DeleteBuilder {
    dispatcher: Arc<Dispatcher>,
    table: String,
    key: Key,
}

impl DeleteBuilder {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, table: String) -> Self {
        Self {
            dispatcher,
            table,
            key: Key::new(),
        }
    }

    /// Add an exact-match key attribute. Call once per key attribute.
    #[must_use]
    pub fn criterion(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.key.insert(key.to_owned(), value.into());
        self
    }

    /// The request `execute` would send.
    #[must_use]
    pub fn request(&self) -> DeleteItemInput {
        DeleteItemInput {
            table_name: self.table.clone(),
            key: self.key.clone(),
        }
    }

    /// Delete the item. Deleting a missing item is not an error.
    pub fn execute(self) -> DynaqueryResult<()> {
        let request = self.request();
        self.dispatcher.delete_item(request)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynaquery_model::{DynamoDBError, DynamoDBErrorCode, DynamoDBOperation};

    use super::*;
    use crate::dispatch::Substitute;
    use crate::test_support::{Recorded, RecordingClient};

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_owned())
    }

    fn n(v: &str) -> AttributeValue {
        AttributeValue::N(v.to_owned())
    }

    fn setup() -> (Arc<RecordingClient>, Arc<Dispatcher>) {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Arc::new(Dispatcher::new(client.clone()));
        (client, dispatcher)
    }

    #[derive(Serialize)]
    struct Note {
        resource_id: String,
        id: String,
        note: String,
    }

    #[test]
    fn test_should_put_serialized_entity() {
        let (client, dispatcher) = setup();

        InsertBuilder::new(dispatcher, "notes".to_owned())
            .entity(&Note {
                resource_id: "r".to_owned(),
                id: "1".to_owned(),
                note: "hello".to_owned(),
            })
            .execute()
            .unwrap();

        let requests = client.requests();
        let [Recorded::Put(input)] = requests.as_slice() else {
            panic!("expected one put");
        };
        assert_eq!(input.table_name, "notes");
        assert_eq!(
            input.item,
            HashMap::from([
                ("resource_id".to_owned(), s("r")),
                ("id".to_owned(), s("1")),
                ("note".to_owned(), s("hello")),
            ])
        );
    }

    #[test]
    fn test_should_surface_entity_serialization_failure() {
        let (client, dispatcher) = setup();

        let err = InsertBuilder::new(dispatcher, "notes".to_owned())
            .entity(&42)
            .execute()
            .unwrap_err();

        assert!(matches!(
            err,
            DynaqueryError::Serialization {
                target: "entity",
                ..
            }
        ));
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_should_build_number_update() {
        let (client, dispatcher) = setup();

        UpdateBuilder::new(dispatcher, "counters".to_owned())
            .criterion("id", "c1")
            .number_value("count", 5)
            .execute()
            .unwrap();

        let requests = client.requests();
        let [Recorded::Update(input)] = requests.as_slice() else {
            panic!("expected one update");
        };
        assert_eq!(input.key, HashMap::from([("id".to_owned(), s("c1"))]));
        assert_eq!(input.update_expression.as_deref(), Some("set count = :count"));
        assert_eq!(
            input.expression_attribute_values,
            HashMap::from([(":count".to_owned(), n("5"))])
        );
        assert_eq!(input.return_values, Some(ReturnValue::UpdatedNew));
    }

    #[test]
    fn test_should_encode_values_by_type() {
        let (_, dispatcher) = setup();

        let request = UpdateBuilder::new(dispatcher, "t".to_owned())
            .criterion("id", "1")
            .value("name", "ana")
            .value("age", 41)
            .list_value("tags", &["a", "b"])
            .request();

        assert_eq!(
            request.update_expression.as_deref(),
            Some("set name = :name, age = :age, tags = :tags")
        );
        let values = &request.expression_attribute_values;
        assert_eq!(values[":name"], s("ana"));
        assert_eq!(values[":age"], n("41"));
        assert_eq!(values[":tags"], AttributeValue::L(vec![s("a"), s("b")]));
    }

    #[test]
    fn test_should_replace_repeated_attribute_in_place() {
        let (_, dispatcher) = setup();

        let request = UpdateBuilder::new(dispatcher, "t".to_owned())
            .value("a", "1")
            .value("b", "2")
            .number_value("a", 3)
            .request();

        assert_eq!(request.update_expression.as_deref(), Some("set a = :a, b = :b"));
        assert_eq!(request.expression_attribute_values[":a"], n("3"));
        assert_eq!(request.expression_attribute_values.len(), 2);
    }

    #[test]
    fn test_should_build_composite_key() {
        let (_, dispatcher) = setup();

        let request = DeleteBuilder::new(dispatcher, "notes".to_owned())
            .criterion("resource_id", "r")
            .criterion("id", "7")
            .request();

        assert_eq!(
            request.key,
            HashMap::from([("resource_id".to_owned(), s("r")), ("id".to_owned(), s("7"))])
        );
    }

    #[test]
    fn test_should_return_first_substituted_item_from_update() {
        let (client, dispatcher) = setup();
        let item: Item = HashMap::from([("count".to_owned(), n("6"))]);
        dispatcher.install(Substitute::items(vec![item.clone()]));

        let updated = UpdateBuilder::new(dispatcher, "counters".to_owned())
            .criterion("id", "c1")
            .number_value("count", 6)
            .execute()
            .unwrap();

        assert_eq!(updated, item);
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_should_return_installed_error_after_reinstall() {
        let (client, dispatcher) = setup();
        dispatcher.install(Substitute::items(Vec::new()));
        dispatcher.clear();
        dispatcher.install(Substitute::error(DynamoDBError::with_message(
            DynamoDBErrorCode::ConditionalCheckFailedException,
            "The conditional request failed",
        )));

        let err = DeleteBuilder::new(dispatcher, "notes".to_owned())
            .criterion("id", "1")
            .execute()
            .unwrap_err();

        let client_err = err.as_client().unwrap();
        assert_eq!(
            client_err.code,
            DynamoDBErrorCode::ConditionalCheckFailedException
        );
        assert_eq!(client_err.message, "The conditional request failed");
        assert!(!client.calls().contains(&DynamoDBOperation::DeleteItem));
    }
}
