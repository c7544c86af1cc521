//! Read builders: keyed query and full scan.
//!
//! Both variants share [`ReadOperation`]. They differ in where a criterion
//! lands: a [`QueryBuilder`] writes it into the key condition, a
//! [`ScanBuilder`] has no key condition and treats it as a filter.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use dynaquery_model::input::{QueryInput, ScanInput};
use dynaquery_model::{AttributeValue, Item, Key, from_item, to_item};

use crate::comparison::ComparisonOperator;
use crate::dispatch::Dispatcher;
use crate::error::{DynaqueryError, DynaqueryResult, defer};
use crate::expression::{ExpressionState, Slot};

/// Which kind of read a [`ReadBuilder`] performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadMode {
    /// Full table scan.
    Scan,
    /// Query against the table's primary key.
    Table,
    /// Query against the named secondary index.
    Index(String),
}

/// Direction in which a query walks the sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Order {
    /// Ascending sort-key order.
    #[default]
    Ascending,
    /// Descending sort-key order.
    Descending,
}

impl Order {
    /// The `ScanIndexForward` flag for this direction.
    #[must_use]
    pub fn scan_index_forward(self) -> bool {
        matches!(self, Self::Ascending)
    }
}

/// One page of read results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Items in the order the client returned them.
    pub items: Vec<Item>,
    /// Cursor to pass to [`ReadOperation::resume_from`] for the next page.
    /// `None` once the read is exhausted.
    pub last_evaluated_key: Option<Key>,
}

impl Page {
    /// Build a page from a client response. An empty key means no more pages.
    #[must_use]
    pub fn new(items: Vec<Item>, last_evaluated_key: Key) -> Self {
        Self {
            items,
            last_evaluated_key: (!last_evaluated_key.is_empty()).then_some(last_evaluated_key),
        }
    }

    pub(crate) fn from_items(items: Vec<Item>) -> Self {
        Self {
            items,
            last_evaluated_key: None,
        }
    }

    /// Whether another page can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.last_evaluated_key.is_some()
    }

    /// Convert every item into a caller record.
    pub fn deserialize_items<T: DeserializeOwned>(&self) -> DynaqueryResult<Vec<T>> {
        self.items
            .iter()
            .cloned()
            .map(|item| {
                from_item(item).map_err(|source| DynaqueryError::Serialization {
                    target: "item",
                    source,
                })
            })
            .collect()
    }
}

/// Chainable configuration shared by both read variants.
///
/// Every configuration call consumes and returns the builder; `execute`
/// consumes it for good, so a builder runs at most once.
pub trait ReadOperation: Sized {
    /// Add a key condition (query) or a filter (scan).
    #[must_use]
    fn criterion(self, name: &str, op: ComparisonOperator, value: impl Into<AttributeValue>)
    -> Self;

    /// Add a filter condition, evaluated after key matching.
    #[must_use]
    fn add_filter(self, name: &str, op: ComparisonOperator, value: impl Into<AttributeValue>)
    -> Self;

    /// Cap the number of items evaluated per page. `None` leaves the service
    /// default in place.
    #[must_use]
    fn limit(self, limit: Option<u32>) -> Self;

    /// Set the sort-key direction. Ignored by scans.
    #[must_use]
    fn order(self, order: Order) -> Self;

    /// Start after the key described by `key`, which is serialized into an
    /// attribute map. Attribute values inside `key`, such as a [`Key`] taken
    /// from an earlier page, are kept as they are. A serialization failure is
    /// reported by `execute`.
    #[must_use]
    fn exclusive_start_key<K: Serialize + ?Sized>(self, key: &K) -> Self;

    /// Start after a cursor returned in [`Page::last_evaluated_key`].
    #[must_use]
    fn resume_from(self, key: Key) -> Self;

    /// Run the read.
    fn execute(self) -> DynaqueryResult<Page>;
}

/// State common to queries and scans.
#[derive(Debug)]
struct ReadState {
    dispatcher: Arc<Dispatcher>,
    table: String,
    index: Option<String>,
    expression: ExpressionState,
    limit: Option<i32>,
    start_key: Key,
    pending: Option<DynaqueryError>,
}

impl ReadState {
    fn new(dispatcher: Arc<Dispatcher>, table: String, index: Option<String>) -> Self {
        Self {
            dispatcher,
            table,
            index,
            expression: ExpressionState::new(),
            limit: None,
            start_key: Key::new(),
            pending: None,
        }
    }

    fn set_limit(&mut self, limit: Option<u32>) {
        self.limit = limit.map(|n| i32::try_from(n).unwrap_or(i32::MAX));
    }

    fn set_start_key<K: Serialize + ?Sized>(&mut self, key: &K) {
        match to_item(key) {
            Ok(key) => self.start_key = key,
            Err(source) => defer(
                &mut self.pending,
                DynaqueryError::Serialization {
                    target: "exclusive start key",
                    source,
                },
            ),
        }
    }
}

/// Keyed lookup against a table or a secondary index.
#[derive(Debug)]
pub struct QueryBuilder {
    state: ReadState,
    scan_index_forward: Option<bool>,
}

impl QueryBuilder {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, table: String, index: Option<String>) -> Self {
        Self {
            state: ReadState::new(dispatcher, table, index),
            scan_index_forward: None,
        }
    }

    /// The request `execute` would send.
    #[must_use]
    pub fn request(&self) -> QueryInput {
        let state = &self.state;
        QueryInput {
            table_name: state.table.clone(),
            index_name: state.index.clone(),
            key_condition_expression: state.expression.key_condition().map(str::to_owned),
            filter_expression: state.expression.filter().map(str::to_owned),
            expression_attribute_values: state.expression.values().clone(),
            scan_index_forward: self.scan_index_forward,
            limit: state.limit,
            exclusive_start_key: state.start_key.clone(),
        }
    }
}

impl ReadOperation for QueryBuilder {
    fn criterion(
        mut self,
        name: &str,
        op: ComparisonOperator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.state
            .expression
            .push(Slot::KeyCondition, name, op, value.into());
        self
    }

    fn add_filter(
        mut self,
        name: &str,
        op: ComparisonOperator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.state.expression.push(Slot::Filter, name, op, value.into());
        self
    }

    fn limit(mut self, limit: Option<u32>) -> Self {
        self.state.set_limit(limit);
        self
    }

    fn order(mut self, order: Order) -> Self {
        self.scan_index_forward = Some(order.scan_index_forward());
        self
    }

    fn exclusive_start_key<K: Serialize + ?Sized>(mut self, key: &K) -> Self {
        self.state.set_start_key(key);
        self
    }

    fn resume_from(mut self, key: Key) -> Self {
        self.state.start_key = key;
        self
    }

    fn execute(mut self) -> DynaqueryResult<Page> {
        if let Some(err) = self.state.pending.take() {
            return Err(err);
        }
        let request = self.request();
        self.state.dispatcher.query(request)
    }
}

/// Full table (or index) scan. Every condition is a filter.
#[derive(Debug)]
pub struct ScanBuilder {
    state: ReadState,
}

impl ScanBuilder {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, table: String) -> Self {
        Self {
            state: ReadState::new(dispatcher, table, None),
        }
    }

    /// The request `execute` would send.
    #[must_use]
    pub fn request(&self) -> ScanInput {
        let state = &self.state;
        ScanInput {
            table_name: state.table.clone(),
            index_name: state.index.clone(),
            filter_expression: state.expression.filter().map(str::to_owned),
            expression_attribute_values: state.expression.values().clone(),
            limit: state.limit,
            exclusive_start_key: state.start_key.clone(),
        }
    }
}

impl ReadOperation for ScanBuilder {
    fn criterion(self, name: &str, op: ComparisonOperator, value: impl Into<AttributeValue>) -> Self {
        self.add_filter(name, op, value)
    }

    fn add_filter(
        mut self,
        name: &str,
        op: ComparisonOperator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.state.expression.push(Slot::Filter, name, op, value.into());
        self
    }

    fn limit(mut self, limit: Option<u32>) -> Self {
        self.state.set_limit(limit);
        self
    }

    fn order(self, order: Order) -> Self {
        warn!(table = %self.state.table, ?order, "scans have no sort order, ignoring");
        self
    }

    fn exclusive_start_key<K: Serialize + ?Sized>(mut self, key: &K) -> Self {
        self.state.set_start_key(key);
        self
    }

    fn resume_from(mut self, key: Key) -> Self {
        self.state.start_key = key;
        self
    }

    fn execute(mut self) -> DynaqueryResult<Page> {
        if let Some(err) = self.state.pending.take() {
            return Err(err);
        }
        let request = self.request();
        self.state.dispatcher.scan(request)
    }
}

/// The builder handed out by [`Dynamo::query`](crate::Dynamo::query).
#[derive(Debug)]
pub enum ReadBuilder {
    /// Keyed lookup.
    Query(QueryBuilder),
    /// Full scan.
    Scan(ScanBuilder),
}

impl ReadBuilder {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, table: String, mode: ReadMode) -> Self {
        match mode {
            ReadMode::Scan => Self::Scan(ScanBuilder::new(dispatcher, table)),
            ReadMode::Table => Self::Query(QueryBuilder::new(dispatcher, table, None)),
            ReadMode::Index(index) => Self::Query(QueryBuilder::new(dispatcher, table, Some(index))),
        }
    }

    /// Returns `true` for the scan variant.
    #[must_use]
    pub fn is_scan(&self) -> bool {
        matches!(self, Self::Scan(_))
    }
}

macro_rules! forward {
    ($self:ident, $b:ident => $call:expr) => {
        match $self {
            Self::Query($b) => Self::Query($call),
            Self::Scan($b) => Self::Scan($call),
        }
    };
}

impl ReadOperation for ReadBuilder {
    fn criterion(self, name: &str, op: ComparisonOperator, value: impl Into<AttributeValue>) -> Self {
        let value = value.into();
        forward!(self, b => b.criterion(name, op, value))
    }

    fn add_filter(self, name: &str, op: ComparisonOperator, value: impl Into<AttributeValue>) -> Self {
        let value = value.into();
        forward!(self, b => b.add_filter(name, op, value))
    }

    fn limit(self, limit: Option<u32>) -> Self {
        forward!(self, b => b.limit(limit))
    }

    fn order(self, order: Order) -> Self {
        forward!(self, b => b.order(order))
    }

    fn exclusive_start_key<K: Serialize + ?Sized>(self, key: &K) -> Self {
        forward!(self, b => b.exclusive_start_key(key))
    }

    fn resume_from(self, key: Key) -> Self {
        forward!(self, b => b.resume_from(key))
    }

    fn execute(self) -> DynaqueryResult<Page> {
        match self {
            Self::Query(b) => b.execute(),
            Self::Scan(b) => b.execute(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynaquery_model::DynamoDBOperation;

    use super::*;
    use crate::dispatch::Substitute;
    use crate::test_support::{Recorded, RecordingClient};

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_owned())
    }

    fn setup() -> (Arc<RecordingClient>, Arc<Dispatcher>) {
        let client = Arc::new(RecordingClient::default());
        let dispatcher = Arc::new(Dispatcher::new(client.clone()));
        (client, dispatcher)
    }

    #[test]
    fn test_should_build_single_key_condition() {
        let (client, dispatcher) = setup();

        QueryBuilder::new(dispatcher, "notes".to_owned(), None)
            .criterion("id", ComparisonOperator::Equal, "x")
            .execute()
            .unwrap();

        let requests = client.requests();
        let [Recorded::Query(input)] = requests.as_slice() else {
            panic!("expected one query");
        };
        assert_eq!(input.table_name, "notes");
        assert_eq!(input.key_condition_expression.as_deref(), Some("id = :id"));
        assert_eq!(input.filter_expression, None);
        assert_eq!(
            input.expression_attribute_values,
            HashMap::from([(":id".to_owned(), s("x"))])
        );
    }

    #[test]
    fn test_should_split_key_condition_and_filter() {
        let (_, dispatcher) = setup();

        let request = QueryBuilder::new(dispatcher, "notes".to_owned(), Some("by_owner".to_owned()))
            .criterion("owner", ComparisonOperator::Equal, "ana")
            .criterion("created_at", ComparisonOperator::GreaterOrEqual, "2024-01-01")
            .add_filter("status", ComparisonOperator::Equal, "open")
            .request();

        assert_eq!(request.index_name.as_deref(), Some("by_owner"));
        assert_eq!(
            request.key_condition_expression.as_deref(),
            Some("owner = :owner AND created_at >= :created_at")
        );
        assert_eq!(request.filter_expression.as_deref(), Some("status = :status2"));
        assert_eq!(request.expression_attribute_values.len(), 3);
    }

    #[test]
    fn test_should_suffix_repeated_filter_names() {
        let (_, dispatcher) = setup();

        let request = ScanBuilder::new(dispatcher, "people".to_owned())
            .add_filter("age", ComparisonOperator::GreaterThan, "30")
            .add_filter("age", ComparisonOperator::LessThan, "50")
            .request();

        assert_eq!(request.filter_expression.as_deref(), Some("age > :age0 AND age < :age1"));
        assert_eq!(
            request.expression_attribute_values,
            HashMap::from([(":age0".to_owned(), s("30")), (":age1".to_owned(), s("50"))])
        );
    }

    #[test]
    fn test_should_treat_scan_criterion_as_filter() {
        let (_, dispatcher) = setup();

        let via_criterion = ScanBuilder::new(dispatcher.clone(), "people".to_owned())
            .criterion("name", ComparisonOperator::Equal, "ana")
            .request();
        let via_filter = ScanBuilder::new(dispatcher, "people".to_owned())
            .add_filter("name", ComparisonOperator::Equal, "ana")
            .request();

        assert_eq!(via_criterion, via_filter);
        assert_eq!(via_criterion.filter_expression.as_deref(), Some("name = :name0"));
    }

    #[test]
    fn test_should_leave_scan_request_unchanged_on_order() {
        let (_, dispatcher) = setup();
        let builder = ScanBuilder::new(dispatcher, "people".to_owned())
            .add_filter("age", ComparisonOperator::GreaterThan, 18);
        let before = builder.request();

        let after = builder.order(Order::Ascending).order(Order::Descending).request();

        assert_eq!(before, after);
    }

    #[test]
    fn test_should_set_scan_direction_on_query() {
        let (_, dispatcher) = setup();

        let unset = QueryBuilder::new(dispatcher.clone(), "t".to_owned(), None).request();
        let desc = QueryBuilder::new(dispatcher, "t".to_owned(), None)
            .order(Order::Descending)
            .request();

        assert_eq!(unset.scan_index_forward, None);
        assert_eq!(desc.scan_index_forward, Some(false));
    }

    #[test]
    fn test_should_omit_absent_limit_and_clamp_large_limit() {
        let (_, dispatcher) = setup();

        let none = ScanBuilder::new(dispatcher.clone(), "t".to_owned())
            .limit(None)
            .request();
        let ten = ScanBuilder::new(dispatcher.clone(), "t".to_owned())
            .limit(Some(10))
            .request();
        let huge = ScanBuilder::new(dispatcher, "t".to_owned())
            .limit(Some(u32::MAX))
            .request();

        assert_eq!(none.limit, None);
        assert_eq!(ten.limit, Some(10));
        assert_eq!(huge.limit, Some(i32::MAX));
    }

    #[test]
    fn test_should_serialize_exclusive_start_key() {
        #[derive(Serialize)]
        struct NoteKey<'a> {
            resource_id: &'a str,
            id: &'a str,
        }
        let (_, dispatcher) = setup();

        let request = QueryBuilder::new(dispatcher, "notes".to_owned(), None)
            .exclusive_start_key(&NoteKey {
                resource_id: "r",
                id: "7",
            })
            .request();

        assert_eq!(
            request.exclusive_start_key,
            HashMap::from([
                ("resource_id".to_owned(), s("r")),
                ("id".to_owned(), s("7")),
            ])
        );
    }

    #[test]
    fn test_should_accept_returned_key_as_start_key() {
        let (_, dispatcher) = setup();
        let cursor: Key = HashMap::from([
            ("resource_id".to_owned(), s("r")),
            ("created_at".to_owned(), AttributeValue::N("4".to_owned())),
        ]);

        let request = QueryBuilder::new(dispatcher, "notes".to_owned(), None)
            .exclusive_start_key(&cursor)
            .request();

        assert_eq!(request.exclusive_start_key, cursor);
    }

    #[test]
    fn test_should_report_bad_start_key_without_dispatching() {
        let (client, dispatcher) = setup();

        let err = ScanBuilder::new(dispatcher, "t".to_owned())
            .exclusive_start_key("not a map")
            .execute()
            .unwrap_err();

        assert!(matches!(
            err,
            DynaqueryError::Serialization {
                target: "exclusive start key",
                ..
            }
        ));
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_should_route_read_modes_to_variants() {
        let (client, dispatcher) = setup();

        let scan = ReadBuilder::new(dispatcher.clone(), "t".to_owned(), ReadMode::Scan);
        let table = ReadBuilder::new(dispatcher.clone(), "t".to_owned(), ReadMode::Table);
        let index = ReadBuilder::new(dispatcher, "t".to_owned(), ReadMode::Index("gsi".to_owned()));
        assert!(scan.is_scan());
        assert!(!table.is_scan());

        let ReadBuilder::Query(ref q) = index else {
            panic!("index mode must query");
        };
        assert_eq!(q.request().index_name.as_deref(), Some("gsi"));

        scan.execute().unwrap();
        table.execute().unwrap();
        index.execute().unwrap();
        assert_eq!(
            client.calls(),
            vec![
                DynamoDBOperation::Scan,
                DynamoDBOperation::Query,
                DynamoDBOperation::Query
            ]
        );
    }

    #[test]
    fn test_should_return_substituted_items_regardless_of_configuration() {
        let (client, dispatcher) = setup();
        let item: Item = HashMap::from([("id".to_owned(), s("1"))]);
        dispatcher.install(Substitute::items(vec![item.clone()]));

        let page = ReadBuilder::new(dispatcher, "t".to_owned(), ReadMode::Table)
            .criterion("id", ComparisonOperator::Equal, "other")
            .add_filter("n", ComparisonOperator::LessThan, 3)
            .limit(Some(1))
            .order(Order::Descending)
            .execute()
            .unwrap();

        assert_eq!(page.items, vec![item]);
        assert_eq!(page.last_evaluated_key, None);
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_should_normalize_empty_cursor() {
        let page = Page::new(Vec::new(), Key::new());
        assert!(!page.has_more());

        let page = Page::new(Vec::new(), HashMap::from([("id".to_owned(), s("9"))]));
        assert!(page.has_more());
    }

    #[test]
    fn test_should_deserialize_page_items() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Row {
            id: String,
            n: i64,
        }
        let page = Page::from_items(vec![HashMap::from([
            ("id".to_owned(), s("a")),
            ("n".to_owned(), AttributeValue::N("4".to_owned())),
        ])]);

        let rows: Vec<Row> = page.deserialize_items().unwrap();

        assert_eq!(
            rows,
            vec![Row {
                id: "a".to_owned(),
                n: 4
            }]
        );
    }
}
