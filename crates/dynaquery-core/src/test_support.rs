//! Client double for unit tests.

use parking_lot::Mutex;

use dynaquery_model::input::{
    DeleteItemInput, PutItemInput, QueryInput, ScanInput, UpdateItemInput,
};
use dynaquery_model::output::{
    DeleteItemOutput, PutItemOutput, QueryOutput, ScanOutput, UpdateItemOutput,
};
use dynaquery_model::{DynamoDBError, DynamoDBOperation, Item};

use crate::dispatch::DynamoClient;

/// A request as the client received it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Recorded {
    Query(QueryInput),
    Scan(ScanInput),
    Put(PutItemInput),
    Update(UpdateItemInput),
    Delete(DeleteItemInput),
}

impl Recorded {
    fn operation(&self) -> DynamoDBOperation {
        match self {
            Self::Query(_) => DynamoDBOperation::Query,
            Self::Scan(_) => DynamoDBOperation::Scan,
            Self::Put(_) => DynamoDBOperation::PutItem,
            Self::Update(_) => DynamoDBOperation::UpdateItem,
            Self::Delete(_) => DynamoDBOperation::DeleteItem,
        }
    }
}

/// Records every request and answers with fixed items or a fixed error.
#[derive(Debug, Default)]
pub(crate) struct RecordingClient {
    items: Vec<Item>,
    failure: Option<DynamoDBError>,
    requests: Mutex<Vec<Recorded>>,
}

impl RecordingClient {
    pub(crate) fn with_items(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub(crate) fn failing(error: DynamoDBError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<DynamoDBOperation> {
        self.requests.lock().iter().map(Recorded::operation).collect()
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    fn record(&self, request: Recorded) -> Result<Vec<Item>, DynamoDBError> {
        self.requests.lock().push(request);
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(self.items.clone()),
        }
    }
}

impl DynamoClient for RecordingClient {
    fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        let items = self.record(Recorded::Query(input))?;
        let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
        Ok(QueryOutput {
            items,
            count,
            scanned_count: count,
            ..Default::default()
        })
    }

    fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        let items = self.record(Recorded::Scan(input))?;
        let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
        Ok(ScanOutput {
            items,
            count,
            scanned_count: count,
            ..Default::default()
        })
    }

    fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        self.record(Recorded::Put(input))?;
        Ok(PutItemOutput::default())
    }

    fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError> {
        let items = self.record(Recorded::Update(input))?;
        Ok(UpdateItemOutput {
            attributes: items.into_iter().next().unwrap_or_default(),
        })
    }

    fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError> {
        self.record(Recorded::Delete(input))?;
        Ok(DeleteItemOutput::default())
    }
}
