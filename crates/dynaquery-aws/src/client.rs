//! [`DynamoClient`] over the AWS SDK.

use aws_credential_types::Credentials;
use aws_sdk_dynamodb::config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_dynamodb::types::ReturnValue as SdkReturnValue;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use tokio::runtime::Runtime;
use tracing::debug;

use dynaquery_core::DynamoClient;
use dynaquery_model::input::{
    DeleteItemInput, PutItemInput, QueryInput, ScanInput, UpdateItemInput,
};
use dynaquery_model::output::{
    DeleteItemOutput, PutItemOutput, QueryOutput, ScanOutput, UpdateItemOutput,
};
use dynaquery_model::{DynamoDBError, DynamoDBErrorCode, Item};

use crate::config::AwsConfig;
use crate::convert::{SdkItem, from_sdk_item, non_empty, to_sdk_item};

/// Errors raised while setting up a client.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// The private runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// Only one half of a static key pair was configured.
    #[error("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together")]
    PartialCredentials,
}

/// A blocking DynamoDB client.
///
/// Requests run to completion on a private current-thread runtime, so the
/// client must not be called from inside another tokio runtime.
#[derive(Debug)]
pub struct SdkClient {
    client: aws_sdk_dynamodb::Client,
    runtime: Runtime,
}

impl SdkClient {
    /// Build a client from `config`.
    pub fn connect(config: &AwsConfig) -> Result<Self, ConnectError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        match (&config.access_key_id, &config.secret_access_key) {
            (Some(id), Some(secret)) => {
                loader = loader.credentials_provider(Credentials::new(
                    id,
                    secret,
                    config.session_token.clone(),
                    None,
                    "dynaquery-static",
                ));
            }
            (None, None) => {}
            _ => return Err(ConnectError::PartialCredentials),
        }

        let shared = runtime.block_on(loader.load());
        debug!(
            region = %config.region,
            endpoint = ?config.endpoint_url,
            "created DynamoDB client"
        );
        Ok(Self {
            client: aws_sdk_dynamodb::Client::new(&shared),
            runtime,
        })
    }

    /// Build a client from the environment, see [`AwsConfig::from_env`].
    pub fn from_env() -> Result<Self, ConnectError> {
        Self::connect(&AwsConfig::from_env())
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn inner(&self) -> &aws_sdk_dynamodb::Client {
        &self.client
    }

    /// Drive an SDK future on the client's runtime, for calls such as table
    /// management that the builders do not cover.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl DynamoClient for SdkClient {
    fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        let request = self
            .client
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_key_condition_expression(input.key_condition_expression)
            .set_filter_expression(input.filter_expression)
            .set_expression_attribute_values(non_empty(&input.expression_attribute_values))
            .set_scan_index_forward(input.scan_index_forward)
            .set_limit(input.limit)
            .set_exclusive_start_key(non_empty(&input.exclusive_start_key));
        let output = self.runtime.block_on(request.send()).map_err(sdk_error)?;

        Ok(QueryOutput {
            items: items(output.items())?,
            count: output.count(),
            scanned_count: output.scanned_count(),
            last_evaluated_key: optional_item(output.last_evaluated_key())?,
        })
    }

    fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        let request = self
            .client
            .scan()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_filter_expression(input.filter_expression)
            .set_expression_attribute_values(non_empty(&input.expression_attribute_values))
            .set_limit(input.limit)
            .set_exclusive_start_key(non_empty(&input.exclusive_start_key));
        let output = self.runtime.block_on(request.send()).map_err(sdk_error)?;

        Ok(ScanOutput {
            items: items(output.items())?,
            count: output.count(),
            scanned_count: output.scanned_count(),
            last_evaluated_key: optional_item(output.last_evaluated_key())?,
        })
    }

    fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        let request = self
            .client
            .put_item()
            .table_name(input.table_name)
            .set_item(Some(to_sdk_item(&input.item)));
        let output = self.runtime.block_on(request.send()).map_err(sdk_error)?;

        Ok(PutItemOutput {
            attributes: optional_item(output.attributes())?,
        })
    }

    fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, DynamoDBError> {
        let request = self
            .client
            .update_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(&input.key)))
            .set_update_expression(input.update_expression)
            .set_expression_attribute_values(non_empty(&input.expression_attribute_values))
            .set_return_values(
                input
                    .return_values
                    .map(|rv| SdkReturnValue::from(rv.as_str())),
            );
        let output = self.runtime.block_on(request.send()).map_err(sdk_error)?;

        Ok(UpdateItemOutput {
            attributes: optional_item(output.attributes())?,
        })
    }

    fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, DynamoDBError> {
        let request = self
            .client
            .delete_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(&input.key)));
        let output = self.runtime.block_on(request.send()).map_err(sdk_error)?;

        Ok(DeleteItemOutput {
            attributes: optional_item(output.attributes())?,
        })
    }
}

fn items(items: &[SdkItem]) -> Result<Vec<Item>, DynamoDBError> {
    items.iter().map(from_sdk_item).collect()
}

fn optional_item(item: Option<&SdkItem>) -> Result<Item, DynamoDBError> {
    item.map(from_sdk_item)
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Map an SDK failure onto a `DynamoDBError`, keeping the service error code
/// and the original error as the source.
fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> DynamoDBError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err
        .code()
        .map_or(DynamoDBErrorCode::InternalServerError, DynamoDBErrorCode::from_code);
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), str::to_owned);
    debug!(%code, %message, "DynamoDB request failed");
    DynamoDBError::with_message(code, message).with_source(err)
}
