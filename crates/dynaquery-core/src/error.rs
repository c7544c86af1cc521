//! Error type for the query builders.

use dynaquery_model::{ConvertError, DynamoDBError};

/// Errors surfaced by `execute` and by operator parsing.
#[derive(Debug, thiserror::Error)]
pub enum DynaqueryError {
    /// The client (or an installed substitute) reported an error. Passed
    /// through unchanged.
    #[error(transparent)]
    Client(#[from] DynamoDBError),

    /// A caller value could not be converted into attributes.
    #[error("failed to serialize {target}: {source}")]
    Serialization {
        /// Which part of the request was being built.
        target: &'static str,
        /// The conversion failure.
        #[source]
        source: ConvertError,
    },

    /// A comparison token outside `=`, `>`, `>=`, `<`, `<=`.
    #[error("unknown comparison operator: {0:?}")]
    UnknownOperator(String),
}

impl DynaqueryError {
    /// Returns the client error if this error came from the database.
    #[must_use]
    pub fn as_client(&self) -> Option<&DynamoDBError> {
        match self {
            Self::Client(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience result type for builder operations.
pub type DynaqueryResult<T> = Result<T, DynaqueryError>;

/// Keep the first deferred error; later ones are dropped.
pub(crate) fn defer(pending: &mut Option<DynaqueryError>, err: DynaqueryError) {
    if pending.is_none() {
        *pending = Some(err);
    }
}
