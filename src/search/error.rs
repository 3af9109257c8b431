//! Error types for the query and aggregation engines

use crate::embedding::EmbeddingError;
use crate::store::StoreError;
use std::fmt::Display;

/// A search could not be answered
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The request itself is malformed
    #[error("Invalid search request: {0}")]
    InvalidRequest(String),

    /// The store failed or rejected the query
    #[error("Search failed: {0}")]
    Store(#[from] StoreError),

    /// The query text could not be embedded
    #[error("Query embedding failed: {0}")]
    Embedding(EmbeddingError),
}

impl From<EmbeddingError> for QueryError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::EmptyInput => {
                QueryError::InvalidRequest("search text has no searchable words".to_string())
            }
            other => QueryError::Embedding(other),
        }
    }
}

/// The year histogram could not be computed.
///
/// Carries a message fit for end users; the underlying failure is logged
/// where the error is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AggregationError {
    pub message: String,
}

impl AggregationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Log `cause` and replace it with a generic message
    pub fn from_failure(index: &str, cause: &dyn Display) -> Self {
        tracing::error!(index = %index, error = %cause, "Year histogram failed");
        Self::new(format!(
            "Could not compute the yearly document count for index '{}'",
            index
        ))
    }
}
