//! Error types for document store operations

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by a document store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status
    #[error("Store returned {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Index not found
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Index already exists
    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    /// A document was refused by the index mapping
    #[error("Document rejected: {0}")]
    Rejected(String),

    /// Query cannot run against the index
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Index name is not usable
    #[error("Invalid index name: {0}")]
    InvalidIndexName(String),

    /// Request or response could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Tantivy error
    #[error("Tantivy error: {0}")]
    Tantivy(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the failure happened before the store could answer
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }
}

impl From<tantivy::TantivyError> for StoreError {
    fn from(err: tantivy::TantivyError) -> Self {
        StoreError::Tantivy(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else if let Some(status) = err.status() {
            StoreError::Status {
                status: status.as_u16(),
                reason: err.to_string(),
            }
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}
