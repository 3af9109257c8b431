//! Errors raised while building and filling indices

use crate::embedding::EmbeddingError;
use crate::store::StoreError;

/// Deleting or creating an index was rejected by the store
#[derive(Debug, thiserror::Error)]
pub enum IndexProvisioningError {
    #[error("Failed to delete index '{index}': {source}")]
    Delete {
        index: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to create index '{index}': {source}")]
    Create {
        index: String,
        #[source]
        source: StoreError,
    },
}

/// A write failed during loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Index '{index}' stores embeddings but no embedder was supplied")]
    MissingEmbedder { index: String },

    #[error("Bulk write to '{index}' failed: {source}")]
    Bulk {
        index: String,
        #[source]
        source: StoreError,
    },

    #[error("Embedding document {position} failed after {written} written: {source}")]
    Embedding {
        written: usize,
        position: usize,
        #[source]
        source: EmbeddingError,
    },

    #[error("Writing document {position} to '{index}' failed after {written} written: {source}")]
    Write {
        index: String,
        written: usize,
        position: usize,
        #[source]
        source: StoreError,
    },

    #[error("Refreshing index '{index}' failed: {source}")]
    Refresh {
        index: String,
        #[source]
        source: StoreError,
    },
}

impl LoadError {
    /// Documents persisted before the failure
    pub fn written(&self) -> usize {
        match self {
            LoadError::Embedding { written, .. } | LoadError::Write { written, .. } => *written,
            _ => 0,
        }
    }
}
