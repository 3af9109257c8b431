//! Offline indexing: schema provisioning and document loading.
//!
//! [`index_corpus`] is the whole pipeline for one retrieval strategy:
//! recreate the index, then load the collection into it.

mod error;
mod loader;
mod provisioner;
mod schema;

pub use error::{IndexProvisioningError, LoadError};
pub use loader::{BulkLoader, LoadSummary, RetryPolicy};
pub use provisioner::provision;
pub use schema::{
    Analyzer, IndexSchema, SchemaKind, WriteMode, EDGE_NGRAM_ANALYZER, EDGE_NGRAM_MAX,
    EDGE_NGRAM_MIN,
};

use crate::embedding::Embedder;
use crate::models::ApodDocument;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Errors of the provision-then-load pipeline
#[derive(Debug, thiserror::Error)]
pub enum IndexingError {
    #[error(transparent)]
    Provisioning(#[from] IndexProvisioningError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl From<IndexingError> for crate::error::AppError {
    fn from(err: IndexingError) -> Self {
        match err {
            IndexingError::Provisioning(e) => e.into(),
            IndexingError::Load(e) => e.into(),
        }
    }
}

/// Provision `index` with `schema` and load `documents` into it
pub async fn index_corpus(
    store: Arc<dyn DocumentStore>,
    index: &str,
    schema: &IndexSchema,
    documents: &[ApodDocument],
    embedder: Option<&dyn Embedder>,
    retry: RetryPolicy,
) -> Result<LoadSummary, IndexingError> {
    provision(store.as_ref(), index, schema).await?;

    let loader = BulkLoader::new(store).with_retry_policy(retry);
    let summary = loader.load(index, schema, documents, embedder).await?;
    Ok(summary)
}
