//! Document store boundary.
//!
//! Every engine talks to the index store through [`DocumentStore`]. Two
//! backends implement it: a remote Elasticsearch cluster over REST and an
//! embedded Tantivy index on local disk.

pub mod elasticsearch;
pub mod embedded;
pub mod error;
pub mod factory;
pub mod request;

pub use elasticsearch::{ElasticsearchConnector, ElasticsearchStore};
pub use embedded::{EmbeddedConnector, EmbeddedStore};
pub use error::{StoreError, StoreResult};
pub use factory::create_connector;
pub use request::*;

use crate::indexing::IndexSchema;
use crate::models::ApodDocument;
use async_trait::async_trait;
use std::sync::Arc;

/// Operations the engines need from an index store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Verify the store answers
    async fn ping(&self) -> StoreResult<()>;

    /// Delete an index. Deleting an absent index succeeds.
    async fn delete_index(&self, index: &str) -> StoreResult<()>;

    /// Create an index with the given schema. Fails if it already exists.
    async fn create_index(&self, index: &str, schema: &IndexSchema) -> StoreResult<()>;

    /// Write a whole collection in one request
    async fn bulk_write(&self, index: &str, documents: &[ApodDocument])
        -> StoreResult<BulkOutcome>;

    /// Write a single document
    async fn write_one(&self, index: &str, document: &ApodDocument) -> StoreResult<()>;

    /// Make previous writes visible to searches
    async fn refresh(&self, index: &str) -> StoreResult<()>;

    /// Number of documents in an index
    async fn count(&self, index: &str) -> StoreResult<u64>;

    /// Run a query, returning hits, the total match count and any buckets
    async fn search(&self, index: &str, request: &StoreRequest) -> StoreResult<StoreResponse>;
}

/// Builds a live store handle from configuration
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Target description for logs, never including credentials
    fn describe(&self) -> String;

    /// Establish a connection and verify it
    async fn connect(&self) -> StoreResult<Arc<dyn DocumentStore>>;
}
