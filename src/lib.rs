//! APOD search engine.
//!
//! Indexes Astronomy Picture of the Day records into a document store and
//! answers full-text, prefix and semantic queries over them. The store is
//! either a remote Elasticsearch cluster or an embedded Tantivy index; both
//! sit behind [`store::DocumentStore`].

pub mod api;
pub mod config;
pub mod connection;
pub mod embedding;
pub mod error;
pub mod indexing;
pub mod metrics;
pub mod models;
pub mod search;
pub mod store;
pub mod telemetry;

pub use connection::{ConnectionError, ConnectionManager, ConnectionPolicy};
pub use error::{AppError, Result};
pub use models::ApodDocument;
