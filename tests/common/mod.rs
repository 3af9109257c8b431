//! Shared fixtures for integration tests

#![allow(dead_code)]

use apod_search::embedding::Embedder;
use apod_search::indexing::{index_corpus, IndexSchema, LoadSummary, RetryPolicy};
use apod_search::models::ApodDocument;
use apod_search::store::{
    DocumentStore, EmbeddedStore, StoreConnector, StoreError, StoreResult,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

pub const INDEX: &str = "apod";

pub fn doc(title: &str, explanation: &str, date: &str) -> ApodDocument {
    ApodDocument::new(
        title,
        explanation,
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        format!("https://apod.nasa.gov/apod/image/{}.jpg", date),
    )
}

/// Embedded store in a temporary directory, kept alive by the returned guard
pub fn embedded_store() -> (TempDir, Arc<EmbeddedStore>) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(EmbeddedStore::open(dir.path()).unwrap());
    (dir, store)
}

/// Provision [`INDEX`] with `schema` and load `documents`
pub async fn indexed(
    schema: IndexSchema,
    documents: &[ApodDocument],
    embedder: Option<&dyn Embedder>,
) -> (TempDir, Arc<dyn DocumentStore>, LoadSummary) {
    let (dir, store) = embedded_store();
    let store: Arc<dyn DocumentStore> = store;
    let summary = index_corpus(
        store.clone(),
        INDEX,
        &schema,
        documents,
        embedder,
        RetryPolicy::no_retry(),
    )
    .await
    .unwrap();
    (dir, store, summary)
}

/// Parse Prometheus exposition output into metric name -> lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            if let Some(name) = line.split_whitespace().nth(2) {
                current_metric = name.to_string();
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}

/// Hands out an already open store
pub struct StaticConnector(pub Arc<dyn DocumentStore>);

#[async_trait::async_trait]
impl StoreConnector for StaticConnector {
    fn describe(&self) -> String {
        "static test store".to_string()
    }

    async fn connect(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        Ok(self.0.clone())
    }
}

/// Never connects
pub struct UnreachableConnector;

#[async_trait::async_trait]
impl StoreConnector for UnreachableConnector {
    fn describe(&self) -> String {
        "http://unreachable:9200".to_string()
    }

    async fn connect(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        Err(StoreError::Transport("connection refused".to_string()))
    }
}
