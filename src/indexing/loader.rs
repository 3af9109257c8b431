//! Writes a document collection into a provisioned index

use crate::config::LoaderConfig;
use crate::embedding::Embedder;
use crate::indexing::{IndexSchema, LoadError, WriteMode};
use crate::metrics::DOCUMENTS_INDEXED_TOTAL;
use crate::models::ApodDocument;
use crate::store::{BulkItemFailure, DocumentStore};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const PROGRESS_LOG_INTERVAL: usize = 100;

/// Attempts per single-document write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Abort on the first failure
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl From<&LoaderConfig> for RetryPolicy {
    fn from(config: &LoaderConfig) -> Self {
        Self::new(
            config.write_max_attempts,
            Duration::from_millis(config.write_retry_delay_ms),
        )
    }
}

/// Result of a load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Documents submitted to the store
    pub count: usize,
    /// Per-item failures reported by a bulk write
    pub failures: Vec<BulkItemFailure>,
}

impl LoadSummary {
    pub fn written(&self) -> usize {
        self.count.saturating_sub(self.failures.len())
    }
}

/// Loads documents into one store.
///
/// Text indices get a single bulk request. Dense-vector indices embed each
/// document's explanation and write it on its own.
pub struct BulkLoader {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    processed: Arc<AtomicUsize>,
}

impl BulkLoader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
            processed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Documents handled so far, never decreasing
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Shared handle on the progress counter, for observers on other tasks
    pub fn progress(&self) -> Arc<AtomicUsize> {
        self.processed.clone()
    }

    pub async fn load(
        &self,
        index: &str,
        schema: &IndexSchema,
        documents: &[ApodDocument],
        embedder: Option<&dyn Embedder>,
    ) -> Result<LoadSummary, LoadError> {
        if documents.is_empty() {
            debug!(index = %index, "Nothing to load");
            return Ok(LoadSummary::default());
        }

        info!(
            index = %index,
            schema = %schema.kind(),
            documents = documents.len(),
            "Loading documents"
        );

        let summary = match schema.write_mode() {
            WriteMode::Bulk => self.load_bulk(index, documents).await?,
            WriteMode::PerDocument => {
                let embedder = embedder.ok_or_else(|| LoadError::MissingEmbedder {
                    index: index.to_string(),
                })?;
                self.load_embedded(index, documents, embedder).await?
            }
        };

        self.store
            .refresh(index)
            .await
            .map_err(|source| LoadError::Refresh {
                index: index.to_string(),
                source,
            })?;

        DOCUMENTS_INDEXED_TOTAL
            .with_label_values(&[index])
            .inc_by(summary.written() as f64);

        info!(
            index = %index,
            count = summary.count,
            failed = summary.failures.len(),
            "Load finished"
        );
        Ok(summary)
    }

    async fn load_bulk(
        &self,
        index: &str,
        documents: &[ApodDocument],
    ) -> Result<LoadSummary, LoadError> {
        // Vectors only belong in the dense-vector index
        let stripped: Vec<ApodDocument> = documents
            .iter()
            .cloned()
            .map(ApodDocument::without_embedding)
            .collect();

        let outcome = self
            .store
            .bulk_write(index, &stripped)
            .await
            .map_err(|source| LoadError::Bulk {
                index: index.to_string(),
                source,
            })?;
        self.processed
            .fetch_add(outcome.submitted, Ordering::Relaxed);

        if outcome.has_errors() {
            warn!(
                index = %index,
                failed = outcome.failures.len(),
                submitted = outcome.submitted,
                "Bulk write reported item failures"
            );
        }

        Ok(LoadSummary {
            count: outcome.submitted,
            failures: outcome.failures,
        })
    }

    async fn load_embedded(
        &self,
        index: &str,
        documents: &[ApodDocument],
        embedder: &dyn Embedder,
    ) -> Result<LoadSummary, LoadError> {
        for (position, document) in documents.iter().enumerate() {
            let vector = embedder
                .embed(&document.explanation)
                .await
                .map_err(|source| LoadError::Embedding {
                    written: position,
                    position,
                    source,
                })?;

            let document = document.clone().with_embedding(vector);
            self.write_with_retry(index, &document)
                .await
                .map_err(|source| LoadError::Write {
                    index: index.to_string(),
                    written: position,
                    position,
                    source,
                })?;

            let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
            if processed % PROGRESS_LOG_INTERVAL == 0 {
                info!(index = %index, processed, total = documents.len(), "Load progress");
            }
        }

        Ok(LoadSummary {
            count: documents.len(),
            failures: Vec::new(),
        })
    }

    async fn write_with_retry(
        &self,
        index: &str,
        document: &ApodDocument,
    ) -> Result<(), crate::store::StoreError> {
        let mut attempt = 1;
        loop {
            match self.store.write_one(index, document).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retry.max_attempts => {
                    warn!(
                        index = %index,
                        title = %document.title,
                        attempt,
                        error = %e,
                        "Document write failed, retrying"
                    );
                    attempt += 1;
                    sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
