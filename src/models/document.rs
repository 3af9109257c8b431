//! The APOD record as it is indexed and returned.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Field names shared by every index schema and both store backends.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const EXPLANATION: &str = "explanation";
    pub const DATE: &str = "date";
    pub const IMAGE_URL: &str = "image_url";
    pub const AUTHOR: &str = "author";
    pub const EMBEDDING: &str = "embedding";
}

/// A single Astronomy Picture of the Day record.
///
/// Records are immutable once indexed. Identity is assigned by the store and
/// is not part of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApodDocument {
    pub title: String,

    pub explanation: String,

    /// Publication date, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,

    /// Opaque image locator; never tokenized
    #[serde(alias = "url")]
    pub image_url: String,

    /// Credited author. Public-domain pictures carry none.
    #[serde(default, alias = "copyright", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Dense vector, only present in the vector-search schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ApodDocument {
    pub fn new(
        title: impl Into<String>,
        explanation: impl Into<String>,
        date: NaiveDate,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            explanation: explanation.into(),
            date,
            image_url: image_url.into(),
            author: None,
            embedding: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Copy of the document with the embedding dropped, as returned to callers.
    pub fn without_embedding(mut self) -> Self {
        self.embedding = None;
        self
    }
}

/// Errors raised while reading a corpus file
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Failed to read corpus file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse corpus file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON array of APOD records from disk.
pub fn load_documents(path: impl AsRef<Path>) -> Result<Vec<ApodDocument>, CorpusError> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: shown.clone(),
        source,
    })?;

    let documents: Vec<ApodDocument> =
        serde_json::from_str(&raw).map_err(|source| CorpusError::Parse {
            path: shown.clone(),
            source,
        })?;

    tracing::debug!(path = %shown, count = documents.len(), "Loaded corpus file");
    Ok(documents)
}
