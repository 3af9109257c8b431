//! Index schema definitions for the three retrieval strategies.

use crate::models::fields;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Smallest edge n-gram emitted per word
pub const EDGE_NGRAM_MIN: usize = 1;

/// Largest edge n-gram emitted per word
pub const EDGE_NGRAM_MAX: usize = 30;

/// Name of the custom analyzer registered for edge n-gram indices
pub const EDGE_NGRAM_ANALYZER: &str = "edge_ngram_analyzer";

/// Analyzer applied to query text on edge n-gram fields
pub const SEARCH_ANALYZER: &str = "standard";

/// Retrieval strategy tag, as named on the command line and in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Standard,
    EdgeNgram,
    DenseVector,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Standard => "standard",
            SchemaKind::EdgeNgram => "edge_ngram",
            SchemaKind::DenseVector => "dense_vector",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" => Ok(SchemaKind::Standard),
            "edge_ngram" | "ngram" => Ok(SchemaKind::EdgeNgram),
            "dense_vector" | "embedding" => Ok(SchemaKind::DenseVector),
            other => Err(format!(
                "unknown schema kind '{}', expected standard, edge_ngram or dense_vector",
                other
            )),
        }
    }
}

/// How the text fields of an index are analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analyzer {
    /// Word tokenizer plus lowercasing
    Standard,
    /// Per-word prefixes over letter and digit runs, lowercased
    EdgeNgram { min_gram: usize, max_gram: usize },
}

/// How documents reach an index of a given schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// One bulk request for the whole collection
    Bulk,
    /// Embed, then write one document at a time
    PerDocument,
}

/// Complete schema definition for one named index.
///
/// Exactly one schema is active per index; indices are independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexSchema {
    Standard,
    EdgeNgram { min_gram: usize, max_gram: usize },
    DenseVector { dims: usize },
}

impl IndexSchema {
    pub fn standard() -> Self {
        IndexSchema::Standard
    }

    pub fn edge_ngram() -> Self {
        IndexSchema::EdgeNgram {
            min_gram: EDGE_NGRAM_MIN,
            max_gram: EDGE_NGRAM_MAX,
        }
    }

    pub fn dense_vector(dims: usize) -> Self {
        IndexSchema::DenseVector { dims }
    }

    /// Build the schema for a kind; `dims` only matters for dense vectors.
    pub fn for_kind(kind: SchemaKind, dims: usize) -> Self {
        match kind {
            SchemaKind::Standard => Self::standard(),
            SchemaKind::EdgeNgram => Self::edge_ngram(),
            SchemaKind::DenseVector => Self::dense_vector(dims),
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            IndexSchema::Standard => SchemaKind::Standard,
            IndexSchema::EdgeNgram { .. } => SchemaKind::EdgeNgram,
            IndexSchema::DenseVector { .. } => SchemaKind::DenseVector,
        }
    }

    pub fn analyzer(&self) -> Analyzer {
        match self {
            IndexSchema::EdgeNgram { min_gram, max_gram } => Analyzer::EdgeNgram {
                min_gram: *min_gram,
                max_gram: *max_gram,
            },
            IndexSchema::Standard | IndexSchema::DenseVector { .. } => Analyzer::Standard,
        }
    }

    pub fn vector_dims(&self) -> Option<usize> {
        match self {
            IndexSchema::DenseVector { dims } => Some(*dims),
            _ => None,
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        match self {
            IndexSchema::DenseVector { .. } => WriteMode::PerDocument,
            _ => WriteMode::Bulk,
        }
    }

    /// Index creation body in Elasticsearch's settings/mappings format.
    pub fn to_elasticsearch_body(&self) -> Value {
        let text_field = match self.analyzer() {
            Analyzer::Standard => json!({ "type": "text" }),
            Analyzer::EdgeNgram { .. } => json!({
                "type": "text",
                "analyzer": EDGE_NGRAM_ANALYZER,
                "search_analyzer": SEARCH_ANALYZER,
            }),
        };

        let mut properties = serde_json::Map::new();
        properties.insert(fields::TITLE.to_string(), text_field.clone());
        properties.insert(fields::EXPLANATION.to_string(), text_field.clone());
        properties.insert(fields::AUTHOR.to_string(), text_field);
        properties.insert(fields::DATE.to_string(), json!({ "type": "date" }));
        properties.insert(fields::IMAGE_URL.to_string(), json!({ "type": "keyword" }));

        if let Some(dims) = self.vector_dims() {
            properties.insert(
                fields::EMBEDDING.to_string(),
                json!({
                    "type": "dense_vector",
                    "dims": dims,
                    "index": true,
                    "similarity": "cosine",
                }),
            );
        }

        let mut body = json!({ "mappings": { "properties": properties } });

        if let Analyzer::EdgeNgram { min_gram, max_gram } = self.analyzer() {
            body["settings"] = json!({
                "analysis": {
                    "tokenizer": {
                        "edge_ngram_tokenizer": {
                            "type": "edge_ngram",
                            "min_gram": min_gram,
                            "max_gram": max_gram,
                            "token_chars": ["letter", "digit"],
                        }
                    },
                    "analyzer": {
                        "edge_ngram_analyzer": {
                            "type": "custom",
                            "tokenizer": "edge_ngram_tokenizer",
                            "filter": ["lowercase"],
                        }
                    }
                }
            });
        }

        body
    }
}
