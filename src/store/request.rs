//! Backend-neutral request and response model for the document store.

use crate::models::{fields, ApodDocument};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Field with a relevance boost, rendered `field^boost`
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedField {
    pub field: &'static str,
    pub boost: f32,
}

impl BoostedField {
    pub fn new(field: &'static str, boost: f32) -> Self {
        Self { field, boost }
    }

    pub fn render(&self) -> String {
        if (self.boost - 1.0).abs() < f32::EPSILON {
            self.field.to_string()
        } else {
            format!("{}^{}", self.field, self.boost)
        }
    }
}

/// Match of raw text against several fields, best field wins
#[derive(Debug, Clone, PartialEq)]
pub struct MultiMatch {
    pub query: String,
    pub fields: Vec<BoostedField>,
}

/// Inclusive calendar-date range on the `date` field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub gte: NaiveDate,
    pub lte: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.gte <= date && date <= self.lte
    }
}

/// Query part of a store request
#[derive(Debug, Clone, PartialEq)]
pub enum StoreQuery {
    /// Scoring `must` clauses plus non-scoring `filter` clauses
    Bool {
        must: Vec<MultiMatch>,
        filter: Vec<DateRange>,
    },
    /// Nearest neighbours on the dense vector field
    Knn {
        vector: Vec<f32>,
        k: usize,
        num_candidates: usize,
        filter: Vec<DateRange>,
    },
}

/// Calendar-year histogram over the `date` field
#[derive(Debug, Clone, PartialEq)]
pub struct YearHistogramAgg {
    /// Name the aggregation is reported under
    pub name: String,
}

/// Deepest `from + size` a store will page to, as Elasticsearch's `index.max_result_window`
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// A search request: query, pagination and optional aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRequest {
    pub query: StoreQuery,
    pub from: usize,
    pub size: usize,
    pub aggregation: Option<YearHistogramAgg>,
}

impl StoreRequest {
    pub fn new(query: StoreQuery) -> Self {
        Self {
            query,
            from: 0,
            size: 10,
            aggregation: None,
        }
    }

    pub fn with_page(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// End of the requested page, or `None` past the result window
    pub fn window_end(&self) -> Option<usize> {
        self.from
            .checked_add(self.size)
            .filter(|end| *end <= MAX_RESULT_WINDOW)
    }

    pub fn with_year_histogram(mut self, name: impl Into<String>) -> Self {
        self.aggregation = Some(YearHistogramAgg { name: name.into() });
        self
    }
}

/// One matching document with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreHit {
    #[serde(rename = "_source")]
    pub document: ApodDocument,

    #[serde(rename = "_score")]
    pub score: f32,
}

/// Year bucket as reported by the store, in chronological order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBucket {
    pub key_as_string: String,
    pub doc_count: u64,
}

/// Search response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreResponse {
    pub hits: Vec<StoreHit>,
    pub total: u64,
    pub buckets: Vec<YearBucket>,
}

/// Outcome of a single item inside a bulk request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemFailure {
    /// Position of the document in the submitted collection
    pub position: usize,
    pub status: u16,
    pub reason: String,
}

/// Bulk write result, passed through as the store reported it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub submitted: usize,
    pub failures: Vec<BulkItemFailure>,
}

impl BulkOutcome {
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn written(&self) -> usize {
        self.submitted.saturating_sub(self.failures.len())
    }
}

/// Fields searched by the text query engines, title weighted double
pub fn default_match_fields() -> Vec<BoostedField> {
    vec![
        BoostedField::new(fields::TITLE, 2.0),
        BoostedField::new(fields::EXPLANATION, 1.0),
    ]
}
