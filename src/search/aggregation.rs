//! Yearly document counts for a search text

use crate::search::query::match_clause;
use crate::search::AggregationError;
use crate::store::{DocumentStore, StoreQuery, StoreRequest};
use std::collections::BTreeMap;

/// Name of the histogram inside the store request
pub const DOCS_PER_YEAR: &str = "docs_per_year";

/// Year (`yyyy`) to matching document count, oldest year first
pub type DocsPerYear = BTreeMap<String, u64>;

/// Count documents matching `text` per calendar year.
///
/// Years without matches are absent. Every failure, including an unknown
/// index, is reported as an [`AggregationError`].
pub async fn year_histogram(
    store: &dyn DocumentStore,
    index: &str,
    text: &str,
) -> Result<DocsPerYear, AggregationError> {
    if text.trim().is_empty() {
        return Err(AggregationError::new("Search text must not be empty"));
    }

    let request = StoreRequest::new(StoreQuery::Bool {
        must: vec![match_clause(text)],
        filter: Vec::new(),
    })
    .with_page(0, 0)
    .with_year_histogram(DOCS_PER_YEAR);

    let response = store
        .search(index, &request)
        .await
        .map_err(|e| AggregationError::from_failure(index, &e))?;

    Ok(response
        .buckets
        .into_iter()
        .filter(|bucket| bucket.doc_count > 0)
        .map(|bucket| (bucket.key_as_string, bucket.doc_count))
        .collect())
}
