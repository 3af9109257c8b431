//! Paged search over one index

use crate::embedding::Embedder;
use crate::search::{QueryError, QueryRequest};
use crate::store::{DocumentStore, StoreHit, StoreQuery, StoreRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum candidate pool per shard for nearest-neighbour queries
const MIN_NUM_CANDIDATES: usize = 100;

/// A page of hits plus the page count for the whole result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub hits: Vec<StoreHit>,
    pub max_pages: u64,
}

/// Number of `limit`-sized pages needed for `total` hits
pub fn max_pages(total: u64, limit: usize) -> u64 {
    if total == 0 || limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64)
}

/// Full-text search: title-weighted multi match, optional year filter.
///
/// Hits come back in the store's relevance order.
pub async fn search(
    store: &dyn DocumentStore,
    index: &str,
    request: &QueryRequest,
) -> Result<QueryResult, QueryError> {
    request.validate()?;

    let store_request = StoreRequest::new(StoreQuery::Bool {
        must: vec![request.match_clause()],
        filter: request.year_range()?.into_iter().collect(),
    })
    .with_page(request.skip, request.limit);

    let response = store.search(index, &store_request).await?;
    debug!(
        index = %index,
        total = response.total,
        returned = response.hits.len(),
        "Search answered"
    );

    Ok(QueryResult {
        max_pages: max_pages(response.total, request.limit),
        hits: response.hits,
    })
}

/// Nearest-neighbour search on the embedded query text
pub async fn semantic_search(
    store: &dyn DocumentStore,
    index: &str,
    embedder: &dyn Embedder,
    request: &QueryRequest,
) -> Result<QueryResult, QueryError> {
    request.validate()?;
    let k = request.window_end()?;

    let vector = embedder.embed(&request.text).await?;

    let store_request = StoreRequest::new(StoreQuery::Knn {
        vector,
        k,
        num_candidates: k.max(MIN_NUM_CANDIDATES),
        filter: request.year_range()?.into_iter().collect(),
    })
    .with_page(request.skip, request.limit);

    let response = store.search(index, &store_request).await?;
    debug!(index = %index, total = response.total, "Semantic search answered");

    Ok(QueryResult {
        max_pages: max_pages(response.total, request.limit),
        hits: response.hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_pages() {
        assert_eq!(max_pages(25, 10), 3);
        assert_eq!(max_pages(0, 10), 0);
        assert_eq!(max_pages(10, 10), 1);
        assert_eq!(max_pages(11, 10), 2);
        assert_eq!(max_pages(1, 50), 1);
    }
}
