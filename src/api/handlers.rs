use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::indexing::SchemaKind;
use crate::metrics::{gather_metrics, QUERY_DURATION_SECONDS, SEARCH_REQUESTS_TOTAL};
use crate::search::{self, DocsPerYear, QueryRequest, QueryResult};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use validator::Validate;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_connected: state.connections.is_connected(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store_connected: bool,
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

/// Query parameters shared by the search endpoints
#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 1000))]
    pub search_query: String,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 10000))]
    pub limit: usize,
    #[validate(length(equal = 4))]
    pub year: Option<String>,
}

fn default_limit() -> usize {
    search::DEFAULT_LIMIT
}

impl From<SearchParams> for QueryRequest {
    fn from(params: SearchParams) -> Self {
        QueryRequest {
            text: params.search_query,
            skip: params.skip,
            limit: params.limit,
            year: params.year,
        }
    }
}

/// Whitespace passes the length check, so blank text is rejected here
fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "search_query must not be blank".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct HistogramParams {
    #[validate(length(min = 1, max = 1000))]
    pub search_query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocsPerYearResponse {
    pub docs_per_year: DocsPerYear,
}

/// Full-text search on the standard index
pub async fn regular_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<QueryResult>> {
    text_search(state, params, SchemaKind::Standard, "regular_search").await
}

/// Search-as-you-type on the edge n-gram index
pub async fn prefix_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<QueryResult>> {
    text_search(state, params, SchemaKind::EdgeNgram, "prefix_search").await
}

async fn text_search(
    state: AppState,
    params: SearchParams,
    kind: SchemaKind,
    endpoint: &'static str,
) -> Result<Json<QueryResult>> {
    observe(endpoint, async {
        params.validate()?;
        require_text(&params.search_query)?;
        let request = QueryRequest::from(params);
        let store = state.store().await?;

        let result = search::search(store.as_ref(), state.indices.for_kind(kind), &request).await?;
        Ok::<_, AppError>(Json(result))
    })
    .await
}

/// Nearest-neighbour search on the dense-vector index
pub async fn semantic_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<QueryResult>> {
    observe("semantic_search", async {
        params.validate()?;
        require_text(&params.search_query)?;
        let request = QueryRequest::from(params);
        let store = state.store().await?;

        let result = search::semantic_search(
            store.as_ref(),
            state.indices.for_kind(SchemaKind::DenseVector),
            state.embedder.as_ref(),
            &request,
        )
        .await?;
        Ok::<_, AppError>(Json(result))
    })
    .await
}

/// Matching documents per year on the standard index
pub async fn docs_per_year_count(
    State(state): State<AppState>,
    Query(params): Query<HistogramParams>,
) -> Result<Json<DocsPerYearResponse>> {
    observe("get_docs_per_year_count", async {
        params.validate()?;
        require_text(&params.search_query)?;
        let store = state.store().await?;

        let docs_per_year = search::year_histogram(
            store.as_ref(),
            state.indices.for_kind(SchemaKind::Standard),
            &params.search_query,
        )
        .await?;
        Ok::<_, AppError>(Json(DocsPerYearResponse { docs_per_year }))
    })
    .await
}

/// Time a handler body and count it by outcome
async fn observe<T, F>(endpoint: &'static str, body: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let timer = QUERY_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .start_timer();
    let result = body.await;
    timer.observe_duration();

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status_code(),
    };
    SEARCH_REQUESTS_TOTAL
        .with_label_values(&[endpoint, status.as_str()])
        .inc();
    result
}
