use crate::api::{handlers, AppState};
use axum::{routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Search
        .route("/api/v1/regular_search", get(handlers::regular_search))
        .route("/api/v1/prefix_search", get(handlers::prefix_search))
        .route("/api/v1/semantic_search", get(handlers::semantic_search))
        .route(
            "/api/v1/get_docs_per_year_count",
            get(handlers::docs_per_year_count),
        )
        // Add state
        .with_state(state)
        // Add middleware
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
