//! HTTP API exercised in-process

mod common;

use apod_search::api::{build_router, AppState};
use apod_search::connection::{ConnectionManager, ConnectionPolicy};
use apod_search::embedding::{Embedder, HashingEmbedder};
use apod_search::indexing::{index_corpus, IndexSchema, RetryPolicy};
use apod_search::store::{DocumentStore, StoreConnector};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{doc, embedded_store, StaticConnector, UnreachableConnector};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const DIMS: usize = 32;

async fn app() -> (TempDir, Router) {
    let (dir, store) = embedded_store();
    let store: Arc<dyn DocumentStore> = store;
    let embedder = Arc::new(HashingEmbedder::new(DIMS));

    let docs = vec![
        doc("Apollo Landing", "The lunar module on the Moon.", "2019-07-20"),
        doc("Orion Nebula", "Young stars in a stellar nursery.", "2019-12-02"),
        doc("Crab Nebula", "A supernova remnant with a pulsar.", "2020-03-14"),
    ];
    for (index, schema) in [
        ("apod", IndexSchema::standard()),
        ("apod_ngram", IndexSchema::edge_ngram()),
        ("apod_embedding", IndexSchema::dense_vector(DIMS)),
    ] {
        let embedder: Option<&dyn Embedder> =
            schema.vector_dims().map(|_| embedder.as_ref() as &dyn Embedder);
        index_corpus(
            store.clone(),
            index,
            &schema,
            &docs,
            embedder,
            RetryPolicy::no_retry(),
        )
        .await
        .unwrap();
    }

    let connections = Arc::new(ConnectionManager::new(Arc::new(StaticConnector(store))));
    let state = AppState::new(connections, embedder);
    (dir, build_router(state))
}

fn unreachable_app() -> Router {
    let connector: Arc<dyn StoreConnector> = Arc::new(UnreachableConnector);
    let state = AppState::new(
        Arc::new(ConnectionManager::new(connector)),
        Arc::new(HashingEmbedder::new(DIMS)),
    )
    .with_policy(ConnectionPolicy::new(2, Duration::ZERO));
    build_router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (_dir, app) = app().await;
    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_regular_search_response_shape() {
    let (_dir, app) = app().await;
    let (status, body) = get(app, "/api/v1/regular_search?search_query=nebula").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["max_pages"], 1);

    let hits = body["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0]["_score"].as_f64().unwrap() > 0.0);
    assert!(hits[0]["_source"]["title"]
        .as_str()
        .unwrap()
        .ends_with("Nebula"));
    assert!(hits[0]["_source"].get("embedding").is_none());
}

#[tokio::test]
async fn test_regular_search_with_year_and_paging() {
    let (_dir, app) = app().await;
    let (status, body) = get(
        app,
        "/api/v1/regular_search?search_query=nebula&year=2020&skip=0&limit=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"][0]["_source"]["title"], "Crab Nebula");
    assert_eq!(body["max_pages"], 1);
}

#[tokio::test]
async fn test_prefix_search_matches_partial_word() {
    let (_dir, app) = app().await;
    let (status, body) = get(app, "/api/v1/prefix_search?search_query=apol").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"][0]["_source"]["title"], "Apollo Landing");
}

#[tokio::test]
async fn test_semantic_search() {
    let (_dir, app) = app().await;
    let (status, body) = get(
        app,
        "/api/v1/semantic_search?search_query=supernova%20remnant%20pulsar&limit=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"][0]["_source"]["title"], "Crab Nebula");
    assert!(body["hits"][0]["_source"].get("embedding").is_none());
}

#[tokio::test]
async fn test_docs_per_year_count() {
    let (_dir, app) = app().await;
    let (status, body) = get(app, "/api/v1/get_docs_per_year_count?search_query=nebula").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["docs_per_year"]["2019"], 1);
    assert_eq!(body["docs_per_year"]["2020"], 1);
    assert!(body["docs_per_year"].get("2021").is_none());
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() {
    let (_dir, app) = app().await;

    let (status, body) = get(
        app.clone(),
        "/api/v1/regular_search?search_query=nebula&year=20",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = get(
        app.clone(),
        "/api/v1/regular_search?search_query=nebula&limit=0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app, "/api/v1/regular_search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pages_past_result_window_are_rejected() {
    let (_dir, app) = app().await;

    for uri in [
        "/api/v1/regular_search?search_query=nebula&limit=1099511627776",
        "/api/v1/prefix_search?search_query=neb&skip=9995&limit=10",
        "/api/v1/semantic_search?search_query=nebula&skip=18446744073709551615",
    ] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_blank_search_text_is_rejected_everywhere() {
    let (_dir, app) = app().await;

    for endpoint in [
        "regular_search",
        "prefix_search",
        "semantic_search",
        "get_docs_per_year_count",
    ] {
        let uri = format!("/api/v1/{}?search_query=%20%20%20", endpoint);
        let (status, body) = get(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", endpoint);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_unreachable_store_is_service_unavailable() {
    let (status, body) = get(
        unreachable_app(),
        "/api/v1/regular_search?search_query=nebula",
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_histogram_failure_returns_generic_message() {
    let (_dir, store) = embedded_store();
    let connections = Arc::new(ConnectionManager::new(Arc::new(StaticConnector(store))));
    let app = build_router(AppState::new(connections, Arc::new(HashingEmbedder::new(DIMS))));

    let (status, body) = get(app, "/api/v1/get_docs_per_year_count?search_query=nebula").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "AGGREGATION_ERROR");
    assert!(!body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Index not found"));
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_request_counter() {
    apod_search::metrics::init_metrics().unwrap();
    let (_dir, app) = app().await;

    let (status, _) = get(app.clone(), "/api/v1/regular_search?search_query=moon").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let metrics = common::parse_prometheus_output(&text);

    let requests = metrics.get("apod_search_requests_total").unwrap();
    assert!(requests
        .iter()
        .any(|line| line.contains(r#"endpoint="regular_search""#)));
}
