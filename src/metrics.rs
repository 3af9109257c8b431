//! Prometheus metrics for the search engine.
//!
//! All metrics live in [`PROMETHEUS_REGISTRY`] under the `apod_search`
//! namespace and are exported by the `/metrics` endpoint.

use lazy_static::lazy_static;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Once;

const NAMESPACE: &str = "apod_search";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Search requests served
    ///
    /// Labels: endpoint, status
    pub static ref SEARCH_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("requests_total", "Total number of search requests")
            .namespace(NAMESPACE),
        &["endpoint", "status"]
    ).expect("Failed to create SEARCH_REQUESTS_TOTAL metric");

    /// Time spent answering a query, store round trip included
    ///
    /// Labels: endpoint
    pub static ref QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("query_duration_seconds", "Query duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["endpoint"]
    ).expect("Failed to create QUERY_DURATION_SECONDS metric");

    /// Documents written by the loader
    ///
    /// Labels: index
    pub static ref DOCUMENTS_INDEXED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("documents_indexed_total", "Total number of documents written to an index")
            .namespace(NAMESPACE),
        &["index"]
    ).expect("Failed to create DOCUMENTS_INDEXED_TOTAL metric");

    /// Connection attempts against the document store
    ///
    /// Labels: outcome (success, failure)
    pub static ref STORE_CONNECT_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("store_connect_attempts_total", "Document store connection attempts")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create STORE_CONNECT_ATTEMPTS_TOTAL metric");
}

static INIT: Once = Once::new();

/// Register all metrics with the global registry. Safe to call more than once.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = register_all();
    });
    result
}

fn register_all() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(SEARCH_REQUESTS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(QUERY_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(DOCUMENTS_INDEXED_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(STORE_CONNECT_ATTEMPTS_TOTAL.clone()))?;
    Ok(())
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
