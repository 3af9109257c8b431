use apod_search::{
    api::{build_router, AppState},
    config::Config,
    connection::ConnectionManager,
    embedding::create_embedder,
    store::create_connector,
    telemetry::init_tracing,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize tracing
    let _log_guard = init_tracing(&config.observability)?;
    if let Some(e) = config_error {
        tracing::warn!("Failed to load configuration: {}", e);
        tracing::warn!("Using default configuration");
    }

    tracing::info!("Starting APOD search v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Store backend: {:?}", config.store.backend);

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = apod_search::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Store connection, established lazily and shared by all requests
    let connector = create_connector(&config.store)?;
    let connections = Arc::new(ConnectionManager::new(connector));

    let embedder = create_embedder(&config.embedding)?;
    tracing::info!("✅ Embedder initialized ({} dimensions)", embedder.dimension());

    let app_state = AppState::new(connections.clone(), embedder).with_config(&config);

    // Warm the connection; requests retry on their own if this fails
    match connections.connect(&app_state.policy).await {
        Ok(store) => tracing::info!("✅ Document store ready ({})", store.backend_name()),
        Err(e) => {
            tracing::warn!("⚠️  Document store not reachable at startup: {}", e);
            tracing::warn!("   Requests will retry the connection");
        }
    }

    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Search API: http://{}/api/v1/regular_search", http_addr);
    tracing::info!("   Metrics: http://{}/metrics", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
