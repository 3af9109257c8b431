use crate::config::{StoreBackend, StoreConfig};
use crate::error::{AppError, Result};
use crate::store::{ElasticsearchConnector, EmbeddedConnector, StoreConnector};
use std::sync::Arc;
use std::time::Duration;

/// Create a store connector based on configuration
pub fn create_connector(config: &StoreConfig) -> Result<Arc<dyn StoreConnector>> {
    match config.backend {
        StoreBackend::Elasticsearch => {
            if config.url.trim().is_empty() {
                return Err(AppError::Configuration(
                    "Elasticsearch backend requires 'store.url' (or ES_HOST)".to_string(),
                ));
            }

            let connector = ElasticsearchConnector::new(
                config.url.clone(),
                config.username.clone(),
                config.password.clone(),
                Duration::from_secs(config.request_timeout_secs),
            );
            tracing::info!(store = %connector.describe(), "Using Elasticsearch store backend");
            Ok(Arc::new(connector))
        }

        StoreBackend::Embedded => {
            tracing::info!(path = ?config.embedded_path, "Using embedded store backend");
            Ok(Arc::new(EmbeddedConnector::new(&config.embedded_path)))
        }
    }
}
