pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::config::{Config, IndicesConfig};
use crate::connection::{ConnectionManager, ConnectionPolicy};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<ConnectionManager>,
    pub policy: ConnectionPolicy,
    pub indices: Arc<IndicesConfig>,
    pub embedder: Arc<dyn Embedder>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(connections: Arc<ConnectionManager>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            connections,
            policy: ConnectionPolicy::default(),
            indices: Arc::new(IndicesConfig::default()),
            embedder,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Apply policy, index names and timeout from configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.policy = ConnectionPolicy::from(&config.connection);
        self.indices = Arc::new(config.indices.clone());
        self.request_timeout = Duration::from_secs(config.server.request_timeout_secs);
        self
    }

    pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_indices(mut self, indices: IndicesConfig) -> Self {
        self.indices = Arc::new(indices);
        self
    }

    /// Store handle, connecting on first use
    pub async fn store(&self) -> Result<Arc<dyn DocumentStore>> {
        Ok(self.connections.connect(&self.policy).await?)
    }
}
