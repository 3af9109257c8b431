//! Lazily established, cached connection to the document store.

use crate::config::ConnectionConfig;
use crate::metrics::STORE_CONNECT_ATTEMPTS_TOTAL;
use crate::store::{DocumentStore, StoreConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// The store stayed unreachable for every allowed attempt
#[derive(Debug, thiserror::Error)]
#[error("Could not connect to {target} after {attempts} attempt(s): {last_error}")]
pub struct ConnectionError {
    pub target: String,
    pub attempts: u32,
    pub last_error: String,
}

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl ConnectionPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self::from(&ConnectionConfig::default())
    }
}

impl From<&ConnectionConfig> for ConnectionPolicy {
    fn from(config: &ConnectionConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }
}

/// Owns the single store handle of the process.
///
/// The handle is created on the first successful [`get_connection`] call and
/// reused afterwards without re-validation. Concurrent first callers share
/// one initialisation. A failed initialisation leaves nothing cached, so the
/// next caller starts a fresh round of attempts.
///
/// [`get_connection`]: ConnectionManager::get_connection
pub struct ConnectionManager {
    connector: Arc<dyn StoreConnector>,
    handle: OnceCell<Arc<dyn DocumentStore>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            handle: OnceCell::new(),
        }
    }

    /// Return the cached handle, or connect with up to `max_retries` attempts
    /// spaced `retry_delay` apart.
    pub async fn get_connection(
        &self,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Arc<dyn DocumentStore>, ConnectionError> {
        self.handle
            .get_or_try_init(|| self.connect_with_retry(max_retries, retry_delay))
            .await
            .cloned()
    }

    /// [`get_connection`](Self::get_connection) with a policy value
    pub async fn connect(
        &self,
        policy: &ConnectionPolicy,
    ) -> Result<Arc<dyn DocumentStore>, ConnectionError> {
        self.get_connection(policy.max_retries, policy.retry_delay)
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }

    pub fn target(&self) -> String {
        self.connector.describe()
    }

    async fn connect_with_retry(
        &self,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Arc<dyn DocumentStore>, ConnectionError> {
        let target = self.connector.describe();
        let mut last_error = "no connection attempts allowed".to_string();

        for attempt in 1..=max_retries {
            match self.connector.connect().await {
                Ok(store) => {
                    STORE_CONNECT_ATTEMPTS_TOTAL
                        .with_label_values(&["success"])
                        .inc();
                    info!(
                        store = %target,
                        backend = store.backend_name(),
                        attempt,
                        "Connected to document store"
                    );
                    return Ok(store);
                }
                Err(e) => {
                    STORE_CONNECT_ATTEMPTS_TOTAL
                        .with_label_values(&["failure"])
                        .inc();
                    last_error = e.to_string();

                    if attempt < max_retries {
                        warn!(
                            store = %target,
                            attempt,
                            max_retries,
                            delay_ms = retry_delay.as_millis() as u64,
                            error = %e,
                            "Document store unavailable, retrying"
                        );
                        sleep(retry_delay).await;
                    }
                }
            }
        }

        error!(
            store = %target,
            attempts = max_retries,
            error = %last_error,
            "Giving up connecting to document store"
        );

        Err(ConnectionError {
            target,
            attempts: max_retries,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EmbeddedStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Fails a fixed number of times, then opens an embedded store
    struct FlakyConnector {
        failures: u32,
        attempts: AtomicU32,
        dir: TempDir,
    }

    impl FlakyConnector {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                attempts: AtomicU32::new(0),
                dir: TempDir::new().unwrap(),
            })
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoreConnector for FlakyConnector {
        fn describe(&self) -> String {
            "flaky test store".to_string()
        }

        async fn connect(&self) -> StoreResult<Arc<dyn DocumentStore>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                return Err(StoreError::Transport("connection refused".to_string()));
            }
            Ok(Arc::new(EmbeddedStore::open(self.dir.path())?))
        }
    }

    #[tokio::test]
    async fn test_connects_on_third_attempt_and_caches() {
        let connector = FlakyConnector::new(2);
        let manager = ConnectionManager::new(connector.clone());

        let first = manager
            .get_connection(5, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(connector.attempts(), 3);
        assert!(manager.is_connected());

        let second = manager
            .get_connection(5, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(connector.attempts(), 3);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let connector = FlakyConnector::new(u32::MAX);
        let manager = ConnectionManager::new(connector.clone());

        let err = manager
            .get_connection(3, Duration::from_millis(1))
            .await
            .err()
            .unwrap();

        assert_eq!(err.attempts, 3);
        assert!(err.last_error.contains("connection refused"));
        assert_eq!(connector.attempts(), 3);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_zero_retries_makes_no_attempt() {
        let connector = FlakyConnector::new(0);
        let manager = ConnectionManager::new(connector.clone());

        let result = manager.get_connection(0, Duration::ZERO).await;
        assert!(result.is_err());
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let connector = FlakyConnector::new(1);
        let manager = ConnectionManager::new(connector.clone());

        assert!(manager.get_connection(1, Duration::ZERO).await.is_err());
        assert!(manager.get_connection(1, Duration::ZERO).await.is_ok());
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_connection() {
        let connector = FlakyConnector::new(0);
        let manager = Arc::new(ConnectionManager::new(connector.clone()));

        let calls = (0..8).map(|_| {
            let manager = manager.clone();
            async move { manager.connect(&ConnectionPolicy::new(5, Duration::ZERO)).await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(connector.attempts(), 1);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = ConnectionPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.retry_delay, Duration::from_secs(5));
    }
}
