use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Connection retry policy
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Index names per retrieval strategy
    #[serde(default)]
    pub indices: IndicesConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Offline loader configuration
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/apod.toml".to_string());

        Self::builder(&config_path)
            // Override with environment variables (APOD__SECTION__KEY)
            .add_source(
                config::Environment::with_prefix("APOD")
                    .separator("__")
                    .try_parsing(true),
            )
            // Connection variables read by earlier deployments
            .set_override_option("store.url", std::env::var("ES_HOST").ok())?
            .set_override_option("store.username", std::env::var("ES_USERNAME").ok())?
            .set_override_option("store.password", std::env::var("ES_PASSWORD").ok())?
            .build()?
            .try_deserialize()
    }

    /// Embedded defaults plus the optional file at `config_path`
    fn builder(config_path: &str) -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Elasticsearch,
    Embedded,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type
    #[serde(default)]
    pub backend: StoreBackend,

    /// Elasticsearch base URL
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Root directory of the embedded store
    #[serde(default = "default_embedded_path")]
    pub embedded_path: PathBuf,

    /// Per-request timeout of the store client (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_store_url(),
            username: None,
            password: None,
            embedded_path: default_embedded_path(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// Keeps the password out of logs
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("embedded_path", &self.embedded_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connection attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts (seconds)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl ConnectionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicesConfig {
    #[serde(default = "default_standard_index")]
    pub standard: String,

    #[serde(default = "default_edge_ngram_index")]
    pub edge_ngram: String,

    #[serde(default = "default_dense_vector_index")]
    pub dense_vector: String,
}

impl IndicesConfig {
    /// Configured index name for a retrieval strategy
    pub fn for_kind(&self, kind: crate::indexing::SchemaKind) -> &str {
        use crate::indexing::SchemaKind;
        match kind {
            SchemaKind::Standard => &self.standard,
            SchemaKind::EdgeNgram => &self.edge_ngram,
            SchemaKind::DenseVector => &self.dense_vector,
        }
    }
}

impl Default for IndicesConfig {
    fn default() -> Self {
        Self {
            standard: default_standard_index(),
            edge_ngram: default_edge_ngram_index(),
            dense_vector: default_dense_vector_index(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// Deterministic feature hashing, no model required
    #[default]
    Hashing,
    /// HTTP embedding service
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Vector dimensionality
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Endpoint of the remote embedding service
    #[serde(default)]
    pub url: Option<String>,

    /// Remote call timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            dimension: default_embedding_dimension(),
            url: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Default corpus file
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Attempts per single-document write
    #[serde(default = "default_write_max_attempts")]
    pub write_max_attempts: u32,

    /// Delay between single-document write attempts (milliseconds)
    #[serde(default)]
    pub write_retry_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            write_max_attempts: default_write_max_attempts(),
            write_retry_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,

    /// Also write logs to this file, rotated daily
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Log files kept on disk, the current one included
    #[serde(default = "default_log_max_files")]
    pub log_max_files: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
            log_file: None,
            log_max_files: default_log_max_files(),
        }
    }
}

fn default_log_max_files() -> usize {
    4
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_store_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_embedded_path() -> PathBuf {
    PathBuf::from("./data/indices")
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    5
}

fn default_standard_index() -> String {
    "apod".to_string()
}

fn default_edge_ngram_index() -> String {
    "apod_ngram".to_string()
}

fn default_dense_vector_index() -> String {
    "apod_embedding".to_string()
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data/apod.json")
}

fn default_write_max_attempts() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
