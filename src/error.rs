use crate::connection::ConnectionError;
use crate::indexing::{IndexProvisioningError, LoadError};
use crate::search::{AggregationError, QueryError};
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Document store unreachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Search failed in the store
    #[error("Query error: {0}")]
    Query(String),

    /// Histogram could not be computed
    #[error("{0}")]
    Aggregation(String),

    /// Index could not be recreated
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    /// Documents could not be written
    #[error("Load error: {0}")]
    Load(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Query(_) => StatusCode::BAD_GATEWAY,
            AppError::Aggregation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Provisioning(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Load(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Query(_) => "QUERY_ERROR",
            AppError::Aggregation(_) => "AGGREGATION_ERROR",
            AppError::Provisioning(_) => "PROVISIONING_ERROR",
            AppError::Load(_) => "LOAD_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        tracing::error!(
            error_code = error_code,
            status_code = status.as_u16(),
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<ConnectionError> for AppError {
    fn from(err: ConnectionError) -> Self {
        AppError::ServiceUnavailable(err.to_string())
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidRequest(msg) => AppError::Validation(msg),
            QueryError::Store(StoreError::IndexNotFound(index)) => {
                AppError::NotFound(format!("index '{}'", index))
            }
            other => {
                tracing::error!(error = %other, "Search failed in the document store");
                AppError::Query("The search could not be completed".to_string())
            }
        }
    }
}

impl From<AggregationError> for AppError {
    fn from(err: AggregationError) -> Self {
        AppError::Aggregation(err.to_string())
    }
}

impl From<IndexProvisioningError> for AppError {
    fn from(err: IndexProvisioningError) -> Self {
        AppError::Provisioning(err.to_string())
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::Load(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::IndexNotFound(index) => AppError::NotFound(format!("index '{}'", index)),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
