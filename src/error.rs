//! Error types for the cache proxy
//!
//! Provides unified error handling using thiserror. The cache itself never
//! fails; errors come from configuration, the backing store and the wire.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Proxy Error Enum ==
/// Unified error type for the cache proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Invalid or unparseable configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Backing store unreachable or returned an error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Malformed client request on the wire
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Socket or listener failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redis::RedisError> for ProxyError {
    fn from(err: redis::RedisError) -> Self {
        ProxyError::Backend(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::Protocol(_) => StatusCode::BAD_REQUEST,
            ProxyError::Config(_) | ProxyError::Backend(_) | ProxyError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
