//! Gateway error type and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

/// Request-path errors, each mapped to a client-facing status.
///
/// Persistence and eviction failures never appear here; they are logged by
/// the caches and the request continues against whatever state exists.
#[derive(Debug)]
pub enum GatewayError {
    /// Malformed size variant or filename, rejected before any I/O
    InvalidParameter(String),
    /// The site key is not in the registry
    SiteNotFound(String),
    /// Upstream answered but had no matching record
    NotFound,
    /// Upstream search call failed
    SearchFailed(String),
    /// Upstream detail call failed
    DetailFailed(String),
    /// Image could not be fetched from the CDN
    FetchFailed(String),
    /// Anything else; details are logged, not exposed
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Self::SiteNotFound(key) => write!(f, "Unknown site: {}", key),
            Self::NotFound => write!(f, "Not found"),
            Self::SearchFailed(msg) => write!(f, "Search failed: {}", msg),
            Self::DetailFailed(msg) => write!(f, "Detail failed: {}", msg),
            Self::FetchFailed(msg) => write!(f, "Image fetch failed: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidParameter(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::SiteNotFound(key) => (StatusCode::NOT_FOUND, format!("Unknown site: {}", key)),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            // A failed image fetch is indistinguishable from a missing image
            // to the client.
            Self::FetchFailed(msg) => {
                tracing::warn!(error = %msg, "Image fetch failed");
                (StatusCode::NOT_FOUND, "Image not found".to_string())
            }
            Self::SearchFailed(msg) => {
                tracing::warn!(error = %msg, "Upstream search failed");
                (StatusCode::BAD_GATEWAY, "Upstream search failed".to_string())
            }
            Self::DetailFailed(msg) => {
                tracing::warn!(error = %msg, "Upstream detail failed");
                (StatusCode::BAD_GATEWAY, "Upstream detail failed".to_string())
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<tracing_subscriber::filter::ParseError> for GatewayError {
    fn from(e: tracing_subscriber::filter::ParseError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
