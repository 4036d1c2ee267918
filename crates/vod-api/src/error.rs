//! Error types for the provider API client and site registry

use std::fmt;

/// Errors that can occur when talking to a provider or loading sites
#[derive(Debug)]
pub enum VodApiError {
    /// HTTP request failed
    Http(reqwest::Error),
    /// Failed to parse a JSON payload
    Json(serde_json::Error),
    /// Provider answered with a non-success status
    Status(u16),
    /// Local site list could not be read
    Io(Box<std::io::Error>),
}

impl fmt::Display for VodApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Provider HTTP error: {}", e),
            Self::Json(e) => write!(f, "Provider JSON parse error: {}", e),
            Self::Status(code) => write!(f, "Provider returned status {}", code),
            Self::Io(e) => write!(f, "Site list IO error: {}", e),
        }
    }
}

impl std::error::Error for VodApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for VodApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

impl From<serde_json::Error> for VodApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<std::io::Error> for VodApiError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Box::new(e))
    }
}

/// Result type for provider API operations
pub type Result<T> = std::result::Result<T, VodApiError>;
