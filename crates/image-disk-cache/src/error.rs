//! Error types for the image cache

use std::fmt;

/// Errors returned by [`crate::ImageCache::fetch`]
#[derive(Debug)]
pub enum ImageCacheError {
    /// Size variant or filename rejected before any I/O
    InvalidParameter(String),
    /// Upstream fetch failed (network, timeout, non-2xx, empty body)
    FetchFailed(String),
    /// Local filesystem error
    Io(Box<std::io::Error>),
}

impl fmt::Display for ImageCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Self::FetchFailed(msg) => write!(f, "Image fetch failed: {}", msg),
            Self::Io(e) => write!(f, "Image cache IO error: {}", e),
        }
    }
}

impl std::error::Error for ImageCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImageCacheError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Box::new(e))
    }
}

impl From<reqwest::Error> for ImageCacheError {
    fn from(e: reqwest::Error) -> Self {
        Self::FetchFailed(e.to_string())
    }
}

/// Result type for image cache operations
pub type Result<T> = std::result::Result<T, ImageCacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display() {
        let err = ImageCacheError::InvalidParameter("bad size variant".to_string());
        assert_eq!(format!("{}", err), "Invalid parameter: bad size variant");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ImageCacheError = io.into();
        assert!(matches!(err, ImageCacheError::Io(_)));
        assert!(format!("{}", err).contains("gone"));
    }
}
