//! Error types for the TTL store

use std::fmt;

/// Errors that can occur when reading or writing the store
#[derive(Debug)]
pub enum TtlStoreError {
    /// The named partition was not declared at construction
    UnknownPartition(String),
    /// Snapshot file could not be written
    Io(Box<std::io::Error>),
    /// Partition contents could not be serialized
    Serialize(serde_json::Error),
}

impl fmt::Display for TtlStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPartition(name) => write!(f, "Unknown partition: {}", name),
            Self::Io(e) => write!(f, "Snapshot IO error: {}", e),
            Self::Serialize(e) => write!(f, "Snapshot serialize error: {}", e),
        }
    }
}

impl std::error::Error for TtlStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e.as_ref()),
            Self::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TtlStoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Box::new(e))
    }
}

impl From<serde_json::Error> for TtlStoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e)
    }
}

/// Result type for TTL store operations
pub type Result<T> = std::result::Result<T, TtlStoreError>;
