//! Store types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A cached value together with its absolute expiry instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry<V> {
    pub value: V,
    pub expires_at: DateTime<Utc>,
}

impl<V> StoredEntry<V> {
    /// An entry is expired once its expiry instant has been reached
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Durability configuration for the store
#[derive(Debug, Clone)]
pub enum Persistence {
    /// Keep everything in process memory only
    None,
    /// Rewrite `<dir>/<partition>.json` after every mutation
    Snapshot(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_entry_not_expired_before_deadline() {
        let now = Utc::now();
        let entry = StoredEntry {
            value: "v".to_string(),
            expires_at: now + Duration::seconds(60),
        };
        assert!(!entry.is_expired_at(now));
    }

    #[test]
    fn test_entry_expired_at_and_after_deadline() {
        let now = Utc::now();
        let entry = StoredEntry {
            value: "v".to_string(),
            expires_at: now,
        };
        assert!(entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_entry_serialization_round_trip() {
        let entry = StoredEntry {
            value: serde_json::json!({ "list": [1, 2, 3] }),
            expires_at: Utc::now(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        let back: StoredEntry<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, entry.value);
        assert_eq!(back.expires_at, entry.expires_at);
    }
}
