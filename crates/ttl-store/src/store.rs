//! The partitioned TTL store

use crate::error::{Result, TtlStoreError};
use crate::types::{Persistence, StoredEntry};
use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

type Partition<V> = HashMap<String, StoredEntry<V>>;

/// Key/value store with per-entry TTL, split into named partitions.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug)]
pub struct TtlStore<V> {
    inner: Arc<Inner<V>>,
}

#[derive(Debug)]
struct Inner<V> {
    partitions: RwLock<HashMap<String, Partition<V>>>,
    persistence: Persistence,
}

impl<V> Clone for TtlStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> TtlStore<V> {
    /// Create a store with the given partition names, all starting empty
    pub fn new(partition_names: &[&str], persistence: Persistence) -> Self {
        let partitions = partition_names
            .iter()
            .map(|name| (name.to_string(), Partition::new()))
            .collect();

        Self {
            inner: Arc::new(Inner {
                partitions: RwLock::new(partitions),
                persistence,
            }),
        }
    }

    /// Number of entries held in a partition, expired ones included
    pub async fn len(&self, partition: &str) -> Result<usize> {
        let partitions = self.inner.partitions.read().await;
        let map = partitions
            .get(partition)
            .ok_or_else(|| TtlStoreError::UnknownPartition(partition.to_string()))?;
        Ok(map.len())
    }

    fn snapshot_path(dir: &PathBuf, partition: &str) -> PathBuf {
        dir.join(format!("{}.json", partition))
    }
}

impl<V: Clone> TtlStore<V> {
    /// Look up a live value.
    ///
    /// Absent keys and expired entries are both misses. Expired entries are
    /// not removed here; they stay until the next `set` overwrites them.
    pub async fn get(&self, partition: &str, key: &str) -> Result<Option<V>> {
        let now = Utc::now();
        let partitions = self.inner.partitions.read().await;
        let map = partitions
            .get(partition)
            .ok_or_else(|| TtlStoreError::UnknownPartition(partition.to_string()))?;

        Ok(map
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone()))
    }
}

impl<V: Serialize> TtlStore<V> {
    /// Store a value, replacing any existing entry for the key.
    ///
    /// When snapshot-backed, the whole partition file is rewritten before
    /// this returns. No batching; correctness over throughput.
    pub async fn set(&self, partition: &str, key: &str, value: V, ttl_secs: u64) -> Result<()> {
        let expires_at = Utc::now() + Duration::seconds(ttl_secs as i64);
        let serialized = {
            let mut partitions = self.inner.partitions.write().await;
            let map = partitions
                .get_mut(partition)
                .ok_or_else(|| TtlStoreError::UnknownPartition(partition.to_string()))?;
            map.insert(key.to_string(), StoredEntry { value, expires_at });

            match &self.inner.persistence {
                Persistence::None => None,
                Persistence::Snapshot(_) => Some(serde_json::to_vec(map)?),
            }
        };

        if let (Some(bytes), Persistence::Snapshot(dir)) = (serialized, &self.inner.persistence) {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(Self::snapshot_path(dir, partition), bytes).await?;
        }

        Ok(())
    }
}

impl<V: DeserializeOwned> TtlStore<V> {
    /// Reload each partition from its snapshot file.
    ///
    /// A missing or unreadable snapshot leaves that partition empty; startup
    /// never fails on corrupt cache state.
    pub async fn load(&self) {
        let dir = match &self.inner.persistence {
            Persistence::None => return,
            Persistence::Snapshot(dir) => dir.clone(),
        };

        let mut partitions = self.inner.partitions.write().await;
        for (name, map) in partitions.iter_mut() {
            let path = Self::snapshot_path(&dir, name);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(partition = %name, path = ?path, error = %e, "Failed to read snapshot; starting empty");
                    continue;
                }
            };

            match serde_json::from_slice::<Partition<V>>(&bytes) {
                Ok(loaded) => {
                    debug!(partition = %name, entries = loaded.len(), "Loaded snapshot");
                    *map = loaded;
                }
                Err(e) => {
                    warn!(partition = %name, path = ?path, error = %e, "Corrupt snapshot; starting empty");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn memory_store() -> TtlStore<Value> {
        TtlStore::new(&["search", "detail"], Persistence::None)
    }

    #[tokio::test]
    async fn test_set_then_get_before_expiry() {
        let store = memory_store();
        store
            .set("search", "site1_matrix", json!({ "list": [1] }), 60)
            .await
            .unwrap();

        let value = store.get("search", "site1_matrix").await.unwrap();
        assert_eq!(value, Some(json!({ "list": [1] })));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_but_still_counted() {
        let store = memory_store();
        store.set("search", "k", json!("v"), 0).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(store.get("search", "k").await.unwrap(), None);
        // lazy expiry: the entry still occupies a slot
        assert_eq!(store.len("search").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let store = memory_store();
        store.set("search", "k", json!("v"), 60).await.unwrap();

        for _ in 0..5 {
            assert_eq!(store.get("search", "k").await.unwrap(), Some(json!("v")));
        }
        assert_eq!(store.len("search").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_overwrites_value_and_expiry() {
        let store = memory_store();
        store.set("search", "k", json!("old"), 0).await.unwrap();
        store.set("search", "k", json!("new"), 60).await.unwrap();

        assert_eq!(store.get("search", "k").await.unwrap(), Some(json!("new")));
        assert_eq!(store.len("search").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let store = memory_store();
        store.set("search", "k", json!("s"), 60).await.unwrap();
        store.set("detail", "k", json!("d"), 60).await.unwrap();

        assert_eq!(store.get("search", "k").await.unwrap(), Some(json!("s")));
        assert_eq!(store.get("detail", "k").await.unwrap(), Some(json!("d")));
    }

    #[tokio::test]
    async fn test_unknown_partition_is_an_error() {
        let store = memory_store();
        let err = store.get("bogus", "k").await.unwrap_err();
        assert!(matches!(err, TtlStoreError::UnknownPartition(_)));

        let err = store.set("bogus", "k", json!("v"), 60).await.unwrap_err();
        assert!(matches!(err, TtlStoreError::UnknownPartition(_)));
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let dir = tempdir().unwrap();
        let persistence = Persistence::Snapshot(dir.path().to_path_buf());

        let store: TtlStore<Value> = TtlStore::new(&["search"], persistence.clone());
        store.set("search", "k", json!({ "a": 1 }), 3600).await.unwrap();

        let reopened: TtlStore<Value> = TtlStore::new(&["search"], persistence);
        reopened.load().await;
        assert_eq!(
            reopened.get("search", "k").await.unwrap(),
            Some(json!({ "a": 1 }))
        );
    }

    #[tokio::test]
    async fn test_expired_entries_reload_as_misses() {
        let dir = tempdir().unwrap();
        let persistence = Persistence::Snapshot(dir.path().to_path_buf());

        let store: TtlStore<Value> = TtlStore::new(&["search"], persistence.clone());
        store.set("search", "k", json!("v"), 0).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let reopened: TtlStore<Value> = TtlStore::new(&["search"], persistence);
        reopened.load().await;
        assert_eq!(reopened.get("search", "k").await.unwrap(), None);
        assert_eq!(reopened.len("search").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_degrades_to_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("search.json"), b"{ not json").unwrap();

        let store: TtlStore<Value> =
            TtlStore::new(&["search"], Persistence::Snapshot(dir.path().to_path_buf()));
        store.load().await;

        assert_eq!(store.len("search").await.unwrap(), 0);
        assert_eq!(store.get("search", "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_snapshot_starts_empty() {
        let dir = tempdir().unwrap();
        let store: TtlStore<Value> =
            TtlStore::new(&["search"], Persistence::Snapshot(dir.path().to_path_buf()));
        store.load().await;
        assert_eq!(store.len("search").await.unwrap(), 0);
    }
}
