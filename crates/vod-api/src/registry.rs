//! Site registry: local site list with optional remote refresh

use crate::error::{Result, VodApiError};
use crate::types::Site;
use moka::future::Cache;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const REMOTE_CACHE_TTL_SECS: u64 = 300; // 5 minutes

/// Lookup table from site key to site descriptor.
///
/// Sites come from a local JSON file; when a remote list URL is configured
/// it takes precedence, fetched through a short-lived cache so the remote
/// source is consulted at most every five minutes.
#[derive(Debug)]
pub struct SiteRegistry {
    sites: Vec<Site>,
    remote_url: Option<String>,
    http: reqwest::Client,
    remote_cache: Cache<String, Arc<Vec<Site>>>,
}

impl SiteRegistry {
    /// Build a registry from an in-memory site list
    pub fn from_sites(sites: Vec<Site>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        let remote_cache = Cache::builder()
            .max_capacity(4)
            .time_to_live(Duration::from_secs(REMOTE_CACHE_TTL_SECS))
            .build();

        Self {
            sites,
            remote_url: None,
            http,
            remote_cache,
        }
    }

    /// Load the site list from a local JSON file (an array of sites)
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let sites: Vec<Site> = serde_json::from_slice(&bytes)?;
        debug!(path = ?path, count = sites.len(), "Loaded site list");
        Ok(Self::from_sites(sites))
    }

    /// Refresh the site list from a remote URL, cached for five minutes
    pub fn with_remote(mut self, url: String) -> Self {
        self.remote_url = Some(url);
        self
    }

    /// Look up a site by key. Remote list errors fall back to the local list
    /// rather than failing the request.
    pub async fn get(&self, key: &str) -> Option<Site> {
        if let Some(url) = &self.remote_url {
            match self.remote_sites(url).await {
                Ok(sites) => {
                    if let Some(site) = sites.iter().find(|s| s.key == key) {
                        return Some(site.clone());
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Remote site list unavailable; using local list");
                }
            }
        }

        self.sites.iter().find(|s| s.key == key).cloned()
    }

    async fn remote_sites(&self, url: &str) -> Result<Arc<Vec<Site>>> {
        if let Some(cached) = self.remote_cache.get(url).await {
            return Ok(cached);
        }

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(VodApiError::Status(response.status().as_u16()));
        }

        let sites: Arc<Vec<Site>> = Arc::new(response.json().await?);
        debug!(url = %url, count = sites.len(), "Fetched remote site list");
        self.remote_cache
            .insert(url.to_string(), Arc::clone(&sites))
            .await;
        Ok(sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_sites() -> Vec<Site> {
        vec![
            Site {
                key: "site1".to_string(),
                name: "Site One".to_string(),
                api: "https://one.example/api.php/provide/vod".to_string(),
            },
            Site {
                key: "site2".to_string(),
                name: "Site Two".to_string(),
                api: "https://two.example/api.php/provide/vod".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_lookup_by_key() {
        let registry = SiteRegistry::from_sites(sample_sites());
        let site = registry.get("site2").await.unwrap();
        assert_eq!(site.name, "Site Two");
        assert!(registry.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sites.json");
        std::fs::write(&path, serde_json::to_vec(&sample_sites()).unwrap()).unwrap();

        let registry = SiteRegistry::load(&path).await.unwrap();
        assert!(registry.get("site1").await.is_some());
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sites.json");
        std::fs::write(&path, b"[ oops").unwrap();

        let err = SiteRegistry::load(&path).await.unwrap_err();
        assert!(matches!(err, VodApiError::Json(_)));
    }

    #[tokio::test]
    async fn test_unreachable_remote_falls_back_to_local() {
        let registry = SiteRegistry::from_sites(sample_sites())
            .with_remote("http://127.0.0.1:9/sites.json".to_string());
        let site = registry.get("site1").await.unwrap();
        assert_eq!(site.name, "Site One");
    }
}
