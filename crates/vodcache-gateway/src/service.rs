//! Core cache-or-fetch operations over the shared state
//!
//! Search and detail results go through the TTL store; images go through the
//! disk cache. Only successful upstream responses are written back, so a
//! failure is never cached as a negative result.

use crate::error::{GatewayError, Result};
use crate::types::{GatewayConfig, SearchResponse};
use chrono::{DateTime, Utc};
use image_disk_cache::{ImageCache, ImageCacheError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use ttl_store::TtlStore;
use vod_api::{ProviderClient, SiteRegistry};

pub const SEARCH_PARTITION: &str = "search";
pub const DETAIL_PARTITION: &str = "detail";

/// Everything a request handler needs, owned explicitly instead of living
/// in globals so tests can build isolated instances
pub struct ServerState {
    pub store: TtlStore<Value>,
    pub images: ImageCache,
    pub registry: SiteRegistry,
    pub provider: ProviderClient,
    pub config: GatewayConfig,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<ServerState>;

impl ServerState {
    pub fn new(
        store: TtlStore<Value>,
        images: ImageCache,
        registry: SiteRegistry,
        provider: ProviderClient,
        config: GatewayConfig,
    ) -> Self {
        Self {
            store,
            images,
            registry,
            provider,
            config,
            started_at: Utc::now(),
        }
    }

    /// Serve a search result from the TTL store, calling the upstream on a
    /// miss and caching the shaped response
    pub async fn search_or_fetch(&self, site_key: &str, keyword: &str) -> Result<Value> {
        let cache_key = format!("{}_{}", site_key, keyword);
        if let Some(cached) = self.cache_get(SEARCH_PARTITION, &cache_key).await {
            debug!(key = %cache_key, "Search cache hit");
            return Ok(cached);
        }

        let site = self
            .registry
            .get(site_key)
            .await
            .ok_or_else(|| GatewayError::SiteNotFound(site_key.to_string()))?;

        let items = self
            .provider
            .search(&site.api, keyword)
            .await
            .map_err(|e| GatewayError::SearchFailed(e.to_string()))?;

        let payload = serde_json::to_value(SearchResponse { list: items })
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        self.cache_set(
            SEARCH_PARTITION,
            &cache_key,
            payload.clone(),
            self.config.search_ttl_secs,
        )
        .await;
        Ok(payload)
    }

    /// Serve a detail record from the TTL store, calling the upstream on a
    /// miss. The first upstream list item is kept verbatim.
    pub async fn detail_or_fetch(&self, site_key: &str, id: &str) -> Result<Value> {
        let cache_key = format!("{}_{}", site_key, id);
        if let Some(cached) = self.cache_get(DETAIL_PARTITION, &cache_key).await {
            debug!(key = %cache_key, "Detail cache hit");
            return Ok(cached);
        }

        let site = self
            .registry
            .get(site_key)
            .await
            .ok_or_else(|| GatewayError::SiteNotFound(site_key.to_string()))?;

        let detail = self
            .provider
            .detail(&site.api, id)
            .await
            .map_err(|e| GatewayError::DetailFailed(e.to_string()))?
            .ok_or(GatewayError::NotFound)?;

        self.cache_set(
            DETAIL_PARTITION,
            &cache_key,
            detail.clone(),
            self.config.detail_ttl_secs,
        )
        .await;
        Ok(detail)
    }

    /// Serve an image through the disk cache, returning its bytes and
    /// whether it was already cached
    pub async fn image_or_fetch(
        &self,
        size_variant: &str,
        filename: &str,
    ) -> Result<(Vec<u8>, bool)> {
        // A trim pass may delete the file between the cache's hit check and
        // our read; one re-fetch treats that as an ordinary miss.
        for attempt in 0..2 {
            let fetched = self
                .images
                .fetch(size_variant, filename)
                .await
                .map_err(|e| match e {
                    ImageCacheError::InvalidParameter(msg) => GatewayError::InvalidParameter(msg),
                    ImageCacheError::FetchFailed(msg) => GatewayError::FetchFailed(msg),
                    ImageCacheError::Io(e) => GatewayError::FetchFailed(e.to_string()),
                })?;

            match tokio::fs::read(&fetched.path).await {
                Ok(bytes) => return Ok((bytes, fetched.from_cache)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && attempt == 0 => {
                    debug!(path = ?fetched.path, "Cached image vanished mid-read; re-fetching");
                }
                Err(e) => return Err(GatewayError::FetchFailed(e.to_string())),
            }
        }
        Err(GatewayError::NotFound)
    }

    async fn cache_get(&self, partition: &str, key: &str) -> Option<Value> {
        match self.store.get(partition, key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(partition, key, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Cache write failures are logged and swallowed; serving the fresh
    /// upstream result matters more than recording it
    async fn cache_set(&self, partition: &str, key: &str, value: Value, ttl_secs: u64) {
        if let Err(e) = self.store.set(partition, key, value, ttl_secs).await {
            warn!(partition, key, error = %e, "Cache write failed");
        }
    }
}
