//! Vodcache Gateway - caching layer for VOD provider APIs
//!
//! Sits between clients and two slow, rate-limited upstreams: the provider
//! search/detail APIs and the poster image CDN. Search and detail results
//! are cached with TTLs; images are cached on disk under a capacity cap.

mod error;
mod server;
mod service;
mod types;

use crate::error::{GatewayError, Result};
use crate::server::start_server;
use crate::service::{ServerState, SharedState, DETAIL_PARTITION, SEARCH_PARTITION};
use crate::types::GatewayConfig;
use image_disk_cache::{ImageCache, ImageCacheConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};
use ttl_store::{Persistence, TtlStore};
use vod_api::{ProviderClient, SiteRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("vodcache_gateway=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Vodcache Gateway...");

    let config = load_config();
    info!("Port: {}", config.port);
    info!("Image cache root: {:?}", config.image_root);
    info!(
        "Image cache capacity: {} MB",
        config.capacity_bytes / (1024 * 1024)
    );
    info!("Search TTL: {}s, detail TTL: {}s", config.search_ttl_secs, config.detail_ttl_secs);

    // Result cache, reloaded from snapshots when disk-backed
    let persistence = match &config.snapshot_dir {
        Some(dir) => Persistence::Snapshot(dir.clone()),
        None => Persistence::None,
    };
    let store = TtlStore::new(&[SEARCH_PARTITION, DETAIL_PARTITION], persistence);
    store.load().await;

    // Image cache
    let images = ImageCache::new(ImageCacheConfig {
        root: config.image_root.clone(),
        cdn_base_url: config.cdn_base_url.clone(),
        capacity_bytes: config.capacity_bytes,
        trigger_count: config.trigger_count,
        fetch_timeout: Duration::from_secs(config.upstream_timeout_secs),
        ..ImageCacheConfig::default()
    });
    images.init().await.map_err(|e| {
        GatewayError::Internal(format!("Failed to create image cache root: {}", e))
    })?;

    // Site registry; a missing or unreadable site list degrades to empty
    let registry = match SiteRegistry::load(&config.sites_file).await {
        Ok(registry) => registry,
        Err(e) => {
            warn!(path = ?config.sites_file, error = %e, "Failed to load site list; starting empty");
            SiteRegistry::from_sites(Vec::new())
        }
    };
    let registry = match &config.remote_sites_url {
        Some(url) => registry.with_remote(url.clone()),
        None => registry,
    };

    let provider = ProviderClient::with_timeout(Duration::from_secs(config.upstream_timeout_secs));

    let port = config.port;
    let state: SharedState = Arc::new(ServerState::new(store, images, registry, provider, config));

    // Start HTTP server (blocking)
    start_server(state, port)
        .await
        .map_err(|e| GatewayError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

fn load_config() -> GatewayConfig {
    let defaults = GatewayConfig::default();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(defaults.port);

    let snapshot_dir = match std::env::var("SNAPSHOT_DIR") {
        Ok(s) if s.is_empty() || s == "none" => None,
        Ok(s) => Some(PathBuf::from(s)),
        Err(_) => defaults.snapshot_dir,
    };

    let image_root = std::env::var("IMAGE_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.image_root);

    let cdn_base_url = std::env::var("CDN_BASE_URL").unwrap_or(defaults.cdn_base_url);

    let capacity_bytes = std::env::var("IMAGE_CACHE_CAPACITY")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.capacity_bytes);

    let trigger_count = std::env::var("EVICTION_TRIGGER_COUNT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.trigger_count);

    let search_ttl_secs = std::env::var("SEARCH_TTL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.search_ttl_secs);

    let detail_ttl_secs = std::env::var("DETAIL_TTL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.detail_ttl_secs);

    let upstream_timeout_secs = std::env::var("UPSTREAM_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.upstream_timeout_secs);

    let sites_file = std::env::var("SITES_FILE")
        .map(PathBuf::from)
        .unwrap_or(defaults.sites_file);

    let remote_sites_url = std::env::var("REMOTE_SITES_URL").ok();

    GatewayConfig {
        port,
        snapshot_dir,
        image_root,
        cdn_base_url,
        capacity_bytes,
        trigger_count,
        search_ttl_secs,
        detail_ttl_secs,
        upstream_timeout_secs,
        sites_file,
        remote_sites_url,
    }
}
