//! Configuration and response types for the gateway

use serde::Serialize;
use std::path::PathBuf;
use vod_api::SearchItem;

/// Configuration for the gateway, loaded from environment variables
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    /// Directory for TTL store snapshots; `None` keeps results in memory only
    pub snapshot_dir: Option<PathBuf>,
    pub image_root: PathBuf,
    pub cdn_base_url: String,
    pub capacity_bytes: u64,
    pub trigger_count: u64,
    pub search_ttl_secs: u64,
    pub detail_ttl_secs: u64,
    pub upstream_timeout_secs: u64,
    pub sites_file: PathBuf,
    pub remote_sites_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3100,
            snapshot_dir: Some(PathBuf::from("./cache/store")),
            image_root: PathBuf::from("./cache/images"),
            cdn_base_url: "https://image.tmdb.org/t/p".to_string(),
            capacity_bytes: 1024 * 1024 * 1024, // 1GB
            trigger_count: 50,
            search_ttl_secs: 300,     // 5 minutes
            detail_ttl_secs: 3600,    // 1 hour
            upstream_timeout_secs: 20,
            sites_file: PathBuf::from("./sites.json"),
            remote_sites_url: None,
        }
    }
}

/// Shaped search response returned to clients and cached verbatim
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub list: Vec<SearchItem>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub search_entries: usize,
    pub detail_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 3100);
        assert_eq!(config.trigger_count, 50);
        assert_eq!(config.search_ttl_secs, 300);
        assert_eq!(config.detail_ttl_secs, 3600);
        assert!(config.remote_sites_url.is_none());
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 42,
            search_entries: 3,
            detail_entries: 1,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"ok\""));
        assert!(json.contains("42"));
    }
}
