//! Image cache configuration and result types

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the image cache
#[derive(Debug, Clone)]
pub struct ImageCacheConfig {
    /// Directory holding one subdirectory per size variant
    pub root: PathBuf,
    /// CDN base URL; images resolve to `<base>/<variant>/<filename>`
    pub cdn_base_url: String,
    /// Allow-list of size variant tokens
    pub size_variants: Vec<String>,
    /// Hard cap on aggregate cache size in bytes
    pub capacity_bytes: u64,
    /// Insertions between eviction scans
    pub trigger_count: u64,
    /// Timeout for a single upstream fetch
    pub fetch_timeout: Duration,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./cache/images"),
            cdn_base_url: "https://image.tmdb.org/t/p".to_string(),
            size_variants: ["w92", "w154", "w185", "w342", "w500", "w780", "original"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            capacity_bytes: 1024 * 1024 * 1024, // 1GB
            trigger_count: 50,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of a successful fetch
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Path of the servable file on local disk
    pub path: PathBuf,
    /// Whether the file was already present
    pub from_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImageCacheConfig::default();
        assert_eq!(config.root, PathBuf::from("./cache/images"));
        assert_eq!(config.capacity_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.trigger_count, 50);
        assert!(config.size_variants.iter().any(|v| v == "original"));
    }
}
