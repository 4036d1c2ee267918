//! Fetch-through cache over the local image tree

use crate::error::{ImageCacheError, Result};
use crate::eviction::EvictionController;
use crate::types::{Fetched, ImageCacheConfig};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Disk-backed image cache that fetches misses from the upstream CDN
pub struct ImageCache {
    config: ImageCacheConfig,
    http: reqwest::Client,
    evictor: Arc<EvictionController>,
    /// One async mutex per in-flight key; concurrent misses for the same
    /// (variant, filename) await the winner instead of racing to the same
    /// destination path
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ImageCache {
    pub fn new(config: ImageCacheConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .expect("Failed to create HTTP client");

        let evictor = EvictionController::new(
            config.root.clone(),
            config.capacity_bytes,
            config.trigger_count,
        );

        Self {
            config,
            http,
            evictor,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Create the cache root directory
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.root).await?;
        Ok(())
    }

    /// The eviction controller, for direct trim control
    pub fn evictor(&self) -> &Arc<EvictionController> {
        &self.evictor
    }

    /// Fetch an image, serving from disk when present and streaming it from
    /// the CDN otherwise. Returns the path of the servable local file.
    pub async fn fetch(&self, size_variant: &str, filename: &str) -> Result<Fetched> {
        self.validate(size_variant, filename)?;
        let path = self.config.root.join(size_variant).join(filename);

        if servable(&path).await {
            touch(&path).await;
            return Ok(Fetched {
                path,
                from_cache: true,
            });
        }

        let key = format!("{}/{}", size_variant, filename);
        let lock = {
            let mut in_flight = self.in_flight.lock().unwrap();
            Arc::clone(in_flight.entry(key.clone()).or_default())
        };
        let _guard = lock.lock().await;

        // A concurrent fetch may have completed while we waited.
        if servable(&path).await {
            touch(&path).await;
            self.release(&key, &lock);
            return Ok(Fetched {
                path,
                from_cache: true,
            });
        }

        let result = self.download(size_variant, filename, &path).await;
        self.release(&key, &lock);

        match result {
            Ok(()) => {
                self.evictor.note_insertion();
                Ok(Fetched {
                    path,
                    from_cache: false,
                })
            }
            Err(e) => {
                // A partial download only ever exists at the tmp path; drop it
                // so the next attempt starts from scratch.
                let tmp = tmp_path(&path);
                if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = ?tmp, error = %cleanup, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }

    fn validate(&self, size_variant: &str, filename: &str) -> Result<()> {
        if !self.config.size_variants.iter().any(|v| v == size_variant) {
            return Err(ImageCacheError::InvalidParameter(format!(
                "Unknown size variant: {}",
                size_variant
            )));
        }
        if !valid_filename(filename) {
            return Err(ImageCacheError::InvalidParameter(format!(
                "Illegal filename: {}",
                filename
            )));
        }
        Ok(())
    }

    async fn download(&self, size_variant: &str, filename: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let url = format!(
            "{}/{}/{}",
            self.config.cdn_base_url.trim_end_matches('/'),
            size_variant,
            filename
        );
        debug!(url = %url, "Fetching image from CDN");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ImageCacheError::FetchFailed(format!(
                "CDN returned status {}",
                response.status()
            )));
        }

        // Copy chunks to disk as they arrive; the object is never held in
        // memory as a whole. Bytes land in a tmp sibling so a half-written
        // object is never visible at the servable path; only a complete
        // download is renamed onto the destination.
        let tmp = tmp_path(dest);
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        if written == 0 {
            return Err(ImageCacheError::FetchFailed(
                "CDN returned an empty body".to_string(),
            ));
        }

        tokio::fs::rename(&tmp, dest).await?;
        debug!(path = ?dest, bytes = written, "Cached image");
        Ok(())
    }

    fn release(&self, key: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap();
        // Only drop the entry we created; a later miss may already have
        // installed a fresh lock for this key.
        if in_flight
            .get(key)
            .map(|current| Arc::ptr_eq(current, lock))
            .unwrap_or(false)
        {
            in_flight.remove(key);
        }
    }
}

/// Filenames are a single restrictive path segment; anything else is
/// rejected before the filesystem is consulted
fn valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// A file is servable when it exists with non-zero length
async fn servable(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Sibling path downloads stream into before the final rename
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Refresh the file's modification time; this is the recency signal the
/// trim pass sorts on. Failure to touch never fails the hit.
async fn touch(path: &Path) {
    let path = path.to_path_buf();
    let _ = tokio::task::spawn_blocking(move || {
        let touched = std::fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(SystemTime::now()));
        if let Err(e) = touched {
            warn!(path = ?path, error = %e, "Failed to update access time");
        }
    })
    .await;
}
