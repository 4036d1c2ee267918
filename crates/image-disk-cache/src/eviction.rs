//! Size-capped eviction over the cache directory
//!
//! No persistent index is kept: every trim pass re-enumerates the tree and
//! uses file modification times as the recency signal. Passes are triggered
//! every `trigger_count` insertions and run as deferred tasks off the
//! request path.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Delay before a scheduled trim pass starts, so it never runs inside the
/// request that triggered it
const TRIM_DELAY: Duration = Duration::from_millis(100);

/// Fraction of capacity left in place after a trim, as headroom against the
/// next few insertions immediately re-triggering a scan
const TRIM_TARGET_RATIO: f64 = 0.9;

#[derive(Debug)]
struct ScannedFile {
    path: PathBuf,
    size: u64,
    touched_at: SystemTime,
}

/// Watches insertion volume and trims the cache tree back under capacity
#[derive(Debug)]
pub struct EvictionController {
    root: PathBuf,
    capacity_bytes: u64,
    trigger_count: u64,
    insertions: AtomicU64,
    trimming: AtomicBool,
}

impl EvictionController {
    pub fn new(root: PathBuf, capacity_bytes: u64, trigger_count: u64) -> Arc<Self> {
        Arc::new(Self {
            root,
            capacity_bytes,
            trigger_count,
            insertions: AtomicU64::new(0),
            trimming: AtomicBool::new(false),
        })
    }

    /// Record one new cache file. Every `trigger_count` insertions a trim
    /// pass is scheduled after a short delay.
    pub fn note_insertion(self: &Arc<Self>) {
        let count = self.insertions.fetch_add(1, Ordering::Relaxed) + 1;
        if self.trigger_count == 0 || count % self.trigger_count != 0 {
            return;
        }

        debug!(count, "Insertion threshold reached; scheduling trim pass");
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(TRIM_DELAY).await;
            controller.trim_now().await;
        });
    }

    /// Run a trim pass immediately. At most one pass runs at a time;
    /// overlapping calls return without scanning.
    pub async fn trim_now(&self) {
        if self.trimming.swap(true, Ordering::SeqCst) {
            debug!("Trim pass already running; skipping");
            return;
        }
        if let Err(e) = self.run_pass().await {
            warn!(error = %e, "Trim pass failed");
        }
        self.trimming.store(false, Ordering::SeqCst);
    }

    async fn run_pass(&self) -> std::io::Result<()> {
        let mut files = Vec::new();
        let mut total: u64 = 0;

        // Iterative walk; the tree is at most two levels deep but nothing
        // here depends on that.
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            while let Some(entry) = entries.next_entry().await? {
                let meta = match entry.metadata().await {
                    Ok(meta) => meta,
                    // Vanished mid-scan; another pass or a failed fetch
                    // cleaned it up.
                    Err(_) => continue,
                };

                if meta.is_dir() {
                    pending.push(entry.path());
                } else {
                    let touched_at = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    total += meta.len();
                    files.push(ScannedFile {
                        path: entry.path(),
                        size: meta.len(),
                        touched_at,
                    });
                }
            }
        }

        if total <= self.capacity_bytes {
            debug!(total, capacity = self.capacity_bytes, "Cache under capacity; nothing to trim");
            return Ok(());
        }

        let target = total - (self.capacity_bytes as f64 * TRIM_TARGET_RATIO) as u64;
        files.sort_by_key(|f| f.touched_at);

        let mut freed: u64 = 0;
        let mut deleted = 0usize;
        for file in &files {
            if freed >= target {
                break;
            }
            match tokio::fs::remove_file(&file.path).await {
                Ok(()) => {
                    freed += file.size;
                    deleted += 1;
                }
                Err(e) => {
                    warn!(path = ?file.path, error = %e, "Failed to delete cached image; skipping");
                }
            }
        }

        info!(
            total,
            capacity = self.capacity_bytes,
            freed,
            deleted,
            "Trim pass complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// Create `count` files of `size` bytes with strictly increasing
    /// modification times, oldest first
    fn seed_files(root: &std::path::Path, count: usize, size: usize) -> Vec<PathBuf> {
        let dir = root.join("w500");
        fs::create_dir_all(&dir).unwrap();
        let base = SystemTime::now() - Duration::from_secs(count as u64 + 10);

        (0..count)
            .map(|i| {
                let path = dir.join(format!("img{:03}.jpg", i));
                fs::write(&path, vec![0u8; size]).unwrap();
                let file = fs::File::options().write(true).open(&path).unwrap();
                file.set_modified(base + Duration::from_secs(i as u64)).unwrap();
                path
            })
            .collect()
    }

    fn total_size(root: &std::path::Path) -> u64 {
        let mut total = 0;
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let entry = entry.unwrap();
                let meta = entry.metadata().unwrap();
                if meta.is_dir() {
                    pending.push(entry.path());
                } else {
                    total += meta.len();
                }
            }
        }
        total
    }

    #[tokio::test]
    async fn test_under_capacity_deletes_nothing() {
        let dir = tempdir().unwrap();
        let paths = seed_files(dir.path(), 10, 1_000);

        let controller = EvictionController::new(dir.path().to_path_buf(), 100_000, 50);
        controller.trim_now().await;

        for path in &paths {
            assert!(path.exists());
        }
    }

    #[tokio::test]
    async fn test_trim_deletes_oldest_down_to_target() {
        let dir = tempdir().unwrap();
        // 51 files x 2000 bytes = 102_000 bytes against a 100_000 cap;
        // target is 102_000 - 90_000 = 12_000, i.e. the 6 oldest files.
        let paths = seed_files(dir.path(), 51, 2_000);

        let controller = EvictionController::new(dir.path().to_path_buf(), 100_000, 50);
        controller.trim_now().await;

        for path in &paths[..6] {
            assert!(!path.exists(), "expected {:?} evicted", path);
        }
        for path in &paths[6..] {
            assert!(path.exists(), "expected {:?} kept", path);
        }
        assert!(total_size(dir.path()) <= 90_000);
    }

    #[tokio::test]
    async fn test_newer_files_never_deleted_while_older_remain() {
        let dir = tempdir().unwrap();
        let paths = seed_files(dir.path(), 20, 5_000);

        let controller = EvictionController::new(dir.path().to_path_buf(), 60_000, 50);
        controller.trim_now().await;

        // Survivors must form a suffix of the mtime-ordered list.
        let alive: Vec<bool> = paths.iter().map(|p| p.exists()).collect();
        let first_alive = alive.iter().position(|a| *a).unwrap();
        assert!(alive[first_alive..].iter().all(|a| *a));
    }

    #[tokio::test]
    async fn test_insertion_trigger_schedules_deferred_pass() {
        let dir = tempdir().unwrap();
        let paths = seed_files(dir.path(), 51, 2_000);

        let controller = EvictionController::new(dir.path().to_path_buf(), 100_000, 5);
        for _ in 0..5 {
            controller.note_insertion();
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!paths[0].exists());
        assert!(total_size(dir.path()) <= 90_000);
    }

    #[tokio::test]
    async fn test_below_trigger_does_not_trim() {
        let dir = tempdir().unwrap();
        let paths = seed_files(dir.path(), 51, 2_000);

        let controller = EvictionController::new(dir.path().to_path_buf(), 100_000, 5);
        for _ in 0..4 {
            controller.note_insertion();
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
        for path in &paths {
            assert!(path.exists());
        }
    }

    #[tokio::test]
    async fn test_missing_root_is_not_an_error() {
        let dir = tempdir().unwrap();
        let controller =
            EvictionController::new(dir.path().join("never-created"), 1_000, 50);
        controller.trim_now().await;
    }
}
