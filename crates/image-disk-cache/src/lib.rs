//! Fetch-through disk cache for CDN images
//!
//! Images are addressed by (size-variant, filename) and stored one file per
//! image under `root/<variant>/<filename>`. A request is served from disk
//! when the file exists with non-zero length; otherwise the remote object is
//! streamed to disk first. Concurrent misses for the same key collapse into
//! a single upstream fetch. Disk usage is bounded by an eviction pass that
//! deletes the least-recently-touched files once an insertion threshold is
//! reached; the filesystem itself is the index.

mod cache;
mod error;
mod eviction;
mod types;

pub use cache::ImageCache;
pub use error::{ImageCacheError, Result};
pub use eviction::EvictionController;
pub use types::{Fetched, ImageCacheConfig};
