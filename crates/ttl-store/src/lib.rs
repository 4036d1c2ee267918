//! Partitioned key/value store with TTL expiration
//!
//! Values live in named partitions so independent callers never collide on
//! key namespace. Expiry is lazy: an expired entry is reported as a miss but
//! stays in place until overwritten. The store can run purely in memory or
//! snapshot each partition to a JSON file on every write. (An embedded
//! database backend with incremental writes would fit behind the same
//! contract; only durability and flush cost differ.)

mod error;
mod store;
mod types;

pub use error::{Result, TtlStoreError};
pub use store::TtlStore;
pub use types::{Persistence, StoredEntry};
