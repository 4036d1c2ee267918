//! Site registry and upstream client for VOD provider APIs
//!
//! Providers share one wire shape: a GET endpoint taking `ac=detail` with
//! either `wd` (keyword search) or `ids` (detail lookup), answering with a
//! JSON envelope whose `list` field carries the records.

mod client;
mod error;
mod registry;
mod types;

pub use client::ProviderClient;
pub use error::{Result, VodApiError};
pub use registry::SiteRegistry;
pub use types::{ListResponse, SearchItem, Site};
