//! Wire types for provider APIs and the site registry

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One upstream site: a stable key, a display name, and the API endpoint
/// template its search/detail calls go to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub key: String,
    pub name: String,
    pub api: String,
}

/// Provider response envelope; only the record list is retained
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub list: Vec<T>,
}

/// The field subset kept from a search record. Providers are loose about
/// numeric vs string ids and years, so those stay as raw JSON values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub vod_id: Value,
    #[serde(default)]
    pub vod_name: String,
    #[serde(default)]
    pub vod_pic: String,
    #[serde(default)]
    pub vod_remarks: String,
    #[serde(default)]
    pub vod_year: Value,
    #[serde(default)]
    pub type_name: String,
}
