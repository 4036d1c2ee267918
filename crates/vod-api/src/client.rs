//! Provider API HTTP client

use crate::error::{Result, VodApiError};
use crate::types::{ListResponse, SearchItem};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Client for the search/detail endpoints of VOD provider sites
pub struct ProviderClient {
    http: reqwest::Client,
}

impl ProviderClient {
    /// Create a new client with default settings (30 second timeout)
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new client with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { http }
    }

    /// Search a site by keyword, keeping the retained field subset per item
    pub async fn search(&self, api: &str, keyword: &str) -> Result<Vec<SearchItem>> {
        let url = action_url(api, &format!("ac=detail&wd={}", urlencoding::encode(keyword)));
        debug!(url = %url, "Searching provider");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(VodApiError::Status(response.status().as_u16()));
        }

        let data: ListResponse<SearchItem> = response.json().await?;
        Ok(data.list)
    }

    /// Look up a record by id, returning the first list item verbatim
    pub async fn detail(&self, api: &str, ids: &str) -> Result<Option<Value>> {
        let url = action_url(api, &format!("ac=detail&ids={}", urlencoding::encode(ids)));
        debug!(url = %url, "Fetching provider detail");

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(VodApiError::Status(response.status().as_u16()));
        }

        let data: ListResponse<Value> = response.json().await?;
        Ok(data.list.into_iter().next())
    }
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Append action parameters to an endpoint template, which may already carry
/// a query string
fn action_url(api: &str, params: &str) -> String {
    if api.contains('?') {
        format!("{}&{}", api, params)
    } else {
        format!("{}?{}", api, params)
    }
}
