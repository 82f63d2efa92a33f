//! External whale list
//!
//! `GET {feed_url}?api_key=...` answering `{"wallets": ["0x..", ...]}`.
//! Any failure yields an empty list; the merge step validates addresses.

use serde::Deserialize;
use std::time::Duration;

use crate::config::DiscoveryConfig;
use crate::error::BackendResult;

#[derive(Debug, Default, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    wallets: Vec<String>,
}

pub struct WhaleFeed {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl WhaleFeed {
    pub fn new(url: &str, api_key: Option<String>, timeout_ms: u64) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            api_key,
        })
    }

    /// `None` when no feed URL is configured
    pub fn from_config(config: &DiscoveryConfig, timeout_ms: u64) -> BackendResult<Option<Self>> {
        let Some(url) = config.feed_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        let api_key = config.feed_api_key.clone().filter(|k| !k.trim().is_empty());
        Self::new(url, api_key, timeout_ms).map(Some)
    }

    pub async fn fetch(&self) -> Vec<String> {
        match self.try_fetch().await {
            Ok(wallets) => {
                tracing::debug!(count = wallets.len(), "Fetched whale list");
                wallets
            }
            Err(e) => {
                tracing::warn!(error = %e.without_url(), "Whale list unavailable");
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self) -> Result<Vec<String>, reqwest::Error> {
        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }
        let body: FeedResponse = request.send().await?.error_for_status()?.json().await?;
        Ok(body.wallets)
    }
}
