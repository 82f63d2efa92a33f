//! DefiLlama coins API client
//!
//! - current: `GET {api}/prices/current/{chain}:{token}`
//! - historical: `GET {api}/prices/historical/{ts}/{chain}:{token}?searchWidth=...`

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{OracleError, PriceCache, PriceOracle};
use crate::config::PriceConfig;

#[derive(Debug, Deserialize)]
struct CoinsResponse {
    #[serde(default)]
    coins: HashMap<String, CoinPrice>,
}

#[derive(Debug, Deserialize)]
struct CoinPrice {
    price: f64,
}

pub struct DefiLlamaOracle {
    client: reqwest::Client,
    api_url: String,
    chain: String,
    search_width: String,
    cache: PriceCache,
}

impl DefiLlamaOracle {
    pub fn new(config: &PriceConfig, timeout_ms: u64) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            chain: config.chain.clone(),
            search_width: format_search_width(config.search_width_secs),
            cache: PriceCache::with_ttl(config.cache_ttl_secs),
        })
    }

    fn coin_id(&self, token: &str) -> String {
        format!("{}:{}", self.chain, token.to_ascii_lowercase())
    }

    async fn fetch(&self, url: &str, coin: &str) -> Result<f64, OracleError> {
        tracing::debug!(url = %url, "Fetching price from DefiLlama");

        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }
        let body: CoinsResponse = response.error_for_status()?.json().await?;

        body.coins
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(coin))
            .map(|(_, quote)| quote.price)
            .ok_or_else(|| OracleError::Missing(coin.to_string()))
    }
}

#[async_trait::async_trait]
impl PriceOracle for DefiLlamaOracle {
    async fn historical_price(&self, token: &str, timestamp: i64) -> Option<f64> {
        if let Some(price) = self.cache.get_historical(token, timestamp) {
            return Some(price);
        }

        let coin = self.coin_id(token);
        let url = format!(
            "{}/prices/historical/{}/{}?searchWidth={}",
            self.api_url, timestamp, coin, self.search_width
        );
        match self.fetch(&url, &coin).await {
            Ok(price) => {
                self.cache.set_historical(token, timestamp, price);
                Some(price)
            }
            Err(e) => {
                tracing::warn!(
                    token = token,
                    timestamp = timestamp,
                    error = %e,
                    "Historical price unavailable"
                );
                None
            }
        }
    }

    async fn current_price(&self, token: &str) -> Option<f64> {
        if let Some(price) = self.cache.get_price_usd(token) {
            return Some(price);
        }

        let coin = self.coin_id(token);
        let url = format!("{}/prices/current/{}", self.api_url, coin);
        match self.fetch(&url, &coin).await {
            Ok(price) => {
                self.cache.set_price(token, price);
                Some(price)
            }
            Err(e) => {
                tracing::warn!(token = token, error = %e, "Current price unavailable");
                None
            }
        }
    }
}

/// `14400` -> `4h`, `900` -> `15m`
fn format_search_width(secs: u64) -> String {
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}m", (secs / 60).max(1))
    }
}
