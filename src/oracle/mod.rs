//! Token price oracle
//!
//! Discovery needs two quotes per token: the USD price at a past timestamp
//! and the current USD price. Quotes are `Option<f64>`; `None` means the
//! oracle had no data and the caller decides what that implies.

mod cache;
mod defillama;

pub use cache::PriceCache;
pub use defillama::DefiLlamaOracle;

/// Source of USD token prices
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    /// USD price of `token` closest to unix `timestamp`
    async fn historical_price(&self, token: &str, timestamp: i64) -> Option<f64>;

    /// Latest USD price of `token`
    async fn current_price(&self, token: &str) -> Option<f64>;
}

/// Oracle errors
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response did not carry a price for the token
    #[error("No price for {0}")]
    Missing(String),

    /// Rate limited
    #[error("Rate limited by price API")]
    RateLimited,
}
