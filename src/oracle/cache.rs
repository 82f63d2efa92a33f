//! Price cache
//!
//! Current quotes expire after a TTL. Historical quotes never change, so
//! they are kept until the process exits (bounded by the handful of tokens
//! discovery looks at).

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Default cache TTL in seconds
const DEFAULT_CACHE_TTL_SECS: i64 = 60;

/// Current quote with its fetch time
#[derive(Debug, Clone, Copy)]
struct PriceEntry {
    price_usd: f64,
    fetched_at: DateTime<Utc>,
}

pub struct PriceCache {
    /// Current prices by token address
    current: RwLock<HashMap<String, PriceEntry>>,
    /// Historical prices by (token, unix timestamp)
    historical: RwLock<HashMap<(String, i64), f64>>,
    ttl: Duration,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL_SECS)
    }

    /// Create with custom TTL
    pub fn with_ttl(ttl_secs: i64) -> Self {
        Self {
            current: RwLock::new(HashMap::new()),
            historical: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Current USD price for a token, if still fresh
    pub fn get_price_usd(&self, token: &str) -> Option<f64> {
        let prices = self.current.read();
        let entry = prices.get(token)?;

        let age = Utc::now().signed_duration_since(entry.fetched_at);
        (age <= self.ttl).then_some(entry.price_usd)
    }

    pub fn set_price(&self, token: &str, price_usd: f64) {
        self.current.write().insert(
            token.to_string(),
            PriceEntry {
                price_usd,
                fetched_at: Utc::now(),
            },
        );
    }

    pub fn get_historical(&self, token: &str, timestamp: i64) -> Option<f64> {
        self.historical
            .read()
            .get(&(token.to_string(), timestamp))
            .copied()
    }

    pub fn set_historical(&self, token: &str, timestamp: i64, price_usd: f64) {
        self.historical
            .write()
            .insert((token.to_string(), timestamp), price_usd);
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}
