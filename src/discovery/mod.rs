//! Profit-screening wallet discovery
//!
//! Looks at the earliest transfers of a token and keeps the recipients that
//! bought early, still hold, and are sitting on at least `profit_multiplier`
//! times their entry price. Sampling the first transfers and using
//! point-in-time quotes keeps the API cost bounded at the price of precision.

mod feed;

pub use feed::WhaleFeed;

use chrono::Utc;
use ethers::types::U256;
use rust_decimal::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::backend::ChainBackend;
use crate::config::DiscoveryConfig;
use crate::constants::{SECONDS_PER_DAY, ZERO_ADDRESS};
use crate::oracle::PriceOracle;

/// A wallet that passed every discovery filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryCandidate {
    pub address: String,
    /// Timestamp of the first transfer of the token into the wallet
    pub first_seen: i64,
    pub balance: U256,
    pub historical_price: f64,
    pub current_price: f64,
    /// `current_price / historical_price`
    pub multiple: Decimal,
}

pub struct DiscoveryEngine {
    backend: Arc<dyn ChainBackend>,
    oracle: Arc<dyn PriceOracle>,
    /// How many of the token's earliest transfers to sample
    sample_size: usize,
}

impl DiscoveryEngine {
    pub fn new(
        backend: Arc<dyn ChainBackend>,
        oracle: Arc<dyn PriceOracle>,
        sample_size: usize,
    ) -> Self {
        Self {
            backend,
            oracle,
            sample_size,
        }
    }

    pub fn from_config(
        backend: Arc<dyn ChainBackend>,
        oracle: Arc<dyn PriceOracle>,
        config: &DiscoveryConfig,
    ) -> Self {
        Self::new(backend, oracle, config.sample_size)
    }

    /// Addresses of qualifying wallets, oldest buyer first
    pub async fn discover(
        &self,
        token: &str,
        min_hold_days: u32,
        profit_multiplier: f64,
        max_wallets: usize,
    ) -> Vec<String> {
        let now = Utc::now().timestamp();
        self.discover_at(token, min_hold_days, profit_multiplier, max_wallets, now)
            .await
            .into_iter()
            .map(|candidate| candidate.address)
            .collect()
    }

    /// Run discovery as of unix time `now`
    pub async fn discover_at(
        &self,
        token: &str,
        min_hold_days: u32,
        profit_multiplier: f64,
        max_wallets: usize,
        now: i64,
    ) -> Vec<DiscoveryCandidate> {
        let token = token.to_ascii_lowercase();
        let Some(multiplier) = Decimal::from_f64(profit_multiplier) else {
            tracing::warn!(multiplier = profit_multiplier, "Profit multiplier not representable");
            return Vec::new();
        };
        let min_hold_secs = i64::from(min_hold_days) * SECONDS_PER_DAY;

        let transfers = self
            .backend
            .fetch_token_transfers(&token, self.sample_size)
            .await;
        let buyers = first_buyers(transfers.into_iter().map(|t| (t.to, t.timestamp)));

        tracing::info!(
            token = %token,
            sampled_buyers = buyers.len(),
            min_hold_days = min_hold_days,
            profit_multiplier = profit_multiplier,
            "Screening early buyers"
        );

        let mut current_price: Option<Option<f64>> = None;
        let mut candidates = Vec::new();

        for (address, first_seen) in buyers {
            if candidates.len() >= max_wallets {
                break;
            }

            if now - first_seen < min_hold_secs {
                tracing::trace!(wallet = %address, "Held for too short a time");
                continue;
            }

            let balance = self.backend.get_balance(&address, &token).await;
            if balance.is_zero() {
                tracing::trace!(wallet = %address, "No longer holds token");
                continue;
            }

            let Some(historical) = self.oracle.historical_price(&token, first_seen).await else {
                tracing::debug!(wallet = %address, first_seen = first_seen, "No historical price");
                continue;
            };

            let current = match current_price {
                Some(price) => price,
                None => {
                    let price = self.oracle.current_price(&token).await;
                    current_price = Some(price);
                    price
                }
            };
            let Some(current) = current else {
                tracing::warn!(token = %token, "No current price, discovery finds nothing");
                break;
            };

            let Some(multiple) = meets_multiple(historical, current, multiplier) else {
                tracing::trace!(
                    wallet = %address,
                    historical = historical,
                    current = current,
                    "Below profit multiple"
                );
                continue;
            };

            tracing::info!(
                wallet = %address,
                first_seen = first_seen,
                multiple = %multiple.round_dp(2),
                "Discovered profitable wallet"
            );
            candidates.push(DiscoveryCandidate {
                address,
                first_seen,
                balance,
                historical_price: historical,
                current_price: current,
                multiple,
            });
        }

        candidates
    }
}

/// First-seen timestamp per recipient, in order of first appearance.
///
/// Later transfers to an address already seen are ignored; mints to and
/// burns from the zero address never count as buyers.
pub fn first_buyers<I>(transfers: I) -> Vec<(String, i64)>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut seen = HashSet::new();
    let mut buyers = Vec::new();

    for (recipient, timestamp) in transfers {
        let recipient = recipient.to_ascii_lowercase();
        if recipient == ZERO_ADDRESS || !seen.insert(recipient.clone()) {
            continue;
        }
        buyers.push((recipient, timestamp));
    }

    buyers
}

/// `Some(current / historical)` when the multiple reaches `multiplier`.
///
/// Boundary is inclusive; a non-positive historical price never qualifies.
pub fn meets_multiple(historical: f64, current: f64, multiplier: Decimal) -> Option<Decimal> {
    let historical = Decimal::from_f64(historical)?;
    let current = Decimal::from_f64(current)?;
    if historical <= Decimal::ZERO {
        return None;
    }

    let threshold = historical.checked_mul(multiplier)?;
    if current < threshold {
        return None;
    }
    current.checked_div(historical)
}
