//! Per-wallet tracking state

use ethers::types::U256;
use std::collections::{BTreeMap, HashMap};

/// A token seen in a wallet that awaits hold confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHold {
    pub first_seen: i64,
    pub tx_hash: String,
    pub amount: U256,
}

/// Tracking state of one watched wallet
#[derive(Debug, Clone, Default)]
pub struct WatchedWallet {
    pub address: String,
    /// token -> timestamp of the first transfer into the wallet
    known_tokens: HashMap<String, i64>,
    /// token -> pending hold; ordered so maturation is deterministic
    pending_holds: BTreeMap<String, PendingHold>,
    /// Highest block already covered by a scan
    last_block: Option<u64>,
}

impl WatchedWallet {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn is_known(&self, token: &str) -> bool {
        self.known_tokens.contains_key(token)
    }

    pub fn first_seen(&self, token: &str) -> Option<i64> {
        self.known_tokens.get(token).copied()
    }

    /// Record the first sighting of a token.
    ///
    /// Returns `false` and leaves the stored timestamp untouched when the
    /// token is already known.
    pub fn record_first_seen(&mut self, token: &str, timestamp: i64) -> bool {
        if self.known_tokens.contains_key(token) {
            return false;
        }
        self.known_tokens.insert(token.to_string(), timestamp);
        true
    }

    pub fn known_token_count(&self) -> usize {
        self.known_tokens.len()
    }

    pub fn add_pending(&mut self, token: &str, hold: PendingHold) {
        self.pending_holds.entry(token.to_string()).or_insert(hold);
    }

    pub fn pending(&self, token: &str) -> Option<&PendingHold> {
        self.pending_holds.get(token)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_holds.len()
    }

    /// Remove and return every pending hold whose hold period has elapsed at `now`
    pub fn take_matured(&mut self, now: i64, hold_period_secs: i64) -> Vec<(String, PendingHold)> {
        let matured: Vec<String> = self
            .pending_holds
            .iter()
            .filter(|(_, hold)| now - hold.first_seen >= hold_period_secs)
            .map(|(token, _)| token.clone())
            .collect();

        matured
            .into_iter()
            .filter_map(|token| self.pending_holds.remove(&token).map(|hold| (token, hold)))
            .collect()
    }

    pub fn last_block(&self) -> Option<u64> {
        self.last_block
    }

    /// Move the block bookmark forward; never backward
    pub fn advance_bookmark(&mut self, block: u64) {
        if self.last_block.map_or(true, |current| block > current) {
            self.last_block = Some(block);
        }
    }
}

/// Normalize a user-supplied EVM address to lowercase `0x` hex.
///
/// Returns `None` unless the input is `0x` followed by 40 hex digits.
pub fn normalize_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", hex_part.to_ascii_lowercase()))
}
