//! Alert models - what the monitor engine hands to the notifier

use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// How a newly seen token turns into an alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPolicy {
    /// Alert at first sight
    #[default]
    Immediate,
    /// Record as pending and alert once the hold period has elapsed
    Hold,
}

impl std::fmt::Display for AlertPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertPolicy::Immediate => write!(f, "IMMEDIATE"),
            AlertPolicy::Hold => write!(f, "HOLD"),
        }
    }
}

/// Which pass of the scan produced the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// First transfer of the token into the wallet
    FirstPurchase,
    /// Position still held after the hold period
    HoldConfirmed,
}

/// A qualifying purchase by a watched wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub wallet: String,
    pub token: String,
    /// Token symbol, or the token address when it could not be resolved
    pub symbol: String,
    /// Transfer amount for first purchases, current balance for confirmed holds
    pub amount: U256,
    pub tx_hash: String,
    pub kind: AlertKind,
    /// Timestamp of the first observed transfer
    pub first_seen: i64,
}

impl Alert {
    /// Block explorer link for the originating transaction
    pub fn tx_link(&self) -> String {
        format!("{}{}", crate::constants::EXPLORER_TX_URL, self.tx_hash)
    }
}
