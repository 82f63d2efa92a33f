//! Transfer models - raw ERC-20 transfer events produced by a backend

use ethers::types::U256;
use serde::Serialize;

/// A single ERC-20 `Transfer` observed on chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferEvent {
    /// Token contract address (lowercase hex)
    pub token: String,
    /// Sender address (lowercase hex)
    pub from: String,
    /// Recipient address (lowercase hex)
    pub to: String,
    /// Amount in the token's smallest unit
    pub amount: U256,
    /// Transaction hash
    pub tx_hash: String,
    /// Block the transfer was included in
    pub block_number: u64,
    /// Block timestamp (unix seconds)
    pub timestamp: i64,
}

/// One backend response for a wallet scan
#[derive(Debug, Clone, Default)]
pub struct TransferPage {
    /// Transfers into the wallet, in no particular order
    pub events: Vec<TransferEvent>,
    /// Chain head (or highest block covered) at query time, if known
    pub head_block: Option<u64>,
}

impl TransferPage {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Highest block covered by this page: the head block or the newest event
    pub fn highest_block(&self) -> Option<u64> {
        let newest_event = self.events.iter().map(|e| e.block_number).max();
        match (self.head_block, newest_event) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Events sorted oldest first; ties keep backend order
    pub fn into_chronological(mut self) -> Vec<TransferEvent> {
        self.events
            .sort_by(|a, b| (a.block_number, a.timestamp).cmp(&(b.block_number, b.timestamp)));
        self.events
    }
}
