//! Shared in-memory collaborators for tests

#![allow(dead_code)]


use ethers::types::U256;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use whale_sentinel::backend::{BackendKind, ChainBackend};
use whale_sentinel::models::{TransferEvent, TransferPage};
use whale_sentinel::notifications::{NotificationEvent, NotificationService};
use whale_sentinel::oracle::PriceOracle;

pub const WALLET: &str = "0x0000000000000000000000000000000000000abc";
pub const TOKEN: &str = "0x00000000000000000000000000000000000000ee";
pub const OTHER_TOKEN: &str = "0x00000000000000000000000000000000000000ff";

/// `0x` + 40 hex digits ending in `n`
pub fn address(n: u64) -> String {
    format!("0x{:040x}", n)
}

pub fn transfer(token: &str, to: &str, amount: u64, block: u64, timestamp: i64) -> TransferEvent {
    TransferEvent {
        token: token.to_string(),
        from: address(0xf1),
        to: to.to_string(),
        amount: U256::from(amount),
        tx_hash: format!("0x{:064x}", block),
        block_number: block,
        timestamp,
    }
}

#[derive(Default)]
struct BackendState {
    head: Option<u64>,
    transfers: Vec<TransferEvent>,
    balances: HashMap<(String, String), U256>,
    symbols: HashMap<String, String>,
    token_history: Vec<TransferEvent>,
    since_calls: Vec<Option<u64>>,
    balance_calls: usize,
}

/// Chain backend fed by the test
pub struct MockBackend {
    kind: BackendKind,
    state: Mutex<BackendState>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Self::with_kind(BackendKind::RpcLogs)
    }

    pub fn with_kind(kind: BackendKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: Mutex::new(BackendState::default()),
        })
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().head = Some(head);
    }

    pub fn push_transfer(&self, event: TransferEvent) {
        self.state.lock().transfers.push(event);
    }

    pub fn set_balance(&self, wallet: &str, token: &str, amount: u64) {
        self.state
            .lock()
            .balances
            .insert((wallet.to_string(), token.to_string()), U256::from(amount));
    }

    pub fn set_symbol(&self, token: &str, symbol: &str) {
        self.state
            .lock()
            .symbols
            .insert(token.to_string(), symbol.to_string());
    }

    pub fn set_token_history(&self, events: Vec<TransferEvent>) {
        self.state.lock().token_history = events;
    }

    /// `since_block` of every `fetch_transfers` call so far
    pub fn since_calls(&self) -> Vec<Option<u64>> {
        self.state.lock().since_calls.clone()
    }

    pub fn balance_calls(&self) -> usize {
        self.state.lock().balance_calls
    }
}

#[async_trait::async_trait]
impl ChainBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn head_block(&self) -> Option<u64> {
        self.state.lock().head
    }

    async fn fetch_transfers(&self, wallet: &str, since_block: Option<u64>) -> TransferPage {
        let mut state = self.state.lock();
        state.since_calls.push(since_block);
        let events = state
            .transfers
            .iter()
            .filter(|e| e.to == wallet && since_block.map_or(true, |since| e.block_number >= since))
            .cloned()
            .collect();
        TransferPage {
            events,
            head_block: state.head,
        }
    }

    async fn get_balance(&self, wallet: &str, token: &str) -> U256 {
        let mut state = self.state.lock();
        state.balance_calls += 1;
        state
            .balances
            .get(&(wallet.to_string(), token.to_string()))
            .copied()
            .unwrap_or_default()
    }

    async fn get_symbol(&self, token: &str) -> String {
        self.state
            .lock()
            .symbols
            .get(token)
            .cloned()
            .unwrap_or_else(|| token.to_string())
    }

    async fn fetch_token_transfers(&self, token: &str, limit: usize) -> Vec<TransferEvent> {
        self.state
            .lock()
            .token_history
            .iter()
            .filter(|e| e.token == token)
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Price oracle fed by the test
#[derive(Default)]
pub struct MockOracle {
    historical: Mutex<HashMap<i64, f64>>,
    current: Mutex<Option<f64>>,
}

impl MockOracle {
    pub fn new(current: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            historical: Mutex::new(HashMap::new()),
            current: Mutex::new(current),
        })
    }

    pub fn set_historical(&self, timestamp: i64, price: f64) {
        self.historical.lock().insert(timestamp, price);
    }
}

#[async_trait::async_trait]
impl PriceOracle for MockOracle {
    async fn historical_price(&self, _token: &str, timestamp: i64) -> Option<f64> {
        self.historical.lock().get(&timestamp).copied()
    }

    async fn current_price(&self, _token: &str) -> Option<f64> {
        *self.current.lock()
    }
}

/// Notifier that records every event; optionally fails each send
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().clone()
    }

    pub fn purchases(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, NotificationEvent::TokenPurchase { .. }))
            .count()
    }
}

#[async_trait::async_trait]
impl NotificationService for RecordingNotifier {
    async fn notify(&self, event: NotificationEvent) -> anyhow::Result<()> {
        self.events.lock().push(event);
        if self.fail {
            anyhow::bail!("chat unreachable");
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
