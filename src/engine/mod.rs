//! Monitor engine
//!
//! Owns per-wallet detection state and turns raw transfers into alerts.
//! One call to [`MonitorEngine::scan_at`] is one poll cycle:
//!
//! 1. pending holds that have matured are checked against the current
//!    balance and either confirmed (alert) or dropped;
//! 2. new transfers since the wallet's block bookmark are read, and each
//!    token seen for the first time is alerted or parked as a pending hold.
//!
//! A token enters `KnownTokens` at first sight and never leaves, which is
//! what keeps a wallet from being alerted twice for the same token.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{BackendKind, ChainBackend};
use crate::config::MonitorConfig;
use crate::models::{Alert, AlertKind, AlertPolicy, PendingHold, TransferEvent, WatchedWallet};

/// Aggregate engine counters for health output
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub wallets: usize,
    pub known_tokens: usize,
    pub pending_holds: usize,
}

pub struct MonitorEngine {
    backend: Arc<dyn ChainBackend>,
    policy: AlertPolicy,
    hold_period_secs: i64,
    /// Watched addresses, in insertion order
    watched: Vec<String>,
    /// Per-wallet state; outlives removal from `watched`
    state: HashMap<String, WatchedWallet>,
}

impl MonitorEngine {
    /// Construction performs no I/O
    pub fn new(backend: Arc<dyn ChainBackend>, policy: AlertPolicy, hold_period_secs: i64) -> Self {
        Self {
            backend,
            policy,
            hold_period_secs,
            watched: Vec::new(),
            state: HashMap::new(),
        }
    }

    pub fn from_config(backend: Arc<dyn ChainBackend>, config: &MonitorConfig) -> Self {
        Self::new(backend, config.alert_policy, config.hold_period_secs)
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> Arc<dyn ChainBackend> {
        self.backend.clone()
    }

    pub fn wallets(&self) -> &[String] {
        &self.watched
    }

    pub fn wallet_state(&self, address: &str) -> Option<&WatchedWallet> {
        self.state.get(&address.to_ascii_lowercase())
    }

    pub fn stats(&self) -> EngineStats {
        let tracked = self.watched.iter().filter_map(|w| self.state.get(w));
        let (known_tokens, pending_holds) = tracked.fold((0, 0), |(known, pending), wallet| {
            (known + wallet.known_token_count(), pending + wallet.pending_count())
        });

        EngineStats {
            wallets: self.watched.len(),
            known_tokens,
            pending_holds,
        }
    }

    /// Replace the watched set.
    ///
    /// State of wallets that stay is preserved, new wallets start empty, and
    /// state of dropped wallets is kept so a re-add does not re-alert.
    pub fn update_wallets<I, S>(&mut self, wallets: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next: Vec<String> = Vec::new();
        for wallet in wallets {
            let wallet = wallet.as_ref().trim().to_ascii_lowercase();
            if wallet.is_empty() || next.contains(&wallet) {
                continue;
            }
            self.state
                .entry(wallet.clone())
                .or_insert_with(|| WatchedWallet::new(wallet.clone()));
            next.push(wallet);
        }

        let added = next.iter().filter(|w| !self.watched.contains(w)).count();
        let removed = self.watched.iter().filter(|w| !next.contains(w)).count();
        self.watched = next;

        if added > 0 || removed > 0 {
            tracing::info!(
                wallets = self.watched.len(),
                added = added,
                removed = removed,
                "Updated watched wallets"
            );
        }
    }

    /// Start watching one address; `false` if it was already watched
    pub fn add_wallet(&mut self, address: &str) -> bool {
        let wallet = address.trim().to_ascii_lowercase();
        if self.watched.contains(&wallet) {
            return false;
        }
        self.state
            .entry(wallet.clone())
            .or_insert_with(|| WatchedWallet::new(wallet.clone()));
        tracing::info!(wallet = %wallet, "Watching wallet");
        self.watched.push(wallet);
        true
    }

    /// Stop watching one address; `false` if it was not watched
    pub fn remove_wallet(&mut self, address: &str) -> bool {
        let wallet = address.trim().to_ascii_lowercase();
        let before = self.watched.len();
        self.watched.retain(|w| w != &wallet);
        let removed = self.watched.len() != before;
        if removed {
            tracing::info!(wallet = %wallet, "Stopped watching wallet");
        }
        removed
    }

    /// Run one scan cycle at the current wall-clock time
    pub async fn scan(&mut self) -> Vec<Alert> {
        self.scan_at(Utc::now().timestamp()).await
    }

    /// Run one scan cycle as of unix time `now`.
    ///
    /// Wallets are scanned one after another; backend failures show up as
    /// empty pages and never abort the cycle.
    pub async fn scan_at(&mut self, now: i64) -> Vec<Alert> {
        let wallets = self.watched.clone();
        let mut alerts = Vec::new();

        for wallet in &wallets {
            let found = self.scan_wallet(wallet, now).await;
            alerts.extend(found);
        }

        tracing::debug!(
            wallets = wallets.len(),
            alerts = alerts.len(),
            now = now,
            "Scan cycle complete"
        );
        alerts
    }

    async fn scan_wallet(&mut self, wallet: &str, now: i64) -> Vec<Alert> {
        let backend = self.backend.clone();
        let policy = self.policy;
        let hold_period = self.hold_period_secs;
        let state = self
            .state
            .entry(wallet.to_string())
            .or_insert_with(|| WatchedWallet::new(wallet));
        let mut alerts = Vec::new();

        // Maturation first, so a token is never new and matured in one cycle
        for (token, hold) in state.take_matured(now, hold_period) {
            let balance = backend.get_balance(wallet, &token).await;
            if balance.is_zero() {
                tracing::info!(
                    wallet = %wallet,
                    token = %token,
                    "Position closed before hold period elapsed, no alert"
                );
                continue;
            }

            let symbol = backend.get_symbol(&token).await;
            tracing::info!(
                wallet = %wallet,
                token = %token,
                symbol = %symbol,
                balance = %balance,
                "Hold confirmed"
            );
            alerts.push(Alert {
                wallet: wallet.to_string(),
                token,
                symbol,
                amount: balance,
                tx_hash: hold.tx_hash,
                kind: AlertKind::HoldConfirmed,
                first_seen: hold.first_seen,
            });
        }

        let since_block = state.last_block().map(|block| block + 1);
        let page = backend.fetch_transfers(wallet, since_block).await;
        let highest = page.highest_block();

        for event in page.into_chronological() {
            if !event.to.eq_ignore_ascii_case(wallet) {
                continue;
            }
            let token = event.token.to_ascii_lowercase();
            if !state.record_first_seen(&token, event.timestamp) {
                continue;
            }

            match policy {
                AlertPolicy::Immediate => {
                    let symbol = backend.get_symbol(&token).await;
                    tracing::info!(
                        wallet = %wallet,
                        token = %token,
                        symbol = %symbol,
                        tx = %event.tx_hash,
                        "New token purchase"
                    );
                    alerts.push(first_purchase(wallet, token, symbol, event));
                }
                AlertPolicy::Hold => {
                    tracing::debug!(
                        wallet = %wallet,
                        token = %token,
                        first_seen = event.timestamp,
                        "New token pending hold confirmation"
                    );
                    state.add_pending(
                        &token,
                        PendingHold {
                            first_seen: event.timestamp,
                            tx_hash: event.tx_hash,
                            amount: event.amount,
                        },
                    );
                }
            }
        }

        if let Some(block) = highest {
            state.advance_bookmark(block);
        }

        alerts
    }
}

fn first_purchase(wallet: &str, token: String, symbol: String, event: TransferEvent) -> Alert {
    Alert {
        wallet: wallet.to_string(),
        token,
        symbol,
        amount: event.amount,
        tx_hash: event.tx_hash,
        kind: AlertKind::FirstPurchase,
        first_seen: event.timestamp,
    }
}
