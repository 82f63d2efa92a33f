//! Monitoring orchestration
//!
//! [`MonitoringState`] ties the engine, the watch-list store, discovery and
//! the notifier together. The engine sits behind an async mutex; every
//! mutation of the watched set (scan-time reload, manual add/remove,
//! discovery merge) happens while holding it, so a merge can never tear the
//! wallet list under a running scan.

pub mod polling_task;

pub use polling_task::{start_discovery_task, start_polling_task};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backend::{BackendKind, ChainBackend};
use crate::config::AppConfig;
use crate::discovery::{DiscoveryEngine, WhaleFeed};
use crate::engine::{EngineStats, MonitorEngine};
use crate::error::{AppError, AppResult};
use crate::models::{normalize_address, Alert, AlertPolicy};
use crate::notifications::{CompositeNotifier, NotificationEvent};
use crate::oracle::PriceOracle;
use crate::watchlist::{merge_watchlist, MergeResult, WatchListStore};

/// Outcome of the most recent scan cycle
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub finished_at: DateTime<Utc>,
    pub wallets: usize,
    pub alerts: usize,
}

/// Point-in-time view for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub backend: BackendKind,
    pub policy: AlertPolicy,
    /// `None` while a scan holds the engine
    pub engine: Option<EngineStats>,
    pub last_scan: Option<ScanReport>,
    pub discovery_enabled: bool,
}

/// Main monitoring state
pub struct MonitoringState {
    engine: Mutex<MonitorEngine>,
    backend_kind: BackendKind,
    policy: AlertPolicy,
    discovery: DiscoveryEngine,
    feed: Option<WhaleFeed>,
    store: WatchListStore,
    notifier: Arc<CompositeNotifier>,
    pub config: Arc<AppConfig>,
    last_scan: RwLock<Option<ScanReport>>,
}

impl MonitoringState {
    /// Wire components together; performs no I/O
    pub fn new(
        config: Arc<AppConfig>,
        backend: Arc<dyn ChainBackend>,
        oracle: Arc<dyn PriceOracle>,
        notifier: Arc<CompositeNotifier>,
    ) -> Self {
        let engine = MonitorEngine::from_config(backend.clone(), &config.monitor);
        let discovery = DiscoveryEngine::from_config(backend.clone(), oracle, &config.discovery);

        Self {
            backend_kind: backend.kind(),
            policy: engine.policy(),
            engine: Mutex::new(engine),
            discovery,
            feed: None,
            store: WatchListStore::new(config.watchlist.path.clone()),
            notifier,
            config,
            last_scan: RwLock::new(None),
        }
    }

    /// Also poll an external whale list when discovery runs
    pub fn with_feed(mut self, feed: WhaleFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn has_feed(&self) -> bool {
        self.feed.is_some()
    }

    /// Whether anything can fill the watch list besides manual adds
    pub fn discovery_enabled(&self) -> bool {
        self.config.discovery_configured() || self.feed.is_some()
    }

    /// Load the watch list, check connectivity and announce startup.
    ///
    /// Seed wallets from configuration are unioned into the persisted list.
    /// Fails when there is nothing to monitor and no discovery to fill the
    /// list.
    pub async fn start(&self) -> AppResult<usize> {
        let mut engine = self.engine.lock().await;

        let persisted = self.store.load();
        let (wallets, seeded) = merge_watchlist(&persisted, &self.config.monitor.wallets);
        if seeded.changed() {
            self.store.save(&wallets)?;
            tracing::info!(seeded = seeded.added.len(), "Added configured wallets to watch list");
        }

        if wallets.is_empty() && !self.discovery_enabled() {
            return Err(AppError::Validation(
                "watch list is empty and discovery is not configured".to_string(),
            ));
        }

        engine.update_wallets(&wallets);
        let backend = engine.backend();
        drop(engine);

        match backend.head_block().await {
            Some(head) => {
                tracing::info!(
                    backend = %self.backend_kind,
                    head_block = head,
                    "Chain backend reachable"
                )
            }
            None => {
                tracing::warn!(
                    backend = %self.backend_kind,
                    "Chain backend not reachable, scans will degrade"
                );
                self.notifier
                    .notify(NotificationEvent::BackendUnavailable {
                        backend: self.backend_kind.to_string(),
                    })
                    .await;
            }
        }

        self.notifier
            .notify(NotificationEvent::MonitorStarted {
                wallets: wallets.len(),
                backend: self.backend_kind.to_string(),
                policy: self.policy.to_string(),
            })
            .await;

        Ok(wallets.len())
    }

    /// Reload the watch list, scan every wallet and notify alerts
    pub async fn run_scan_cycle(&self) -> Vec<Alert> {
        let (alerts, wallets) = {
            let mut engine = self.engine.lock().await;
            engine.update_wallets(&self.store.load());
            let alerts = engine.scan().await;
            (alerts, engine.wallets().len())
        };

        for alert in &alerts {
            self.notifier
                .notify(NotificationEvent::TokenPurchase {
                    alert: alert.clone(),
                    label: self.config.wallet_label(&alert.wallet).map(str::to_string),
                })
                .await;
        }

        *self.last_scan.write() = Some(ScanReport {
            finished_at: Utc::now(),
            wallets,
            alerts: alerts.len(),
        });

        alerts
    }

    /// Add one wallet: persist first, then inform the engine.
    ///
    /// Returns `false` when the wallet was already watched.
    pub async fn add_wallet(&self, raw: &str) -> AppResult<bool> {
        let address = normalize_address(raw)
            .ok_or_else(|| AppError::Validation(format!("invalid wallet address: {}", raw)))?;

        let mut engine = self.engine.lock().await;
        let mut wallets = self.store.load();
        let added = !wallets.contains(&address);
        if added {
            wallets.push(address.clone());
            self.store.save(&wallets)?;
        }
        engine.add_wallet(&address);

        Ok(added)
    }

    /// Remove one wallet: persist first, then inform the engine.
    ///
    /// Returns `false` when the wallet was not watched.
    pub async fn remove_wallet(&self, raw: &str) -> AppResult<bool> {
        let address = normalize_address(raw)
            .ok_or_else(|| AppError::Validation(format!("invalid wallet address: {}", raw)))?;

        let mut engine = self.engine.lock().await;
        let mut wallets = self.store.load();
        let before = wallets.len();
        wallets.retain(|w| w != &address);
        let removed = wallets.len() != before;
        if removed {
            self.store.save(&wallets)?;
        }
        let was_watched = engine.remove_wallet(&address);

        Ok(removed || was_watched)
    }

    /// Run discovery on the configured token and merge the result
    pub async fn run_discovery(&self) -> AppResult<MergeResult> {
        let discovery = &self.config.discovery;
        let token = discovery
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Validation("discovery token not configured".to_string()))?;

        let found = self
            .discovery
            .discover(
                token,
                discovery.min_hold_days,
                discovery.profit_multiplier,
                discovery.max_wallets,
            )
            .await;

        self.merge_discovered(token, &found).await
    }

    /// Fetch the external whale list and merge it
    pub async fn run_feed(&self) -> AppResult<MergeResult> {
        let feed = self
            .feed
            .as_ref()
            .ok_or_else(|| AppError::Validation("whale feed not configured".to_string()))?;

        let found = feed.fetch().await;
        self.merge_discovered("whale feed", &found).await
    }

    /// Union discovered wallets into the watch list.
    ///
    /// `source` names where they came from: a screened token or the feed.
    pub async fn merge_discovered(&self, source: &str, found: &[String]) -> AppResult<MergeResult> {
        let result = {
            let mut engine = self.engine.lock().await;
            let existing = self.store.load();
            let (merged, result) = merge_watchlist(&existing, found);
            if result.changed() {
                self.store.save(&merged)?;
            }
            engine.update_wallets(&merged);
            result
        };

        tracing::info!(
            source = %source,
            found = found.len(),
            added = result.added.len(),
            total = result.total,
            "Merged discovered wallets"
        );

        if result.changed() {
            self.notifier
                .notify(NotificationEvent::WalletsDiscovered {
                    source: source.to_string(),
                    wallets: result.added.clone(),
                })
                .await;
        }

        Ok(result)
    }

    pub async fn wallets(&self) -> Vec<String> {
        self.engine.lock().await.wallets().to_vec()
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            backend: self.backend_kind,
            policy: self.policy,
            engine: self.engine.try_lock().ok().map(|engine| engine.stats()),
            last_scan: self.last_scan.read().clone(),
            discovery_enabled: self.discovery_enabled(),
        }
    }
}
