//! Whale Sentinel Library
//!
//! Watches EVM wallets for first-time token purchases and discovers new
//! wallets worth watching. This library exposes core modules for testing.

pub mod backend;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod monitoring;
pub mod notifications;
pub mod oracle;
pub mod watchlist;

// Re-export commonly used types for tests
pub use backend::{select_backend, BackendKind, ChainBackend};
pub use config::AppConfig;
pub use discovery::{DiscoveryCandidate, DiscoveryEngine};
pub use engine::MonitorEngine;
pub use error::{AppError, AppResult, BackendError};
pub use models::{Alert, AlertKind, AlertPolicy, TransferEvent, TransferPage, WatchedWallet};
pub use monitoring::MonitoringState;
pub use notifications::{CompositeNotifier, NotificationEvent, NotificationService};
pub use oracle::PriceOracle;
pub use watchlist::{merge_watchlist, MergeResult, WatchListStore};
