//! Notification service
//!
//! Pushes monitor events to Telegram:
//! - New token purchases and confirmed holds
//! - Wallets added by discovery
//! - Monitor startup
//! - Component failures

pub mod telegram;

pub use telegram::TelegramNotifier;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{Alert, AlertKind};

/// Alert level for notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Critical alerts (component down)
    Critical,
    /// Important alerts (purchases, backend trouble)
    Important,
    /// Informational alerts (startup, discovery summary)
    Info,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Critical => write!(f, "CRITICAL"),
            AlertLevel::Important => write!(f, "IMPORTANT"),
            AlertLevel::Info => write!(f, "INFO"),
        }
    }
}

/// Notification event types
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// A watched wallet bought (or confirmed holding) a new token
    TokenPurchase {
        alert: Alert,
        /// Operator-assigned wallet label
        label: Option<String>,
    },
    /// Discovery added wallets to the watch list
    WalletsDiscovered {
        /// Screened token address, or the whale feed
        source: String,
        wallets: Vec<String>,
    },
    /// Monitor started scanning
    MonitorStarted {
        wallets: usize,
        backend: String,
        policy: String,
    },
    /// Chain backend failed its connectivity check
    BackendUnavailable { backend: String },
    /// System component crashed
    SystemCrash { component: String },
}

impl NotificationEvent {
    /// Get the alert level for this event
    pub fn level(&self) -> AlertLevel {
        match self {
            NotificationEvent::SystemCrash { .. } => AlertLevel::Critical,
            NotificationEvent::TokenPurchase { .. } => AlertLevel::Important,
            NotificationEvent::BackendUnavailable { .. } => AlertLevel::Important,
            NotificationEvent::WalletsDiscovered { .. } => AlertLevel::Info,
            NotificationEvent::MonitorStarted { .. } => AlertLevel::Info,
        }
    }

    /// Format the event as a notification message (Telegram HTML)
    pub fn format_message(&self) -> String {
        match self {
            NotificationEvent::TokenPurchase { alert, label } => {
                let headline = match alert.kind {
                    AlertKind::FirstPurchase => "🚨 New token purchase detected!",
                    AlertKind::HoldConfirmed => "💎 New token held past hold period!",
                };
                let symbol = escape_html(&alert.symbol);
                let token_line = if alert.symbol.eq_ignore_ascii_case(&alert.token) {
                    format!("Token: {}", alert.token)
                } else {
                    format!("Token: {} ({})", symbol, alert.token)
                };
                let wallet_line = match label {
                    Some(label) => format!("Wallet: {} ({})", alert.wallet, escape_html(label)),
                    None => format!("Wallet: {}", alert.wallet),
                };
                format!(
                    "{}\n{}\n{}\nAmount: {}\nTx: {}",
                    headline,
                    wallet_line,
                    token_line,
                    alert.amount,
                    alert.tx_link()
                )
            }
            NotificationEvent::WalletsDiscovered { source, wallets } => {
                let list: Vec<String> = wallets.iter().map(|w| short_address(w)).collect();
                format!(
                    "🔍 Discovery via {}: {} new wallet(s)\n{}",
                    source,
                    wallets.len(),
                    list.join("\n")
                )
            }
            NotificationEvent::MonitorStarted {
                wallets,
                backend,
                policy,
            } => {
                format!(
                    "✅ Monitor started: {} wallet(s) via {} (policy: {})",
                    wallets, backend, policy
                )
            }
            NotificationEvent::BackendUnavailable { backend } => {
                format!("⚠️ Chain backend {} is not responding", backend)
            }
            NotificationEvent::SystemCrash { component } => {
                format!("🚨 System down: {}", component)
            }
        }
    }
}

/// `0x1234...abcd`
fn short_address(address: &str) -> String {
    match (address.get(..6), address.get(address.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if address.len() > 12 => format!("{}...{}", head, tail),
        _ => address.to_string(),
    }
}

/// Token symbols come from contracts and may contain markup
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Notification service trait
#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    /// Send a notification
    async fn notify(&self, event: NotificationEvent) -> anyhow::Result<()>;

    /// Check if the service is enabled
    fn is_enabled(&self) -> bool;
}

/// Composite notifier that can send to multiple services
pub struct CompositeNotifier {
    services: Vec<Arc<dyn NotificationService>>,
}

impl CompositeNotifier {
    /// Create a new composite notifier
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
        }
    }

    /// Add a notification service
    pub fn add_service(&mut self, service: Arc<dyn NotificationService>) {
        self.services.push(service);
    }

    /// Send notification to all enabled services; failures are only logged
    pub async fn notify(&self, event: NotificationEvent) {
        for service in &self.services {
            if service.is_enabled() {
                if let Err(e) = service.notify(event.clone()).await {
                    tracing::error!(
                        error = %e,
                        level = %event.level(),
                        "Failed to send notification"
                    );
                }
            }
        }
    }
}

impl Default for CompositeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
