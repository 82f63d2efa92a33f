//! Configuration management for Whale Sentinel
//!
//! Loads configuration from YAML files and environment variables.
//! Environment variables override YAML values.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::AlertPolicy;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chain data backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Monitor engine configuration
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Wallet discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Price oracle configuration
    #[serde(default)]
    pub price: PriceConfig,
    /// Watch-list file configuration
    #[serde(default)]
    pub watchlist: WatchListConfig,
    /// Notification configuration
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Chain data backend configuration
///
/// The first configured variant wins: `rpc_url`, then `provider_url`,
/// then `explorer_api_key`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// JSON-RPC endpoint used for raw log queries
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// JSON-RPC endpoint used by the typed contract client
    #[serde(default)]
    pub provider_url: Option<String>,
    /// Etherscan-compatible explorer API base URL
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    /// Explorer API key
    #[serde(default)]
    pub explorer_api_key: Option<String>,
    /// Per-call network timeout in milliseconds
    #[serde(default = "default_backend_timeout")]
    pub timeout_ms: u64,
    /// Maximum number of blocks requested per wallet scan
    #[serde(default = "default_block_window")]
    pub block_window: u64,
    /// Rows per explorer page
    #[serde(default = "default_explorer_page_size")]
    pub explorer_page_size: usize,
    /// Maximum explorer pages read per wallet scan
    #[serde(default = "default_explorer_max_pages")]
    pub explorer_max_pages: u32,
    /// Block span of one `eth_getLogs` request when walking token history
    #[serde(default = "default_log_chunk_size")]
    pub log_chunk_size: u64,
    /// Maximum number of log chunks walked per token history request
    #[serde(default = "default_max_log_chunks")]
    pub max_log_chunks: u32,
    /// First block inspected when walking token history over RPC.
    /// Zero means locate the token's first transfer by bisection.
    #[serde(default)]
    pub discovery_start_block: u64,
}

fn default_explorer_url() -> String {
    "https://api.etherscan.io/api".to_string()
}

fn default_backend_timeout() -> u64 {
    10_000
}

fn default_block_window() -> u64 {
    1000
}

fn default_explorer_page_size() -> usize {
    10
}

fn default_explorer_max_pages() -> u32 {
    10
}

fn default_log_chunk_size() -> u64 {
    5000
}

fn default_max_log_chunks() -> u32 {
    20
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            provider_url: None,
            explorer_url: default_explorer_url(),
            explorer_api_key: None,
            timeout_ms: default_backend_timeout(),
            block_window: default_block_window(),
            explorer_page_size: default_explorer_page_size(),
            explorer_max_pages: default_explorer_max_pages(),
            log_chunk_size: default_log_chunk_size(),
            max_log_chunks: default_max_log_chunks(),
            discovery_start_block: 0,
        }
    }
}

impl BackendConfig {
    /// Whether at least one backend variant can be constructed
    pub fn has_any_backend(&self) -> bool {
        non_empty(&self.rpc_url)
            || non_empty(&self.provider_url)
            || non_empty(&self.explorer_api_key)
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Monitor engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between scan cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Alerting policy for newly seen tokens
    #[serde(default)]
    pub alert_policy: AlertPolicy,
    /// Hold period before a pending position is confirmed (seconds)
    #[serde(default = "default_hold_period")]
    pub hold_period_secs: i64,
    /// Seed wallets, unioned with the persisted watch list at startup
    #[serde(default)]
    pub wallets: Vec<String>,
    /// Human-readable labels shown next to a wallet in alerts
    #[serde(default)]
    pub wallet_labels: HashMap<String, String>,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_hold_period() -> i64 {
    3600
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            alert_policy: AlertPolicy::default(),
            hold_period_secs: default_hold_period(),
            wallets: Vec::new(),
            wallet_labels: HashMap::new(),
        }
    }
}

/// Wallet discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Enable the periodic discovery task
    #[serde(default)]
    pub enabled: bool,
    /// Token used to screen for early profitable holders
    #[serde(default)]
    pub token: Option<String>,
    /// Seconds between discovery runs
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Minimum days a candidate must have held the token
    #[serde(default = "default_min_hold_days")]
    pub min_hold_days: u32,
    /// Minimum current/historical price ratio
    #[serde(default = "default_profit_multiplier")]
    pub profit_multiplier: f64,
    /// Maximum wallets returned per run
    #[serde(default = "default_max_wallets")]
    pub max_wallets: usize,
    /// Number of earliest transfers sampled
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// External whale list endpoint, polled alongside token screening
    #[serde(default)]
    pub feed_url: Option<String>,
    /// API key sent to the whale list endpoint
    #[serde(default)]
    pub feed_api_key: Option<String>,
}

fn default_refresh_interval() -> u64 {
    86_400
}

fn default_min_hold_days() -> u32 {
    20
}

fn default_profit_multiplier() -> f64 {
    10.0
}

fn default_max_wallets() -> usize {
    10
}

fn default_sample_size() -> usize {
    100
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            refresh_interval_secs: default_refresh_interval(),
            min_hold_days: default_min_hold_days(),
            profit_multiplier: default_profit_multiplier(),
            max_wallets: default_max_wallets(),
            sample_size: default_sample_size(),
            feed_url: None,
            feed_api_key: None,
        }
    }
}

/// Price oracle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PriceConfig {
    /// DefiLlama coins API base URL
    #[serde(default = "default_price_api_url")]
    pub api_url: String,
    /// Chain prefix used in coin identifiers
    #[serde(default = "default_price_chain")]
    pub chain: String,
    /// Tolerance window for historical lookups (seconds)
    #[serde(default = "default_search_width")]
    pub search_width_secs: u64,
    /// Current-price cache TTL (seconds)
    #[serde(default = "default_price_cache_ttl")]
    pub cache_ttl_secs: i64,
}

fn default_price_api_url() -> String {
    "https://coins.llama.fi".to_string()
}

fn default_price_chain() -> String {
    "ethereum".to_string()
}

fn default_search_width() -> u64 {
    14_400
}

fn default_price_cache_ttl() -> i64 {
    60
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            api_url: default_price_api_url(),
            chain: default_price_chain(),
            search_width_secs: default_search_width(),
            cache_ttl_secs: default_price_cache_ttl(),
        }
    }
}

/// Watch-list file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatchListConfig {
    /// Path of the JSON watch-list file
    #[serde(default = "default_watchlist_path")]
    pub path: PathBuf,
}

fn default_watchlist_path() -> PathBuf {
    PathBuf::from("tracked_wallets.json")
}

impl Default for WatchListConfig {
    fn default() -> Self {
        Self {
            path: default_watchlist_path(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    /// Telegram notification settings
    #[serde(default)]
    pub telegram: TelegramNotificationConfig,
}

/// Telegram-specific notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramNotificationConfig {
    /// Whether Telegram notifications are enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bot token (also read from TELEGRAM_BOT_TOKEN)
    #[serde(default)]
    pub bot_token: String,
    /// Chat ID to send notifications to (also read from TELEGRAM_CHAT_ID)
    #[serde(default)]
    pub chat_id: String,
    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

fn default_true() -> bool {
    true
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramNotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: String::new(),
            chat_id: String::new(),
            api_url: default_telegram_api_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (SENTINEL_*)
    /// 2. config/config.yaml (if exists)
    /// 3. config.yaml (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("monitor.poll_interval_secs", 60)?
            .set_default("monitor.hold_period_secs", 3600)?
            .set_default("watchlist.path", "tracked_wallets.json")?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config/config").required(false))
            // SENTINEL_MONITOR__POLL_INTERVAL_SECS=30 -> monitor.poll_interval_secs = 30
            // SENTINEL_MONITOR__WALLETS=0xabc,0xdef -> monitor.wallets = [..]
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("monitor.wallets"),
            )
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;
        app.apply_legacy_env();
        Ok(app)
    }

    /// Fill Telegram credentials from the conventional bot variables
    fn apply_legacy_env(&mut self) {
        let telegram = &mut self.notifications.telegram;
        if telegram.bot_token.is_empty() {
            if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
                telegram.bot_token = token;
            }
        }
        if telegram.chat_id.is_empty() {
            if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
                telegram.chat_id = chat_id;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let telegram = &self.notifications.telegram;
        if telegram.enabled && (telegram.bot_token.is_empty() || telegram.chat_id.is_empty()) {
            return Err(ConfigError::Message(
                "Telegram bot token and chat id must be set (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID)"
                    .to_string(),
            ));
        }

        if !self.backend.has_any_backend() {
            return Err(ConfigError::Message(
                "No chain backend configured: set backend.rpc_url, \
                 backend.provider_url or backend.explorer_api_key"
                    .to_string(),
            ));
        }

        if self.monitor.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "monitor.poll_interval_secs must be positive".to_string(),
            ));
        }

        if self.monitor.alert_policy == AlertPolicy::Hold && self.monitor.hold_period_secs <= 0 {
            return Err(ConfigError::Message(
                "monitor.hold_period_secs must be positive for the hold policy".to_string(),
            ));
        }

        if self.discovery.enabled {
            if !non_empty(&self.discovery.token) && !non_empty(&self.discovery.feed_url) {
                return Err(ConfigError::Message(
                    "discovery.token or discovery.feed_url must be set when discovery is enabled"
                        .to_string(),
                ));
            }
            if self.discovery.profit_multiplier <= 0.0 {
                return Err(ConfigError::Message(
                    "discovery.profit_multiplier must be positive".to_string(),
                ));
            }
            if self.discovery.refresh_interval_secs == 0 {
                return Err(ConfigError::Message(
                    "discovery.refresh_interval_secs must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Whether token screening can run
    pub fn discovery_configured(&self) -> bool {
        self.discovery.enabled && non_empty(&self.discovery.token)
    }

    /// Whether the external whale list is polled
    pub fn feed_configured(&self) -> bool {
        self.discovery.enabled && non_empty(&self.discovery.feed_url)
    }

    /// Label for a wallet, matched case-insensitively
    pub fn wallet_label(&self, wallet: &str) -> Option<&str> {
        self.monitor
            .wallet_labels
            .iter()
            .find(|(address, _)| address.eq_ignore_ascii_case(wallet))
            .map(|(_, label)| label.as_str())
    }
}
