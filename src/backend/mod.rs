//! Chain data backends
//!
//! Three interchangeable sources of ERC-20 transfer data:
//! - [`RpcLogBackend`]: raw JSON-RPC (`eth_getLogs`, `eth_call`)
//! - [`ContractBackend`]: typed ethers contract bindings
//! - [`ExplorerBackend`]: Etherscan-compatible REST API
//!
//! Callers only see [`ChainBackend`]. Every method swallows transport
//! failures and returns an empty page, a zero balance or the token address
//! as symbol, so an outage delays alerts instead of stopping a scan.

pub mod abi;
mod contract;
mod explorer;
mod rpc;
pub mod symbol;

pub use contract::ContractBackend;
pub use explorer::ExplorerBackend;
pub use rpc::{JsonRpcClient, RpcLogBackend};
pub use symbol::{resolve_symbol, ResolvedSymbol, SymbolCache};

use ethers::types::U256;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{non_empty, BackendConfig};
use crate::error::{AppError, AppResult, BackendError, BackendResult};
use crate::models::{TransferEvent, TransferPage};

/// Which backend variant is serving requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    RpcLogs,
    Contract,
    Explorer,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::RpcLogs => write!(f, "rpc_logs"),
            BackendKind::Contract => write!(f, "contract"),
            BackendKind::Explorer => write!(f, "explorer"),
        }
    }
}

/// Source of on-chain ERC-20 data
#[async_trait::async_trait]
pub trait ChainBackend: Send + Sync {
    /// Variant identifier, for logging and health output
    fn kind(&self) -> BackendKind;

    /// Current chain head, if the backend can report it
    async fn head_block(&self) -> Option<u64>;

    /// Transfers into `wallet` from `since_block` onward (bounded window)
    async fn fetch_transfers(&self, wallet: &str, since_block: Option<u64>) -> TransferPage;

    /// Current `token` balance of `wallet`; zero on failure
    async fn get_balance(&self, wallet: &str, token: &str) -> U256;

    /// Best-effort token symbol; the token address on failure
    async fn get_symbol(&self, token: &str) -> String;

    /// Earliest transfers of `token`, oldest first, at most `limit`
    async fn fetch_token_transfers(&self, token: &str, limit: usize) -> Vec<TransferEvent>;
}

/// Block range for a wallet scan: from `max(since, head - window)` to `head`.
///
/// Returns `None` when the bookmark is already past the head.
pub fn scan_window(head: u64, since_block: Option<u64>, window: u64) -> Option<(u64, u64)> {
    let floor = head.saturating_sub(window);
    let from = since_block.map_or(floor, |since| since.max(floor));
    if from > head {
        None
    } else {
        Some((from, head))
    }
}

/// Narrow `[lo, hi]` by bisection to a span shorter than `granularity`
/// that starts at or before the first block holding a matching log.
///
/// `has_logs(from, to)` reports whether `from..=to` holds any. Returns
/// `None` when the whole range holds none.
pub async fn locate_first_block<F, Fut>(
    mut lo: u64,
    mut hi: u64,
    granularity: u64,
    mut has_logs: F,
) -> BackendResult<Option<u64>>
where
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = BackendResult<bool>>,
{
    if lo > hi || !has_logs(lo, hi).await? {
        return Ok(None);
    }

    let granularity = granularity.max(1);
    while hi - lo >= granularity {
        let mid = lo + (hi - lo) / 2;
        if has_logs(lo, mid).await? {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    Ok(Some(lo))
}

/// Build an HTTP client with the configured per-call timeout
pub(crate) fn http_client(timeout_ms: u64) -> BackendResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(BackendError::from)
}

/// Select a backend by configuration precedence: rpc → contract → explorer.
///
/// Construction performs no network I/O.
pub fn select_backend(config: &BackendConfig) -> AppResult<Arc<dyn ChainBackend>> {
    if non_empty(&config.rpc_url) {
        let url = config.rpc_url.clone().unwrap_or_default();
        tracing::info!(kind = %BackendKind::RpcLogs, "Selected chain backend");
        return Ok(Arc::new(RpcLogBackend::new(&url, config)?));
    }

    if non_empty(&config.provider_url) {
        let url = config.provider_url.clone().unwrap_or_default();
        tracing::info!(kind = %BackendKind::Contract, "Selected chain backend");
        return Ok(Arc::new(ContractBackend::new(&url, config)?));
    }

    if non_empty(&config.explorer_api_key) {
        let key = config.explorer_api_key.clone().unwrap_or_default();
        tracing::info!(
            kind = %BackendKind::Explorer,
            url = %config.explorer_url,
            "Selected chain backend"
        );
        return Ok(Arc::new(ExplorerBackend::new(&config.explorer_url, &key, config)?));
    }

    Err(AppError::Validation(
        "no chain backend configured".to_string(),
    ))
}
