//! Typed contract backend
//!
//! Uses ethers bindings generated from a minimal ERC-20 ABI. Wallet transfers
//! come from `eth_getLogs` through the provider; views go through the typed
//! contract. Every call is bounded by the configured timeout.

use ethers::contract::abigen;
use ethers::providers::{Http, Middleware, Provider, RpcError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Filter, Log, TransactionRequest, H256, U256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::abi::decode_symbol;
use super::symbol::{cached_symbol, SymbolCache};
use super::{locate_first_block, scan_window, BackendKind, ChainBackend};
use crate::config::BackendConfig;
use crate::constants::erc20::{SYMBOL_SELECTOR, TRANSFER_TOPIC};
use crate::error::{BackendError, BackendResult};
use crate::models::{TransferEvent, TransferPage};

abigen!(
    Erc20,
    r#"[
        function symbol() external view returns (string)
        function balanceOf(address account) external view returns (uint256)
    ]"#
);

pub struct ContractBackend {
    provider: Arc<Provider<Http>>,
    symbols: SymbolCache,
    timeout: Duration,
    block_window: u64,
    log_chunk_size: u64,
    max_log_chunks: u32,
    history_start_block: u64,
}

impl ContractBackend {
    pub fn new(url: &str, config: &BackendConfig) -> BackendResult<Self> {
        let provider = Provider::<Http>::try_from(url)
            .map_err(|e| BackendError::Contract(format!("invalid provider url {}: {}", url, e)))?;

        Ok(Self {
            provider: Arc::new(provider),
            symbols: SymbolCache::default(),
            timeout: Duration::from_millis(config.timeout_ms),
            block_window: config.block_window,
            log_chunk_size: config.log_chunk_size.max(1),
            max_log_chunks: config.max_log_chunks,
            history_start_block: config.discovery_start_block,
        })
    }

    /// Decode a provider log into a transfer; timestamp left at zero
    pub fn parse_log(log: &Log) -> Option<TransferEvent> {
        let transfer_topic: H256 = TRANSFER_TOPIC.parse().ok()?;
        if log.topics.len() != 3 || log.topics[0] != transfer_topic || log.data.len() < 32 {
            return None;
        }

        Some(TransferEvent {
            token: format!("{:?}", log.address),
            from: format!("{:?}", Address::from(log.topics[1])),
            to: format!("{:?}", Address::from(log.topics[2])),
            amount: U256::from_big_endian(&log.data[..32]),
            tx_hash: format!("{:?}", log.transaction_hash?),
            block_number: log.block_number?.as_u64(),
            timestamp: 0,
        })
    }

    async fn bounded<T, E, F>(&self, what: &str, call: F) -> BackendResult<T>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| BackendError::Contract(format!("{}: {}", what, e))),
            Err(_) => Err(BackendError::Contract(format!("{} timed out", what))),
        }
    }

    fn parse_address(value: &str) -> BackendResult<Address> {
        value
            .parse()
            .map_err(|_| BackendError::Malformed(format!("invalid address {}", value)))
    }

    async fn chain_head(&self) -> BackendResult<u64> {
        let head = self
            .bounded("eth_blockNumber", self.provider.get_block_number())
            .await?;
        Ok(head.as_u64())
    }

    async fn decode_logs(&self, logs: &[Log], limit: usize) -> Vec<TransferEvent> {
        let mut timestamps: HashMap<u64, i64> = HashMap::new();
        let mut events = Vec::new();

        for log in logs {
            if events.len() >= limit {
                break;
            }
            let Some(mut event) = Self::parse_log(log) else {
                continue;
            };
            let timestamp = match timestamps.get(&event.block_number) {
                Some(ts) => *ts,
                None => {
                    let ts = self.block_timestamp(event.block_number).await;
                    timestamps.insert(event.block_number, ts);
                    ts
                }
            };
            event.timestamp = timestamp;
            events.push(event);
        }

        events
    }

    async fn block_timestamp(&self, block: u64) -> i64 {
        match self.bounded("eth_getBlockByNumber", self.provider.get_block(block)).await {
            Ok(Some(header)) => header.timestamp.as_u64() as i64,
            Ok(None) => {
                tracing::debug!(block = block, "Block not found, using observation time");
                chrono::Utc::now().timestamp()
            }
            Err(e) => {
                tracing::debug!(
                    block = block,
                    error = %e,
                    "Block timestamp unavailable, using observation time"
                );
                chrono::Utc::now().timestamp()
            }
        }
    }

    fn transfer_filter() -> BackendResult<Filter> {
        let topic: H256 = TRANSFER_TOPIC
            .parse()
            .map_err(|_| BackendError::Malformed("transfer topic".to_string()))?;
        Ok(Filter::new().topic0(topic))
    }

    async fn try_fetch_transfers(
        &self,
        wallet: &str,
        since_block: Option<u64>,
    ) -> BackendResult<TransferPage> {
        let recipient = Self::parse_address(wallet)?;
        let head = self.chain_head().await?;
        let Some((from, to)) = scan_window(head, since_block, self.block_window) else {
            return Ok(TransferPage {
                events: Vec::new(),
                head_block: Some(head),
            });
        };

        let filter = Self::transfer_filter()?
            .topic2(H256::from(recipient))
            .from_block(from)
            .to_block(to);
        let logs = self.bounded("eth_getLogs", self.provider.get_logs(&filter)).await?;

        Ok(TransferPage {
            events: self.decode_logs(&logs, usize::MAX).await,
            head_block: Some(head),
        })
    }

    async fn try_fetch_token_transfers(
        &self,
        token: &str,
        limit: usize,
    ) -> BackendResult<Vec<TransferEvent>> {
        let contract = Self::parse_address(token)?;
        let head = self.chain_head().await?;
        let mut from = match self.history_start_block {
            0 => {
                let first = locate_first_block(0, head, self.log_chunk_size, move |from, to| {
                    self.has_transfers(contract, from, to)
                })
                .await?;
                match first {
                    Some(block) => block,
                    None => return Ok(Vec::new()),
                }
            }
            start => start,
        };
        tracing::debug!(token = token, from_block = from, "Walking token history");

        let mut chunks = 0u32;
        let mut events = Vec::new();

        while from <= head && chunks < self.max_log_chunks && events.len() < limit {
            let to = from.saturating_add(self.log_chunk_size - 1).min(head);
            let filter = Self::transfer_filter()?
                .address(contract)
                .from_block(from)
                .to_block(to);
            let logs = self.bounded("eth_getLogs", self.provider.get_logs(&filter)).await?;
            let remaining = limit - events.len();
            events.extend(self.decode_logs(&logs, remaining).await);

            from = to + 1;
            chunks += 1;
        }

        Ok(events)
    }

    /// Whether `from..=to` holds any transfer of `contract`
    async fn has_transfers(&self, contract: Address, from: u64, to: u64) -> BackendResult<bool> {
        let filter = Self::transfer_filter()?
            .address(contract)
            .from_block(from)
            .to_block(to);
        match tokio::time::timeout(self.timeout, self.provider.get_logs(&filter)).await {
            Ok(Ok(logs)) => Ok(!logs.is_empty()),
            // nodes answer oversized result sets with an error object
            Ok(Err(e)) if e.as_error_response().is_some() => Ok(true),
            Ok(Err(e)) => Err(BackendError::Contract(format!("eth_getLogs: {}", e))),
            Err(_) => Err(BackendError::Contract("eth_getLogs timed out".to_string())),
        }
    }

    async fn typed_symbol(&self, token: &str) -> BackendResult<String> {
        let contract = Erc20::new(Self::parse_address(token)?, self.provider.clone());
        let call = contract.symbol();
        self.bounded("symbol()", call.call()).await
    }

    async fn raw_symbol(&self, token: &str) -> BackendResult<String> {
        let selector: Bytes = SYMBOL_SELECTOR
            .parse()
            .map_err(|_| BackendError::Malformed("symbol selector".to_string()))?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(Self::parse_address(token)?)
            .data(selector)
            .into();
        let output = self.bounded("eth_call", self.provider.call(&tx, None)).await?;
        decode_symbol(&output)
            .ok_or_else(|| BackendError::Malformed("undecodable symbol() output".to_string()))
    }

    async fn try_get_balance(&self, wallet: &str, token: &str) -> BackendResult<U256> {
        let contract = Erc20::new(Self::parse_address(token)?, self.provider.clone());
        let call = contract.balance_of(Self::parse_address(wallet)?);
        self.bounded("balanceOf()", call.call()).await
    }
}

#[async_trait::async_trait]
impl ChainBackend for ContractBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Contract
    }

    async fn head_block(&self) -> Option<u64> {
        match self.chain_head().await {
            Ok(head) => Some(head),
            Err(e) => {
                tracing::warn!(error = %e, backend = %self.kind(), "Failed to read chain head");
                None
            }
        }
    }

    async fn fetch_transfers(&self, wallet: &str, since_block: Option<u64>) -> TransferPage {
        match self.try_fetch_transfers(wallet, since_block).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    wallet = wallet,
                    error = %e,
                    backend = %self.kind(),
                    "Failed to fetch transfers"
                );
                TransferPage::empty()
            }
        }
    }

    async fn get_balance(&self, wallet: &str, token: &str) -> U256 {
        match self.try_get_balance(wallet, token).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(
                    wallet = wallet,
                    token = token,
                    error = %e,
                    "Failed to read balance"
                );
                U256::zero()
            }
        }
    }

    async fn get_symbol(&self, token: &str) -> String {
        cached_symbol(
            &self.symbols,
            token,
            self.typed_symbol(token),
            self.raw_symbol(token),
        )
        .await
    }

    async fn fetch_token_transfers(&self, token: &str, limit: usize) -> Vec<TransferEvent> {
        match self.try_fetch_token_transfers(token, limit).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(
                    token = token,
                    error = %e,
                    backend = %self.kind(),
                    "Failed to fetch token history"
                );
                Vec::new()
            }
        }
    }
}
