//! Raw JSON-RPC backend
//!
//! Talks to any Ethereum JSON-RPC endpoint with plain `reqwest` POSTs:
//! `eth_blockNumber`, `eth_getLogs` filtered on the ERC-20 `Transfer` topic,
//! `eth_getBlockByNumber` for timestamps and `eth_call` for views.

use chrono::Utc;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, U256};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::abi::{
    address_from_topic, address_topic, decode_symbol_hex, encode_balance_of, encode_symbol,
    parse_hex_u256, parse_hex_u64,
};
use super::contract::Erc20;
use super::symbol::{cached_symbol, SymbolCache};
use super::{http_client, locate_first_block, scan_window, BackendKind, ChainBackend};
use crate::config::BackendConfig;
use crate::constants::erc20::TRANSFER_TOPIC;
use crate::error::{BackendError, BackendResult};
use crate::models::{TransferEvent, TransferPage};

/// Minimal JSON-RPC 2.0 client
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: &str, timeout_ms: u64) -> BackendResult<Self> {
        Ok(Self {
            client: http_client(timeout_ms)?,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC request and return its `result`
    pub async fn call(&self, method: &str, params: Value) -> BackendResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload: Value = response.json().await?;

        if let Some(error) = payload.get("error") {
            return Err(BackendError::Rpc {
                code: error["code"].as_i64().unwrap_or_default(),
                message: error["message"].as_str().unwrap_or("unknown").to_string(),
            });
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| BackendError::Malformed(format!("{} response without result", method)))
    }

    pub async fn block_number(&self) -> BackendResult<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        result
            .as_str()
            .and_then(parse_hex_u64)
            .ok_or_else(|| BackendError::Malformed("eth_blockNumber".to_string()))
    }

    pub async fn get_logs(&self, filter: Value) -> BackendResult<Vec<Value>> {
        match self.call("eth_getLogs", json!([filter])).await? {
            Value::Array(logs) => Ok(logs),
            other => Err(BackendError::Malformed(format!("eth_getLogs returned {}", other))),
        }
    }

    pub async fn block_timestamp(&self, block: u64) -> BackendResult<i64> {
        let result = self
            .call("eth_getBlockByNumber", json!([format!("0x{:x}", block), false]))
            .await?;
        result["timestamp"]
            .as_str()
            .and_then(parse_hex_u64)
            .map(|ts| ts as i64)
            .ok_or_else(|| BackendError::Malformed(format!("block {} without timestamp", block)))
    }

    pub async fn eth_call(&self, to: &str, data: &str) -> BackendResult<String> {
        let result = self
            .call("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::Malformed("eth_call".to_string()))
    }
}

/// Backend that scans `Transfer` logs over raw JSON-RPC
pub struct RpcLogBackend {
    rpc: JsonRpcClient,
    /// Typed client on the same endpoint, used for the direct `symbol()` call
    typed: Option<Arc<Provider<Http>>>,
    symbols: SymbolCache,
    timeout: Duration,
    block_window: u64,
    log_chunk_size: u64,
    max_log_chunks: u32,
    history_start_block: u64,
}

impl RpcLogBackend {
    pub fn new(url: &str, config: &BackendConfig) -> BackendResult<Self> {
        let typed = match Provider::<Http>::try_from(url) {
            Ok(provider) => Some(Arc::new(provider)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Typed provider unavailable, symbol lookups use raw calls only"
                );
                None
            }
        };

        Ok(Self {
            rpc: JsonRpcClient::new(url, config.timeout_ms)?,
            typed,
            symbols: SymbolCache::default(),
            timeout: Duration::from_millis(config.timeout_ms),
            block_window: config.block_window,
            log_chunk_size: config.log_chunk_size.max(1),
            max_log_chunks: config.max_log_chunks,
            history_start_block: config.discovery_start_block,
        })
    }

    /// Decode one `eth_getLogs` entry.
    ///
    /// Returns the event (timestamp unset) and the block timestamp when the
    /// node includes it. ERC-721 transfers (four topics) are skipped.
    pub fn parse_log(log: &Value) -> Option<(TransferEvent, Option<i64>)> {
        let topics = log["topics"].as_array()?;
        if topics.len() != 3 || topics[0].as_str()? != TRANSFER_TOPIC {
            return None;
        }

        let event = TransferEvent {
            token: log["address"].as_str()?.to_ascii_lowercase(),
            from: address_from_topic(topics[1].as_str()?)?,
            to: address_from_topic(topics[2].as_str()?)?,
            amount: parse_hex_u256(log["data"].as_str()?)?,
            tx_hash: log["transactionHash"].as_str()?.to_ascii_lowercase(),
            block_number: parse_hex_u64(log["blockNumber"].as_str()?)?,
            timestamp: 0,
        };
        let timestamp = log["blockTimestamp"]
            .as_str()
            .and_then(parse_hex_u64)
            .map(|ts| ts as i64);

        Some((event, timestamp))
    }

    async fn decode_logs(&self, logs: &[Value], limit: usize) -> Vec<TransferEvent> {
        let mut known = HashMap::new();
        let mut events = Vec::new();

        for log in logs {
            if events.len() >= limit {
                break;
            }
            if let Some((event, timestamp)) = Self::parse_log(log) {
                if let Some(ts) = timestamp {
                    known.insert(event.block_number, ts);
                }
                events.push(event);
            }
        }

        for event in events.iter_mut() {
            if let Some(ts) = known.get(&event.block_number) {
                event.timestamp = *ts;
                continue;
            }
            let ts = match self.rpc.block_timestamp(event.block_number).await {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::debug!(
                        block = event.block_number,
                        error = %e,
                        "Block timestamp unavailable, using observation time"
                    );
                    Utc::now().timestamp()
                }
            };
            known.insert(event.block_number, ts);
            event.timestamp = ts;
        }

        events
    }

    async fn try_fetch_transfers(
        &self,
        wallet: &str,
        since_block: Option<u64>,
    ) -> BackendResult<TransferPage> {
        let head = self.rpc.block_number().await?;
        let Some((from, to)) = scan_window(head, since_block, self.block_window) else {
            return Ok(TransferPage {
                events: Vec::new(),
                head_block: Some(head),
            });
        };

        let filter = json!({
            "fromBlock": format!("0x{:x}", from),
            "toBlock": format!("0x{:x}", to),
            "topics": [TRANSFER_TOPIC, Value::Null, address_topic(wallet)],
        });
        let logs = self.rpc.get_logs(filter).await?;
        let events = self.decode_logs(&logs, usize::MAX).await;

        tracing::trace!(
            wallet = wallet,
            from_block = from,
            to_block = to,
            events = events.len(),
            "Scanned transfer logs"
        );

        Ok(TransferPage {
            events,
            head_block: Some(head),
        })
    }

    async fn try_fetch_token_transfers(
        &self,
        token: &str,
        limit: usize,
    ) -> BackendResult<Vec<TransferEvent>> {
        let head = self.rpc.block_number().await?;
        let mut from = match self.history_start_block {
            0 => {
                let first = locate_first_block(0, head, self.log_chunk_size, move |from, to| {
                    self.has_transfers(token, from, to)
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
            let logs = self.rpc.get_logs(transfer_filter(token, from, to)).await?;
            let remaining = limit - events.len();
            events.extend(self.decode_logs(&logs, remaining).await);

            from = to + 1;
            chunks += 1;
        }

        Ok(events)
    }

    /// Whether `from..=to` holds any transfer of `token`
    async fn has_transfers(&self, token: &str, from: u64, to: u64) -> BackendResult<bool> {
        match self.rpc.get_logs(transfer_filter(token, from, to)).await {
            Ok(logs) => Ok(!logs.is_empty()),
            // nodes answer oversized result sets with an error object
            Err(BackendError::Rpc { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }

    async fn typed_symbol(&self, token: &str) -> BackendResult<String> {
        let provider = self
            .typed
            .clone()
            .ok_or_else(|| BackendError::Contract("no typed provider".to_string()))?;
        let address: Address = token
            .parse()
            .map_err(|_| BackendError::Malformed(format!("invalid token address {}", token)))?;
        let contract = Erc20::new(address, provider);
        let call = contract.symbol();
        match tokio::time::timeout(self.timeout, call.call()).await {
            Ok(result) => result.map_err(|e| BackendError::Contract(e.to_string())),
            Err(_) => Err(BackendError::Contract("symbol() timed out".to_string())),
        }
    }

    async fn raw_symbol(&self, token: &str) -> BackendResult<String> {
        let output = self.rpc.eth_call(token, &encode_symbol()).await?;
        decode_symbol_hex(&output).ok_or_else(|| {
            BackendError::Malformed(format!("undecodable symbol() output {}", output))
        })
    }
}

fn transfer_filter(token: &str, from: u64, to: u64) -> Value {
    json!({
        "address": token,
        "fromBlock": format!("0x{:x}", from),
        "toBlock": format!("0x{:x}", to),
        "topics": [TRANSFER_TOPIC],
    })
}

#[async_trait::async_trait]
impl ChainBackend for RpcLogBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RpcLogs
    }

    async fn head_block(&self) -> Option<u64> {
        match self.rpc.block_number().await {
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
        let result = self.rpc.eth_call(token, &encode_balance_of(wallet)).await;
        match result.map(|out| parse_hex_u256(&out)) {
            Ok(Some(balance)) => balance,
            Ok(None) => {
                tracing::warn!(wallet = wallet, token = token, "Undecodable balanceOf output");
                U256::zero()
            }
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
