//! Etherscan-compatible REST backend
//!
//! Wallet scans page through `tokentx` oldest first. When the page cap is
//! reached before the range is exhausted, the newest (possibly partial)
//! block is dropped and the scan reports the block before it as covered, so
//! the next scan resumes there.

use ethers::types::U256;
use serde_json::Value;

use super::abi::{decode_symbol_hex, encode_symbol, parse_hex_u64};
use super::symbol::{cached_symbol, SymbolCache};
use super::{http_client, scan_window, BackendKind, ChainBackend};
use crate::config::BackendConfig;
use crate::error::{BackendError, BackendResult};
use crate::models::{TransferEvent, TransferPage};

pub struct ExplorerBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    symbols: SymbolCache,
    page_size: usize,
    max_pages: u32,
    block_window: u64,
    history_start_block: u64,
}

impl ExplorerBackend {
    pub fn new(base_url: &str, api_key: &str, config: &BackendConfig) -> BackendResult<Self> {
        Ok(Self {
            client: http_client(config.timeout_ms)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            symbols: SymbolCache::default(),
            page_size: config.explorer_page_size.max(1),
            max_pages: config.explorer_max_pages.max(1),
            block_window: config.block_window,
            history_start_block: config.discovery_start_block,
        })
    }

    /// Decode one `tokentx` row
    pub fn parse_row(row: &Value) -> Option<TransferEvent> {
        Some(TransferEvent {
            token: row["contractAddress"].as_str()?.to_ascii_lowercase(),
            from: row["from"].as_str()?.to_ascii_lowercase(),
            to: row["to"].as_str()?.to_ascii_lowercase(),
            amount: U256::from_dec_str(row["value"].as_str()?).ok()?,
            tx_hash: row["hash"].as_str()?.to_ascii_lowercase(),
            block_number: row["blockNumber"].as_str()?.parse().ok()?,
            timestamp: row["timeStamp"].as_str()?.parse().ok()?,
        })
    }

    async fn get(&self, params: &[(&str, String)]) -> BackendResult<Value> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("apikey", self.api_key.clone()));

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Account module call; `status: "0"` with no rows is an empty list
    async fn account_rows(&self, params: &[(&str, String)]) -> BackendResult<Vec<Value>> {
        let payload = self.get(params).await?;
        match &payload["result"] {
            Value::Array(rows) => Ok(rows.clone()),
            other => {
                let message = payload["message"].as_str().unwrap_or_default();
                if message.starts_with("No transactions found") {
                    Ok(Vec::new())
                } else {
                    Err(BackendError::Explorer(format!("{}: {}", message, other)))
                }
            }
        }
    }

    async fn proxy(&self, params: &[(&str, String)]) -> BackendResult<String> {
        let payload = self.get(params).await?;
        if let Some(error) = payload.get("error") {
            return Err(BackendError::Rpc {
                code: error["code"].as_i64().unwrap_or_default(),
                message: error["message"].as_str().unwrap_or("unknown").to_string(),
            });
        }
        payload["result"]
            .as_str()
            .filter(|s| s.starts_with("0x"))
            .map(str::to_string)
            .ok_or_else(|| BackendError::Explorer(format!("proxy call failed: {}", payload)))
    }

    async fn chain_head(&self) -> BackendResult<u64> {
        let head = self
            .proxy(&[
                ("module", "proxy".to_string()),
                ("action", "eth_blockNumber".to_string()),
            ])
            .await?;
        parse_hex_u64(&head).ok_or_else(|| BackendError::Malformed(head))
    }

    async fn try_fetch_transfers(
        &self,
        wallet: &str,
        since_block: Option<u64>,
    ) -> BackendResult<TransferPage> {
        let head = match self.chain_head().await {
            Ok(head) => Some(head),
            Err(e) => {
                tracing::debug!(error = %e, "Explorer head unavailable, scanning from bookmark");
                None
            }
        };
        let start_block = match head {
            Some(head) => match scan_window(head, since_block, self.block_window) {
                Some((from, _)) => from,
                None => {
                    return Ok(TransferPage {
                        events: Vec::new(),
                        head_block: Some(head),
                    })
                }
            },
            None => since_block.unwrap_or_default(),
        };

        let mut params = vec![
            ("module", "account".to_string()),
            ("action", "tokentx".to_string()),
            ("address", wallet.to_string()),
            ("startblock", start_block.to_string()),
            ("offset", self.page_size.to_string()),
            ("sort", "asc".to_string()),
        ];
        if let Some(head) = head {
            params.push(("endblock", head.to_string()));
        }

        let mut events = Vec::new();
        let mut exhausted = false;
        for page in 1..=self.max_pages {
            let mut query = params.clone();
            query.push(("page", page.to_string()));
            let rows = self.account_rows(&query).await?;
            events.extend(rows.iter().filter_map(Self::parse_row));
            if rows.len() < self.page_size {
                exhausted = true;
                break;
            }
        }

        let covered = if exhausted {
            head
        } else {
            let newest = truncate_partial_block(&mut events);
            tracing::debug!(
                wallet = wallet,
                covered_to = ?newest,
                "Explorer page cap reached, resuming next scan"
            );
            newest
        };

        let wallet = wallet.to_ascii_lowercase();
        events.retain(|event| event.to == wallet);

        Ok(TransferPage {
            events,
            head_block: covered,
        })
    }

    async fn try_get_balance(&self, wallet: &str, token: &str) -> BackendResult<U256> {
        let payload = self
            .get(&[
                ("module", "account".to_string()),
                ("action", "tokenbalance".to_string()),
                ("contractaddress", token.to_string()),
                ("address", wallet.to_string()),
                ("tag", "latest".to_string()),
            ])
            .await?;
        let raw = payload["result"].as_str().unwrap_or_default();
        U256::from_dec_str(raw)
            .map_err(|_| BackendError::Explorer(format!("tokenbalance returned {}", payload)))
    }

    /// Symbol as reported on the token's first indexed transfer
    async fn indexed_symbol(&self, token: &str) -> BackendResult<String> {
        let rows = self
            .account_rows(&[
                ("module", "account".to_string()),
                ("action", "tokentx".to_string()),
                ("contractaddress", token.to_string()),
                ("page", "1".to_string()),
                ("offset", "1".to_string()),
                ("sort", "asc".to_string()),
            ])
            .await?;
        rows.first()
            .and_then(|row| row["tokenSymbol"].as_str())
            .map(str::to_string)
            .ok_or_else(|| BackendError::Explorer(format!("no indexed symbol for {}", token)))
    }

    async fn raw_symbol(&self, token: &str) -> BackendResult<String> {
        let output = self
            .proxy(&[
                ("module", "proxy".to_string()),
                ("action", "eth_call".to_string()),
                ("to", token.to_string()),
                ("data", encode_symbol()),
                ("tag", "latest".to_string()),
            ])
            .await?;
        decode_symbol_hex(&output).ok_or_else(|| {
            BackendError::Malformed(format!("undecodable symbol() output {}", output))
        })
    }

    async fn try_fetch_token_transfers(
        &self,
        token: &str,
        limit: usize,
    ) -> BackendResult<Vec<TransferEvent>> {
        let rows = self
            .account_rows(&[
                ("module", "account".to_string()),
                ("action", "tokentx".to_string()),
                ("contractaddress", token.to_string()),
                ("startblock", self.history_start_block.to_string()),
                ("page", "1".to_string()),
                ("offset", limit.to_string()),
                ("sort", "asc".to_string()),
            ])
            .await?;

        Ok(rows.iter().filter_map(Self::parse_row).take(limit).collect())
    }
}

/// Drop the events of the newest block unless it is the only one.
///
/// Returns the highest block whose events are all kept.
fn truncate_partial_block(events: &mut Vec<TransferEvent>) -> Option<u64> {
    let newest = events.iter().map(|e| e.block_number).max()?;
    if events.iter().all(|e| e.block_number == newest) {
        return Some(newest);
    }
    events.retain(|e| e.block_number < newest);
    Some(newest - 1)
}

#[async_trait::async_trait]
impl ChainBackend for ExplorerBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Explorer
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
            self.indexed_symbol(token),
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
