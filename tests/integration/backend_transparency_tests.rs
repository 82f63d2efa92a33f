//! Backend transparency tests
//!
//! The same on-chain transfer, as reported by a JSON-RPC node, decoded by the
//! typed contract layer and listed by a block explorer, must produce the same
//! event and therefore the same alert.

use ethers::types::{Address, Bytes, Log, H256, U256, U64};
use serde_json::json;

use whale_sentinel::backend::{BackendKind, ContractBackend, ExplorerBackend, RpcLogBackend};
use whale_sentinel::constants::erc20::TRANSFER_TOPIC;
use whale_sentinel::engine::MonitorEngine;
use whale_sentinel::models::{Alert, AlertPolicy, TransferEvent};

use crate::support::MockBackend;

const TOKEN: &str = "0x6982508145454ce325ddbe47a25d4ec3d2311933";
const SENDER: &str = "0x11b815efb8f581194ae79006d24e0d814b7697f6";
const WALLET: &str = "0x00000000219ab540356cbb839cbe05303d7705fa";
const TX: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";
const BLOCK: u64 = 19_000_000;
const TIMESTAMP: i64 = 1_705_000_000;
const AMOUNT: u64 = 4_200_000;

fn topic(address: &str) -> String {
    format!("0x{:0>64}", address.trim_start_matches("0x"))
}

fn from_rpc() -> TransferEvent {
    let log = json!({
        "address": TOKEN,
        "topics": [TRANSFER_TOPIC, topic(SENDER), topic(WALLET)],
        "data": format!("0x{:064x}", AMOUNT),
        "blockNumber": format!("0x{:x}", BLOCK),
        "blockTimestamp": format!("0x{:x}", TIMESTAMP),
        "transactionHash": TX,
    });
    let (mut event, timestamp) = RpcLogBackend::parse_log(&log).unwrap();
    event.timestamp = timestamp.unwrap();
    event
}

fn from_contract() -> TransferEvent {
    let mut data = [0u8; 32];
    U256::from(AMOUNT).to_big_endian(&mut data);
    let log = Log {
        address: TOKEN.parse::<Address>().unwrap(),
        topics: vec![
            TRANSFER_TOPIC.parse::<H256>().unwrap(),
            topic(SENDER).parse::<H256>().unwrap(),
            topic(WALLET).parse::<H256>().unwrap(),
        ],
        data: Bytes::from(data.to_vec()),
        block_number: Some(U64::from(BLOCK)),
        transaction_hash: Some(TX.parse::<H256>().unwrap()),
        ..Default::default()
    };
    let mut event = ContractBackend::parse_log(&log).unwrap();
    // the typed layer reads timestamps from block headers
    event.timestamp = TIMESTAMP;
    event
}

fn from_explorer() -> TransferEvent {
    let row = json!({
        "blockNumber": BLOCK.to_string(),
        "timeStamp": TIMESTAMP.to_string(),
        "hash": TX,
        "from": SENDER,
        "to": WALLET,
        "contractAddress": TOKEN,
        "value": AMOUNT.to_string(),
        "tokenSymbol": "PEPE",
        "tokenDecimal": "18",
    });
    ExplorerBackend::parse_row(&row).unwrap()
}

async fn alerts_through(kind: BackendKind, event: TransferEvent) -> Vec<Alert> {
    let backend = MockBackend::with_kind(kind);
    backend.set_head(BLOCK + 5);
    backend.set_symbol(TOKEN, "PEPE");
    backend.push_transfer(event);

    let mut engine = MonitorEngine::new(backend, AlertPolicy::Immediate, 0);
    engine.update_wallets([WALLET]);
    engine.scan_at(TIMESTAMP + 60).await
}

#[test]
fn test_decoders_agree() {
    let rpc = from_rpc();
    assert_eq!(rpc, from_contract());
    assert_eq!(rpc, from_explorer());

    assert_eq!(rpc.token, TOKEN);
    assert_eq!(rpc.to, WALLET);
    assert_eq!(rpc.amount, U256::from(AMOUNT));
    assert_eq!(rpc.block_number, BLOCK);
}

#[tokio::test]
async fn test_same_alert_from_every_backend() {
    let rpc = alerts_through(BackendKind::RpcLogs, from_rpc()).await;
    let contract = alerts_through(BackendKind::Contract, from_contract()).await;
    let explorer = alerts_through(BackendKind::Explorer, from_explorer()).await;

    assert_eq!(rpc.len(), 1);
    assert_eq!(rpc, contract);
    assert_eq!(rpc, explorer);
    assert_eq!(rpc[0].symbol, "PEPE");
    assert_eq!(rpc[0].tx_hash, TX);
}

#[test]
fn test_non_transfer_logs_rejected() {
    let approval = json!({
        "address": TOKEN,
        "topics": [
            "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925",
            topic(SENDER),
            topic(WALLET)
        ],
        "data": format!("0x{:064x}", AMOUNT),
        "blockNumber": format!("0x{:x}", BLOCK),
        "transactionHash": TX,
    });
    assert!(RpcLogBackend::parse_log(&approval).is_none());

    // ERC-721 transfers carry the token id as a fourth topic
    let nft = json!({
        "address": TOKEN,
        "topics": [TRANSFER_TOPIC, topic(SENDER), topic(WALLET), format!("0x{:064x}", 7)],
        "data": "0x",
        "blockNumber": format!("0x{:x}", BLOCK),
        "transactionHash": TX,
    });
    assert!(RpcLogBackend::parse_log(&nft).is_none());

    let bad_value = json!({
        "blockNumber": BLOCK.to_string(),
        "timeStamp": TIMESTAMP.to_string(),
        "hash": TX,
        "from": SENDER,
        "to": WALLET,
        "contractAddress": TOKEN,
        "value": "lots",
    });
    assert!(ExplorerBackend::parse_row(&bad_value).is_none());
}
