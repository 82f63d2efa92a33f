//! Discovery tests
//!
//! Tests the hold, balance and price-multiple filters applied to a token's
//! earliest buyers.

use rust_decimal::Decimal;
use std::sync::Arc;

use whale_sentinel::discovery::DiscoveryEngine;

use crate::support::{address, transfer, MockBackend, MockOracle, TOKEN};

const DAY: i64 = 86_400;
const NOW: i64 = 100 * DAY;

/// Backend whose token history holds one early transfer per buyer
fn history(buyers: &[(u64, i64)]) -> Arc<MockBackend> {
    let backend = MockBackend::new();
    let events = buyers
        .iter()
        .enumerate()
        .map(|(i, (buyer, ts))| transfer(TOKEN, &address(*buyer), 1, i as u64 + 1, *ts))
        .collect();
    backend.set_token_history(events);
    backend
}

fn discovery(backend: &Arc<MockBackend>, oracle: &Arc<MockOracle>) -> DiscoveryEngine {
    DiscoveryEngine::new(backend.clone(), oracle.clone(), 1000)
}

#[tokio::test]
async fn test_exact_multiple_qualifies() {
    let backend = history(&[(0xa1, DAY)]);
    backend.set_balance(&address(0xa1), TOKEN, 100);
    let oracle = MockOracle::new(Some(5.0));
    oracle.set_historical(DAY, 0.5);

    let found = discovery(&backend, &oracle)
        .discover_at(TOKEN, 30, 10.0, 50, NOW)
        .await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].address, address(0xa1));
    assert_eq!(found[0].first_seen, DAY);
    assert_eq!(found[0].multiple, Decimal::from(10));
}

#[tokio::test]
async fn test_below_multiple_excluded() {
    let backend = history(&[(0xa1, DAY)]);
    backend.set_balance(&address(0xa1), TOKEN, 100);
    let oracle = MockOracle::new(Some(4.99));
    oracle.set_historical(DAY, 0.5);

    let found = discovery(&backend, &oracle)
        .discover(TOKEN, 0, 10.0, 50)
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_zero_historical_price_excluded() {
    let backend = history(&[(0xa1, DAY)]);
    backend.set_balance(&address(0xa1), TOKEN, 100);
    let oracle = MockOracle::new(Some(1_000.0));
    oracle.set_historical(DAY, 0.0);

    let found = discovery(&backend, &oracle)
        .discover_at(TOKEN, 0, 10.0, 50, NOW)
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_missing_historical_price_skips_wallet() {
    let backend = history(&[(0xa1, DAY), (0xa2, 2 * DAY)]);
    backend.set_balance(&address(0xa1), TOKEN, 100);
    backend.set_balance(&address(0xa2), TOKEN, 100);
    let oracle = MockOracle::new(Some(10.0));
    oracle.set_historical(2 * DAY, 1.0);

    let found = discovery(&backend, &oracle)
        .discover_at(TOKEN, 0, 10.0, 50, NOW)
        .await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].address, address(0xa2));
}

#[tokio::test]
async fn test_short_hold_excluded() {
    // bought 10 days before NOW, 30 required
    let backend = history(&[(0xa1, NOW - 10 * DAY), (0xa2, NOW - 30 * DAY)]);
    backend.set_balance(&address(0xa1), TOKEN, 100);
    backend.set_balance(&address(0xa2), TOKEN, 100);
    let oracle = MockOracle::new(Some(10.0));
    oracle.set_historical(NOW - 10 * DAY, 1.0);
    oracle.set_historical(NOW - 30 * DAY, 1.0);

    let found = discovery(&backend, &oracle)
        .discover_at(TOKEN, 30, 10.0, 50, NOW)
        .await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].address, address(0xa2));
}

#[tokio::test]
async fn test_sold_wallet_excluded() {
    let backend = history(&[(0xa1, DAY)]);
    let oracle = MockOracle::new(Some(10.0));
    oracle.set_historical(DAY, 1.0);

    let found = discovery(&backend, &oracle)
        .discover_at(TOKEN, 0, 10.0, 50, NOW)
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_max_wallets_keeps_earliest_buyers() {
    let buyers: Vec<(u64, i64)> = (1..=5).map(|i| (0xb0 + i, i as i64 * DAY)).collect();
    let backend = history(&buyers);
    let oracle = MockOracle::new(Some(20.0));
    for (buyer, ts) in &buyers {
        backend.set_balance(&address(*buyer), TOKEN, 1);
        oracle.set_historical(*ts, 1.0);
    }

    let found = discovery(&backend, &oracle)
        .discover(TOKEN, 0, 10.0, 3)
        .await;
    assert_eq!(found, vec![address(0xb1), address(0xb2), address(0xb3)]);
}

#[tokio::test]
async fn test_repeat_buyer_uses_first_transfer() {
    let backend = history(&[(0xa1, DAY), (0xa1, 50 * DAY)]);
    backend.set_balance(&address(0xa1), TOKEN, 1);
    let oracle = MockOracle::new(Some(10.0));
    oracle.set_historical(DAY, 1.0);
    oracle.set_historical(50 * DAY, 5.0);

    let found = discovery(&backend, &oracle)
        .discover_at(TOKEN, 0, 10.0, 50, NOW)
        .await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].first_seen, DAY);
}

#[tokio::test]
async fn test_missing_current_price_finds_nothing() {
    let backend = history(&[(0xa1, DAY)]);
    backend.set_balance(&address(0xa1), TOKEN, 100);
    let oracle = MockOracle::new(None);
    oracle.set_historical(DAY, 0.5);

    let found = discovery(&backend, &oracle)
        .discover_at(TOKEN, 0, 10.0, 50, NOW)
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_empty_history_finds_nothing() {
    let backend = MockBackend::new();
    let oracle = MockOracle::new(Some(10.0));

    let found = discovery(&backend, &oracle)
        .discover(TOKEN, 0, 10.0, 50)
        .await;
    assert!(found.is_empty());
}
