//! API Integration Tests
//!
//! Tests REST API endpoints for:
//! - Health check
//! - Watch-list management
//! - Manual discovery
//!
//! Requests go through the real router with `tower::ServiceExt::oneshot`.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use whale_sentinel::config::AppConfig;
use whale_sentinel::handlers::{router, AppState};
use whale_sentinel::monitoring::MonitoringState;
use whale_sentinel::notifications::CompositeNotifier;

use crate::support::{address, transfer, MockBackend, MockOracle, TOKEN, WALLET};

type App = (Router, Arc<MockBackend>, Arc<MockOracle>, TempDir);

async fn app(discovery_token: Option<&str>) -> App {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.watchlist.path = dir.path().join("watchlist.json");
    config.monitor.wallets = vec![WALLET.to_string()];
    if let Some(token) = discovery_token {
        config.discovery.enabled = true;
        config.discovery.token = Some(token.to_string());
        config.discovery.min_hold_days = 0;
        config.discovery.profit_multiplier = 10.0;
    }

    let backend = MockBackend::new();
    backend.set_head(100);
    let oracle = MockOracle::new(Some(10.0));
    let monitoring = Arc::new(MonitoringState::new(
        Arc::new(config),
        backend.clone(),
        oracle.clone(),
        Arc::new(CompositeNotifier::new()),
    ));
    monitoring.start().await.unwrap();

    let app = router(Arc::new(AppState::new(monitoring)));
    (app, backend, oracle, dir)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =============================================================================
// HEALTH CHECK TESTS
// =============================================================================

#[tokio::test]
async fn test_health_reports_backend_and_policy() {
    let (app, _backend, _oracle, _dir) = app(None).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "rpc_logs");
    assert_eq!(json["alert_policy"], "immediate");
    assert_eq!(json["engine"]["wallets"], 1);
    assert!(json["uptime_seconds"].is_number());
    assert_eq!(json["discovery_enabled"], false);
}

// =============================================================================
// WALLET TESTS
// =============================================================================

#[tokio::test]
async fn test_list_wallets() {
    let (app, _backend, _oracle, _dir) = app(None).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/wallets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["wallets"], json!([WALLET]));
}

#[tokio::test]
async fn test_add_wallet_created_then_ok() {
    let (app, _backend, _oracle, _dir) = app(None).await;
    let other = address(0x5151);

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/wallets", json!({ "address": other })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["changed"], true);
    assert_eq!(json["wallets"], 2);

    let response = app
        .oneshot(post_json("/api/v1/wallets", json!({ "address": other })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["changed"], false);
}

#[tokio::test]
async fn test_add_invalid_wallet_is_bad_request() {
    let (app, _backend, _oracle, _dir) = app(None).await;

    let response = app
        .oneshot(post_json("/api/v1/wallets", json!({ "address": "0x123" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_wallet() {
    let (app, _backend, _oracle, _dir) = app(None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/wallets/{}", WALLET))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["changed"], true);
    assert_eq!(json["wallets"], 0);
}

// =============================================================================
// DISCOVERY TESTS
// =============================================================================

#[tokio::test]
async fn test_discovery_without_token_is_bad_request() {
    let (app, _backend, _oracle, _dir) = app(None).await;

    let response = app
        .oneshot(post_json("/api/v1/discovery/run", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_discovery_run_adds_wallets() {
    let (app, backend, oracle, _dir) = app(Some(TOKEN)).await;
    let buyer = address(0xbeef);
    backend.set_token_history(vec![transfer(TOKEN, &buyer, 1, 1, 1_000)]);
    backend.set_balance(&buyer, TOKEN, 1);
    oracle.set_historical(1_000, 0.5);

    let response = app
        .oneshot(post_json("/api/v1/discovery/run", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["added"], json!([buyer]));
    assert_eq!(json["total"], 2);
}
