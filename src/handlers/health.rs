//! Health check endpoint

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::backend::BackendKind;
use crate::engine::EngineStats;
use crate::models::AlertPolicy;
use crate::monitoring::ScanReport;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Uptime in seconds
    pub uptime_seconds: i64,
    pub backend: BackendKind,
    pub alert_policy: AlertPolicy,
    /// Engine counters; absent while a scan is running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineStats>,
    pub last_scan: Option<ScanReport>,
    pub discovery_enabled: bool,
}

/// Health status enum
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Scanning on schedule
    Healthy,
    /// No scan finished within two poll intervals
    Degraded,
}

/// Health check handler
///
/// GET /health
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let now = Utc::now();
    let status = state.monitoring.status();
    let poll_secs = state.monitoring.config.monitor.poll_interval_secs as i64;

    let overall = match &status.last_scan {
        Some(scan) if is_stale(scan.finished_at, now, poll_secs) => HealthStatus::Degraded,
        None if (now - state.started_at).num_seconds() > 2 * poll_secs => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    };

    let response = HealthResponse {
        status: overall,
        uptime_seconds: (now - state.started_at).num_seconds(),
        backend: status.backend,
        alert_policy: status.policy,
        engine: status.engine,
        last_scan: status.last_scan,
        discovery_enabled: status.discovery_enabled,
    };

    // Degraded still answers 200; the body carries the detail
    (StatusCode::OK, Json(response))
}

fn is_stale(finished_at: DateTime<Utc>, now: DateTime<Utc>, poll_secs: i64) -> bool {
    (now - finished_at).num_seconds() > 2 * poll_secs
}
