//! Manual discovery trigger

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::error::AppError;

/// Discovery run response
#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    /// Wallets newly added to the watch list
    pub added: Vec<String>,
    /// Watch-list size after the merge
    pub total: usize,
    pub merged_at: String,
}

/// Run discovery now and merge the result
///
/// POST /api/v1/discovery/run
pub async fn run_discovery(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DiscoveryResponse>, AppError> {
    tracing::info!("Manual discovery run triggered");

    let result = state.monitoring.run_discovery().await?;

    Ok(Json(DiscoveryResponse {
        added: result.added,
        total: result.total,
        merged_at: result.merged_at.to_rfc3339(),
    }))
}
