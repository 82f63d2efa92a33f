//! Watch-list management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::error::AppError;

/// Add-wallet request
#[derive(Debug, Deserialize)]
pub struct AddWalletRequest {
    pub address: String,
}

/// Response of add/remove
#[derive(Debug, Serialize)]
pub struct WalletChangeResponse {
    pub address: String,
    /// Whether the watch list changed
    pub changed: bool,
    pub wallets: usize,
}

#[derive(Debug, Serialize)]
pub struct WalletListResponse {
    pub wallets: Vec<String>,
}

/// List watched wallets
///
/// GET /api/v1/wallets
pub async fn list_wallets(State(state): State<Arc<AppState>>) -> Json<WalletListResponse> {
    Json(WalletListResponse {
        wallets: state.monitoring.wallets().await,
    })
}

/// Start watching a wallet
///
/// POST /api/v1/wallets
pub async fn add_wallet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddWalletRequest>,
) -> Result<(StatusCode, Json<WalletChangeResponse>), AppError> {
    let changed = state.monitoring.add_wallet(&request.address).await?;
    let wallets = state.monitoring.wallets().await;

    tracing::info!(address = %request.address, changed = changed, "Add wallet requested");

    let status = if changed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(WalletChangeResponse {
            address: request.address.trim().to_ascii_lowercase(),
            changed,
            wallets: wallets.len(),
        }),
    ))
}

/// Stop watching a wallet
///
/// DELETE /api/v1/wallets/:address
pub async fn remove_wallet(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<WalletChangeResponse>, AppError> {
    let changed = state.monitoring.remove_wallet(&address).await?;
    let wallets = state.monitoring.wallets().await;

    tracing::info!(address = %address, changed = changed, "Remove wallet requested");

    Ok(Json(WalletChangeResponse {
        address: address.trim().to_ascii_lowercase(),
        changed,
        wallets: wallets.len(),
    }))
}
