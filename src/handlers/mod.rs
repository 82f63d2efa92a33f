//! HTTP command surface

mod discovery;
mod health;
mod wallets;

pub use discovery::*;
pub use health::*;
pub use wallets::*;

use axum::{
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::monitoring::MonitoringState;

/// Shared state of every handler
pub struct AppState {
    pub monitoring: Arc<MonitoringState>,
    /// Application start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(monitoring: Arc<MonitoringState>) -> Self {
        Self {
            monitoring,
            started_at: Utc::now(),
        }
    }
}

/// Build the full router
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/wallets", get(list_wallets).post(add_wallet))
        .route("/wallets/:address", delete(remove_wallet))
        .route("/discovery/run", post(run_discovery));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
