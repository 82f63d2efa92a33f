//! Background tasks: the short-interval wallet poll and the long-interval
//! discovery refresh. Both run on the same single-threaded runtime and stop
//! when the cancellation token fires.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::MonitoringState;
use crate::error::AppResult;
use crate::watchlist::MergeResult;

/// Poll every watched wallet once per interval
pub async fn start_polling_task(
    state: Arc<MonitoringState>,
    interval_secs: u64,
    cancel_token: CancellationToken,
) {
    tracing::info!(interval_secs = interval_secs, "Starting wallet polling task");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut poll_count = 0u64;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!("Wallet polling task shutting down");
                break;
            }
            _ = interval.tick() => {
                poll_count += 1;

                let alerts = state.run_scan_cycle().await;
                if alerts.is_empty() {
                    if poll_count % 10 == 0 {
                        tracing::debug!(poll_cycle = poll_count, "No new purchases");
                    }
                    continue;
                }

                tracing::info!(
                    alert_count = alerts.len(),
                    poll_cycle = poll_count,
                    "Detected new purchases"
                );
            }
        }
    }
}

/// Re-run discovery and the whale feed once per refresh interval,
/// starting immediately
pub async fn start_discovery_task(
    state: Arc<MonitoringState>,
    interval_secs: u64,
    cancel_token: CancellationToken,
) {
    tracing::info!(interval_secs = interval_secs, "Starting discovery refresh task");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!("Discovery refresh task shutting down");
                break;
            }
            _ = interval.tick() => {
                if state.config.discovery_configured() {
                    report("token screening", state.run_discovery().await);
                }
                if state.has_feed() {
                    report("whale feed", state.run_feed().await);
                }
            }
        }
    }
}

fn report(source: &str, outcome: AppResult<MergeResult>) {
    match outcome {
        Ok(result) => tracing::debug!(
            source = source,
            added = result.added.len(),
            total = result.total,
            "Discovery refresh complete"
        ),
        Err(e) => tracing::warn!(source = source, error = %e, "Discovery refresh failed"),
    }
}
