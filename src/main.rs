//! Whale Sentinel - wallet purchase monitor
//!
//! Entry point: loads configuration, wires the monitor, starts the poll and
//! discovery tasks and serves the HTTP command surface. Everything runs on
//! one cooperative thread.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use whale_sentinel::backend::select_backend;
use whale_sentinel::config::AppConfig;
use whale_sentinel::discovery::WhaleFeed;
use whale_sentinel::handlers::{router, AppState};
use whale_sentinel::monitoring::{start_discovery_task, start_polling_task, MonitoringState};
use whale_sentinel::notifications::{CompositeNotifier, NotificationEvent, TelegramNotifier};
use whale_sentinel::oracle::{DefiLlamaOracle, PriceOracle};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run())
}

async fn run() -> anyhow::Result<()> {
    tracing::info!("Starting Whale Sentinel v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(load_config()?);
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        policy = %config.monitor.alert_policy,
        poll_interval_secs = config.monitor.poll_interval_secs,
        discovery = config.discovery_configured(),
        whale_feed = config.feed_configured(),
        "Configuration loaded"
    );

    let backend = select_backend(&config.backend)?;
    let oracle: Arc<dyn PriceOracle> =
        Arc::new(DefiLlamaOracle::new(&config.price, config.backend.timeout_ms)?);

    let mut notifier = CompositeNotifier::new();
    if config.notifications.telegram.enabled {
        let telegram = TelegramNotifier::new(&config.notifications.telegram)?;
        notifier.add_service(Arc::new(telegram));
        tracing::info!("Telegram notifications enabled");
    }
    let notifier = Arc::new(notifier);

    let mut monitoring = MonitoringState::new(config.clone(), backend, oracle, notifier.clone());
    if config.feed_configured() {
        if let Some(feed) = WhaleFeed::from_config(&config.discovery, config.backend.timeout_ms)? {
            monitoring = monitoring.with_feed(feed);
        }
    }
    let monitoring = Arc::new(monitoring);

    let wallets = monitoring.start().await.map_err(|e| {
        tracing::error!(error = %e, "Startup failed");
        anyhow::anyhow!("Startup failed: {}", e)
    })?;
    tracing::info!(wallets = wallets, "Monitor initialized");

    let cancel_token = CancellationToken::new();

    let poll_handle = tokio::spawn(start_polling_task(
        monitoring.clone(),
        config.monitor.poll_interval_secs,
        cancel_token.clone(),
    ));
    let mut tasks = vec![supervise("poller", poll_handle, notifier.clone())];

    if monitoring.discovery_enabled() {
        let discovery_handle = tokio::spawn(start_discovery_task(
            monitoring.clone(),
            config.discovery.refresh_interval_secs,
            cancel_token.clone(),
        ));
        tasks.push(supervise("discovery", discovery_handle, notifier.clone()));
    }

    let app = router(Arc::new(AppState::new(monitoring)));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    cancel_token.cancel();
    for task in tasks {
        let _ = task.await;
    }

    tracing::info!("Whale Sentinel stopped");
    Ok(())
}

/// Report a background task that ended by panicking
fn supervise(
    component: &'static str,
    handle: JoinHandle<()>,
    notifier: Arc<CompositeNotifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = handle.await {
            tracing::error!(component = component, error = %e, "Background task crashed");
            notifier
                .notify(NotificationEvent::SystemCrash {
                    component: component.to_string(),
                })
                .await;
        }
    })
}

/// Resolve on Ctrl-C or SIGTERM and cancel background tasks
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    cancel_token.cancel();
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whale_sentinel=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    if let Err(e) = config.validate() {
        // Dev mode runs without notification credentials
        if std::env::var("SENTINEL_DEV_MODE").is_ok() {
            tracing::warn!(error = %e, "Running in dev mode - skipping configuration validation");
        } else {
            return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
        }
    }

    Ok(config)
}
