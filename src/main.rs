//! Bridge Ledger node
//!
//! Runs a single bridge endpoint with in-memory custody behind an HTTP API,
//! logging every emitted event for an external relayer or validator.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use bridge_ledger::config::Settings;
use bridge_ledger::metrics::MetricsServer;
use bridge_ledger::{api, Bridge, InMemoryCustody};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Bridge Ledger v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for chain {} with {} destination chains",
        settings.bridge.chain_id,
        settings.bridge.enabled_chains.len()
    );

    let custody = Arc::new(InMemoryCustody::with_balances(settings.genesis_balances())?);
    info!(
        "Custody seeded with {} genesis balances",
        settings.custody.genesis.len()
    );

    let bridge = Arc::new(Bridge::from_config(&settings.bridge, custody).await?);
    info!(
        "Bridge initialized (validator {:?}, admin {:?})",
        bridge.validator(),
        bridge.admin()
    );

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let bridge = bridge.clone();
        async move {
            if let Err(e) = api::run_server(config, bridge).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Surface events for relayers tailing the log
    let event_handle = tokio::spawn({
        let mut events = bridge.subscribe();
        async move {
            loop {
                match events.recv().await {
                    Ok(recorded) => {
                        info!(
                            event = recorded.event.name(),
                            sequence = recorded.sequence,
                            "{}",
                            serde_json::to_string(&recorded.event).unwrap_or_default()
                        );
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        error!("Event logger lagged, skipped {} events", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    });

    info!("Bridge Ledger is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    api_handle.abort();
    event_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Bridge Ledger stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_ledger=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
