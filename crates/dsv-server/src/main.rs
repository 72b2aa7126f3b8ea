//! DSV Server - Main entry point

use anyhow::Result;
use dsv_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, time::Duration};
use tokio::signal;
use tracing::info;

use dsv_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("dsv-server")
        .filter_directives("dsv_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting DSV Server");

    let config = Config::load()?;
    info!(
        storage = ?config.storage,
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let state = api::AppState::connect(&config).await?;
    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
