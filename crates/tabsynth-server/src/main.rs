//! Tabsynth Server - Main entry point

use anyhow::Result;
use std::{net::SocketAddr, time::Duration};
use tabsynth_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tracing::info;

use tabsynth_server::{api, config::Config, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("tabsynth-server")
        .filter_directives("tabsynth_server=debug,tabsynth_engine=info,tower_http=debug,sqlx=warn")
        .build();

    // Environment variables override the defaults above
    let log_config = log_config.clone().with_env_overrides().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Tabsynth Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let shutdown_timeout = config.server.shutdown_timeout_secs;

    let ctx = AppContext::initialize(config).await?;
    info!(
        workers = ctx.available_workers(),
        "Database ready and artifact store reconciled"
    );

    let app = api::create_router(ctx);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then give in-flight requests a moment to finish
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
