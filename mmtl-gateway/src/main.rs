//! mmtl-gateway - Multimessenger timeline HTTP gateway
//!
//! Serves the correlation proxy, correlated-result ingestion, collection
//! reads, and the gated admin pages.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mmtl_common::config::{default_data_dir, sqlite_url_for};
use mmtl_gateway::config::{CliOverrides, GatewayConfig};
use mmtl_gateway::{build_router, AppState};

/// Command-line arguments for mmtl-gateway
#[derive(Parser, Debug)]
#[command(name = "mmtl-gateway")]
#[command(about = "HTTP gateway for the multimessenger timeline")]
#[command(version)]
struct Args {
    /// Bootstrap TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite connection string
    #[arg(long)]
    database_url: Option<String>,

    /// Correlation service endpoint
    #[arg(long)]
    correlator_url: Option<String>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            config_path: args.config,
            bind: args.bind,
            port: args.port,
            database_url: args.database_url,
            correlator_url: args.correlator_url,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliOverrides::from(Args::parse());
    let (config, source) = GatewayConfig::load(&cli).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting MMTL Gateway (mmtl-gateway) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    source.log();
    info!("Correlation service: {}", config.correlator.url);

    let data_dir = default_data_dir();
    if config.database_url == sqlite_url_for(&data_dir.join("mmtl.db")) {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data folder {}", data_dir.display()))?;
        info!("Data folder: {}", data_dir.display());
    }

    let state = AppState::from_config(&config).context("Failed to build correlator client")?;

    // Warm the connection; failure is logged and retried on first request
    state.db.connect().await;
    if !state.db.health().await.is_ready() {
        warn!("Database unavailable at startup; requests will retry the connection");
    }

    let db = state.db.clone();
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("mmtl-gateway listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_invalid_port_env_does_not_abort_parsing() {
        std::env::set_var("MMTL_PORT", "not-a-port");
        let parsed = Args::try_parse_from(["mmtl-gateway"]);
        std::env::remove_var("MMTL_PORT");

        let overrides = CliOverrides::from(parsed.unwrap());
        assert_eq!(overrides.port, None);
    }

    #[test]
    fn test_flags_still_override() {
        let args = Args::try_parse_from(["mmtl-gateway", "--port", "6100"]).unwrap();
        assert_eq!(args.port, Some(6100));
    }
}
