//! # Carzone API
//!
//! HTTP server for the car and engine inventory.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Carzone API Server                               │
//! │                                                                         │
//! │  Client ───► HTTP (8080) ───► Services ───► SQLite                     │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │              /metrics                                                   │
//! │            (Prometheus)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use carzone_api::{build_router, ApiConfig, AppState};
use carzone_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Carzone API server...");

    // Load configuration
    let config = ApiConfig::load().context("failed to load configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        "Configuration loaded"
    );

    // Connect to database
    let db = Database::new(config.db_config())
        .await
        .context("failed to open database")?;

    if !db.health_check().await {
        bail!("database health check failed");
    }
    info!("Database ready");

    // Create shared state
    let addr = config.socket_addr();
    let state = Arc::new(AppState::new(config, db.clone()).context("failed to register metrics")?);
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Starting HTTP server");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    db.close().await;
    served.context("HTTP server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
