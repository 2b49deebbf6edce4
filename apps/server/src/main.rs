//! # cartstockd
//!
//! Scan server for the cartridge stock tracker.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         cartstockd                                  │
//! │                                                                     │
//! │  Handheld terminal ───► POST /scan ───► ledger engine ───► SQLite   │
//! │                          (axum)              │                      │
//! │                                              ▼ after commit        │
//! │                                         notification fanout        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The operator command surface lives in cartstock-gateway as a library
//! API; a chat front end links against [`cartstock_gateway::OperatorGateway`]
//! directly and shares this process's database file.

mod config;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use cartstock_db::{Database, DbConfig};
use cartstock_gateway::{scan_router, Fanout, LogSink, ScanCodec, ScanState};

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting cartstockd...");

    let config = AppConfig::load()?;
    info!(
        db_path = %config.database_path.display(),
        bind_addr = %config.bind_addr,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    let state = Arc::new(ScanState {
        codec: ScanCodec::new(config.scan_key_bytes()),
        ledger: db.ledger(),
        subscribers: db.subscribers(),
        fanout: Fanout::new(Arc::new(LogSink)),
    });

    let app = scan_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Scan endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drains in-flight ledger transactions before the process exits.
    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
