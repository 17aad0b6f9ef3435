// Cash Reconciliation - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use cash_reconciliation::api::{self, AppState};
use cash_reconciliation::{logging, Config, ConfigOverrides, Database};
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "cashrec-server", version, about = "Cash reconciliation HTTP API")]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.overrides)?;
    logging::init_tracing(&config.logging)?;

    let db = Database::open(&config.database.path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database.path.display()
        )
    })?;
    let db = Arc::new(db);

    let addr = config.listen_addr()?;
    let state = AppState::new(db.clone(), config);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(%addr, version = cash_reconciliation::VERSION, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and its state clones) are gone once serve returns
    match Arc::try_unwrap(db) {
        Ok(db) => db.close().context("Failed to close database")?,
        Err(_) => tracing::warn!("database still shared at shutdown; left to drop"),
    }

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
