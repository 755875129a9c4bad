// Municipal Tax - Web Server
// REST API with Axum over the SQLite record store

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use municipal_tax::{api, init_tracing, RateResolver, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ServerConfig::parse();

    info!(version = municipal_tax::VERSION, "🌐 Municipal Tax - Web Server");

    let store = config
        .store
        .open_store()
        .with_context(|| format!("Failed to open database {:?}", config.store.db_path))?;
    let app = api::router(Arc::new(RateResolver::new(store)));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(addr = %config.bind, "🚀 server running (GET /records/:municipality?date=YYYY-MM-DD)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
