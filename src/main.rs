// =============================================================================
// ETF Snapshot — Main Entry Point
// =============================================================================
//
// Polls the quote provider every minute, pushes prices to every connected
// browser over a WebSocket and emails one-shot price alerts.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alerts;
mod api;
mod app_state;
mod config;
mod error;
mod notifier;
mod quotes;
#[cfg(test)]
mod testing;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::{AppConfig, POLL_INTERVAL};
use crate::notifier::{MailgunRelay, Notifier};
use crate::quotes::AlphaVantageClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("ETF Snapshot starting up");

    let config = AppConfig::from_env();

    // ── 2. External providers ────────────────────────────────────────────
    let quote_client = Arc::new(AlphaVantageClient::new(&config.quote_api)?);
    let relay = Arc::new(MailgunRelay::new(&config.mail)?);
    let notifier = Notifier::new(relay, config.mail.from.clone());

    // ── 3. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(AppState::new(
        config.symbols.clone(),
        quote_client,
        notifier,
    ));

    // ── 4. Fetch loop (immediately, then every minute) ───────────────────
    tokio::spawn(quotes::run_poll_loop(state.clone(), POLL_INTERVAL));

    // ── 5. HTTP + WebSocket server ───────────────────────────────────────
    let app = api::rest::router(state.clone(), &config.static_dir);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    info!("ETF Snapshot shut down complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    warn!("shutdown signal received — stopping gracefully");
}
