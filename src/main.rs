// =============================================================================
// Meridian Desk — Main Entry Point
// =============================================================================
//
// Dashboard backend: proxies the brokerage REST API (login, instruments,
// candles, quotes) and the AI generation API (news, company profiles,
// simulated market data), and computes the indicator/price snapshot the
// frontend charts are built on.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod ai;
mod analysis;
mod api;
mod app_state;
mod broker;
mod config;
mod error;
mod indicators;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env();

    info!(
        bind = %settings.bind_addr,
        exchange = %settings.exchange_segment,
        ai_model = %settings.ai_model,
        "Meridian Desk backend starting"
    );

    if !settings.has_broker_credentials() {
        warn!("broker credentials not fully configured — /api/login will fail until BROKER_API_KEY, BROKER_CLIENT_CODE and BROKER_PASSWORD are set");
    }
    if settings.ai_api_key.is_none() {
        warn!("AI_API_KEY not set — AI endpoints will return configuration errors");
    }

    // ── 2. Shared state & router ─────────────────────────────────────────
    let state = Arc::new(AppState::new(settings.clone()));
    let app = api::routes::router(state);

    // ── 3. Serve ─────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "API server listening");

    axum::serve(listener, app).await.context("API server failed")?;

    Ok(())
}
