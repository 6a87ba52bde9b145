// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/`. Broker-backed routes require an active
// session via the `ActiveSession` extractor; AI-backed routes only need the
// AI key to be configured. Every handler returns Result<_, ApiError>, so
// upstream failures become JSON error responses instead of crashes.
//
// CORS is configured permissively; the dashboard is served from a separate
// origin during development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis;
use crate::api::auth::ActiveSession;
use crate::app_state::AppState;
use crate::broker::{equity_instruments, Instrument};
use crate::error::ApiError;
use crate::types::{Candle, IndicatorSnapshot, InstrumentQuery};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Health ──────────────────────────────────────────────────
        .route("/api/health", get(health))
        // ── Broker ──────────────────────────────────────────────────
        .route("/api/login", post(login))
        .route("/api/instruments", get(instruments))
        .route("/api/historical-data", post(historical_data))
        .route("/api/technical-indicators", post(technical_indicators))
        .route("/api/stock-analysis", post(stock_analysis))
        // ── AI ──────────────────────────────────────────────────────
        .route("/api/market-data", get(market_data))
        .route("/api/market-news", get(market_news))
        .route("/api/company-details", post(company_details))
        .route("/api/chart-data", post(chart_data))
        .route("/api/top-performers", get(top_performers))
        // ── Middleware & State ──────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server_time": Utc::now().timestamp_millis(),
    }))
}

// =============================================================================
// Login
// =============================================================================

async fn login(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let settings = &state.settings;
    if !settings.has_broker_credentials() {
        return Err(ApiError::Config(
            "broker credentials missing — set BROKER_API_KEY, BROKER_CLIENT_CODE and BROKER_PASSWORD"
                .into(),
        ));
    }

    let client_code = settings.broker_client_code.as_deref().unwrap_or_default();
    let password = settings.broker_password.as_deref().unwrap_or_default();

    let session = state.broker.login(client_code, password).await?;

    let response = serde_json::json!({
        "status": true,
        "message": "Login successful",
        "data": {
            "name": session.profile.name,
            "clientcode": session.profile.client_code,
        },
    });

    state.store_session(session);
    info!("broker session established");

    Ok(Json(response))
}

// =============================================================================
// Instruments
// =============================================================================

async fn instruments(
    _session: ActiveSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Instrument>>, ApiError> {
    let all = state.broker.instruments().await?;
    let filtered = equity_instruments(
        all,
        &state.settings.exchange_segment,
        &state.settings.equity_suffix,
    );
    info!(count = filtered.len(), "equity instrument list served");
    Ok(Json(filtered))
}

// =============================================================================
// Historical data
// =============================================================================

#[derive(Debug, Deserialize)]
struct HistoricalQuery {
    symboltoken: String,
    exchange: String,
    #[serde(default = "default_timeframe")]
    timeframe: String,
    fromdate: String,
    todate: String,
}

fn default_timeframe() -> String {
    analysis::DAILY_INTERVAL.to_string()
}

async fn historical_data(
    ActiveSession(session): ActiveSession,
    State(state): State<Arc<AppState>>,
    Json(query): Json<HistoricalQuery>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    let from = parse_request_date(&query.fromdate)
        .ok_or_else(|| ApiError::Validation(format!("invalid fromdate: {}", query.fromdate)))?;
    let to = parse_request_date(&query.todate)
        .ok_or_else(|| ApiError::Validation(format!("invalid todate: {}", query.todate)))?;

    let candles = state
        .broker
        .candles(
            &session,
            &query.exchange,
            &query.symboltoken,
            &query.timeframe,
            from,
            to,
        )
        .await?;

    Ok(Json(candles))
}

/// Accept `YYYY-MM-DD HH:MM` (the broker's own request format) or a bare
/// `YYYY-MM-DD`, interpreted as midnight.
fn parse_request_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map(|dt| dt.and_utc())
}

// =============================================================================
// Technical indicators / stock analysis
// =============================================================================

async fn technical_indicators(
    ActiveSession(session): ActiveSession,
    State(state): State<Arc<AppState>>,
    Json(query): Json<InstrumentQuery>,
) -> Result<Json<IndicatorSnapshot>, ApiError> {
    let snapshot = analysis::indicator_snapshot(
        &state.broker,
        &session,
        &query.exchange,
        &query.symboltoken,
    )
    .await?;
    Ok(Json(snapshot))
}

/// Same pipeline as `technical_indicators`, plus a short AI commentary
/// paragraph grounded in the computed values. A failed generation degrades
/// to a null `analysis` field rather than failing the whole request.
async fn stock_analysis(
    ActiveSession(session): ActiveSession,
    State(state): State<Arc<AppState>>,
    Json(query): Json<InstrumentQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = analysis::indicator_snapshot(
        &state.broker,
        &session,
        &query.exchange,
        &query.symboltoken,
    )
    .await?;

    let prompt = analysis_prompt(&query, &snapshot);
    let commentary = match state.ai.generate_text(&prompt).await {
        Ok(text) => serde_json::Value::String(text),
        Err(e) => {
            warn!(error = %e, "analysis commentary generation failed — returning snapshot only");
            serde_json::Value::Null
        }
    };

    let mut body = serde_json::to_value(&snapshot)
        .map_err(|e| ApiError::upstream(format!("snapshot serialization failed: {e}"), None))?;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("analysis".to_string(), commentary);
    }

    Ok(Json(body))
}

fn analysis_prompt(query: &InstrumentQuery, snapshot: &IndicatorSnapshot) -> String {
    let fmt = |v: Option<f64>| match v {
        Some(x) => format!("{x:.2}"),
        None => "unavailable".to_string(),
    };
    format!(
        "You are an equity research assistant. In two or three sentences, give a \
         neutral technical read of instrument token {} on {}. \
         Current price: {}. Net change: {}. RSI(14): {}. \
         20-day MA: {}. 50-day MA: {}. 200-day MA: {}. \
         Mention overbought/oversold only when the RSI supports it. \
         Do not give investment advice.",
        query.symboltoken,
        query.exchange,
        fmt(snapshot.current_price),
        fmt(snapshot.net_change),
        fmt(snapshot.rsi),
        fmt(snapshot.dma_20),
        fmt(snapshot.dma_50),
        fmt(snapshot.dma_200),
    )
}

// =============================================================================
// AI market endpoints
// =============================================================================

async fn market_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let segment = &state.settings.exchange_segment;
    let prompt = format!(
        "Generate a plausible market overview for the {segment} equity market right now. \
         Include the two headline indices with realistic levels, and five top performing \
         large-cap stocks. Values are simulated and for dashboard demo purposes."
    );
    let body = state
        .ai
        .generate_json(&prompt, market_overview_schema())
        .await?;
    Ok(Json(body))
}

async fn market_news(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let segment = &state.settings.exchange_segment;
    let prompt = format!(
        "Generate six realistic, current-sounding business news items for the {segment} \
         equity market: a short headline, a two-sentence summary, a plausible source \
         name, and an overall sentiment."
    );
    let body = state.ai.generate_json(&prompt, news_schema()).await?;
    Ok(Json(body))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompanyDetailsRequest {
    #[serde(rename = "companyName")]
    company_name: Option<String>,
}

async fn company_details(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CompanyDetailsRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let name = require_field(request.company_name.as_deref(), "companyName")?;

    let prompt = format!(
        "Write a factual profile of the listed company \"{name}\": what it does, the \
         sector it operates in, three notable strengths and three notable risks. \
         Keep every field concise."
    );
    let body = state.ai.generate_json(&prompt, company_schema()).await?;
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ChartDataRequest {
    symbol: String,
    timeframe: String,
}

impl Default for ChartDataRequest {
    fn default() -> Self {
        Self {
            symbol: "NIFTY".to_string(),
            timeframe: "1D".to_string(),
        }
    }
}

async fn chart_data(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ChartDataRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let prompt = format!(
        "Simulate 60 consecutive {} OHLCV bars for {} as a price chart demo. \
         Bars are chronological, each close within 2% of the previous close, \
         high >= max(open, close) and low <= min(open, close).",
        request.timeframe, request.symbol
    );
    let body = state.ai.generate_json(&prompt, chart_schema()).await?;
    Ok(Json(body))
}

async fn top_performers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let segment = &state.settings.exchange_segment;
    let prompt = format!(
        "Generate today's five top gainers and five top losers for the {segment} \
         equity market with realistic prices and percentage moves."
    );
    let body = state.ai.generate_json(&prompt, performers_schema()).await?;
    Ok(Json(body))
}

/// Reject a missing or blank required field with a 400 before any upstream
/// call is made.
fn require_field<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{field} is required"))),
    }
}

// =============================================================================
// Response schemas (structured generation)
// =============================================================================

fn market_overview_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "indices": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "value": { "type": "NUMBER" },
                        "change": { "type": "NUMBER" },
                        "changePercent": { "type": "NUMBER" },
                    },
                    "required": ["name", "value", "change", "changePercent"],
                },
            },
            "topPerformers": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "symbol": { "type": "STRING" },
                        "name": { "type": "STRING" },
                        "price": { "type": "NUMBER" },
                        "changePercent": { "type": "NUMBER" },
                    },
                    "required": ["symbol", "name", "price", "changePercent"],
                },
            },
        },
        "required": ["indices", "topPerformers"],
    })
}

fn news_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "summary": { "type": "STRING" },
                "source": { "type": "STRING" },
                "sentiment": {
                    "type": "STRING",
                    "enum": ["positive", "negative", "neutral"],
                },
            },
            "required": ["title", "summary", "source", "sentiment"],
        },
    })
}

fn company_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "sector": { "type": "STRING" },
            "description": { "type": "STRING" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "risks": { "type": "ARRAY", "items": { "type": "STRING" } },
        },
        "required": ["name", "sector", "description", "strengths", "risks"],
    })
}

fn chart_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "time": { "type": "STRING" },
                "open": { "type": "NUMBER" },
                "high": { "type": "NUMBER" },
                "low": { "type": "NUMBER" },
                "close": { "type": "NUMBER" },
                "volume": { "type": "NUMBER" },
            },
            "required": ["time", "open", "high", "low", "close", "volume"],
        },
    })
}

fn performers_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "gainers": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "symbol": { "type": "STRING" },
                        "name": { "type": "STRING" },
                        "price": { "type": "NUMBER" },
                        "changePercent": { "type": "NUMBER" },
                    },
                    "required": ["symbol", "name", "price", "changePercent"],
                },
            },
            "losers": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "symbol": { "type": "STRING" },
                        "name": { "type": "STRING" },
                        "price": { "type": "NUMBER" },
                        "changePercent": { "type": "NUMBER" },
                    },
                    "required": ["symbol", "name", "price", "changePercent"],
                },
            },
        },
        "required": ["gainers", "losers"],
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    // ---- parse_request_date ----------------------------------------------

    #[test]
    fn parses_broker_datetime_format() {
        let dt = parse_request_date("2024-03-01 09:15").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 09:15");
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let dt = parse_request_date("2024-03-01").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "00:00");
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(parse_request_date("01/03/2024").is_none());
    }

    // ---- require_field ----------------------------------------------------

    #[test]
    fn missing_company_name_is_validation_error() {
        let err = require_field(None, "companyName").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blank_company_name_is_validation_error() {
        assert!(require_field(Some("   "), "companyName").is_err());
    }

    #[test]
    fn present_company_name_is_trimmed() {
        assert_eq!(require_field(Some(" Tata Motors "), "companyName").unwrap(), "Tata Motors");
    }
}
