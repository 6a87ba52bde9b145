// =============================================================================
// Shared types used across the Meridian Desk backend
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broker session credentials returned by a successful login.
///
/// There is exactly one of these per process, held in `AppState` and
/// overwritten by each subsequent login. Nothing is persisted; a restart
/// requires a fresh login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub auth_token: String,
    pub feed_token: String,
    pub refresh_token: String,
    pub profile: Profile,
}

/// Account profile attached to a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub client_code: String,
}

/// A single OHLCV bar for an instrument over one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Indicator and price snapshot for one instrument, computed fresh per
/// request.
///
/// Every field is optional: an indicator whose look-back window exceeds the
/// available history is reported as `null` rather than erroring. Keys are
/// always present in the JSON (no `skip_serializing_if`) because the
/// dashboard destructures them unconditionally.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndicatorSnapshot {
    #[serde(rename = "currentPrice")]
    pub current_price: Option<f64>,
    #[serde(rename = "netChange")]
    pub net_change: Option<f64>,
    #[serde(rename = "percentChange")]
    pub percent_change: Option<f64>,
    pub rsi: Option<f64>,
    #[serde(rename = "dma20")]
    pub dma_20: Option<f64>,
    #[serde(rename = "dma50")]
    pub dma_50: Option<f64>,
    #[serde(rename = "dma200")]
    pub dma_200: Option<f64>,
}

/// Request body shared by the indicator and analysis endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentQuery {
    pub symboltoken: String,
    pub exchange: String,
}
