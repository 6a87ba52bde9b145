// =============================================================================
// Broker REST API Client — token-header authenticated requests
// =============================================================================
//
// All header injection for the brokerage upstream lives here: the API key is
// a default header on the underlying reqwest client, and per-request session
// tokens are attached as a Bearer header. Endpoint handlers never build
// headers themselves.
//
// SECURITY: the API key and password are never logged or serialized.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, instrument, warn};

use crate::error::ApiError;
use crate::types::{Candle, Profile, Session};

use super::instruments::Instrument;

/// Upstream request timeout. The broker applies no timeout of its own, so a
/// hung connection would otherwise stall a request indefinitely.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Broker REST API client.
#[derive(Clone)]
pub struct BrokerClient {
    base_url: String,
    client: reqwest::Client,
}

impl BrokerClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `BrokerClient`.
    ///
    /// # Arguments
    /// * `base_url` — broker REST base URL, no trailing slash.
    /// * `api_key`  — application API key, sent as a header on every call.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();

        let mut default_headers = HeaderMap::new();
        if let Ok(val) = HeaderValue::from_str(&api_key) {
            default_headers.insert("X-Api-Key", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    // -------------------------------------------------------------------------
    // Authentication
    // -------------------------------------------------------------------------

    /// POST /user/v1/login — exchange account credentials for session tokens.
    #[instrument(skip(self, password), name = "broker::login")]
    pub async fn login(&self, client_code: &str, password: &str) -> Result<Session> {
        let url = format!("{}/user/v1/login", self.base_url);
        let body = serde_json::json!({
            "clientcode": client_code,
            "password": password,
        });

        let data = self.post_json(&url, &body, "login").await?;

        let auth_token = data["jwtToken"]
            .as_str()
            .context("login response missing jwtToken")?
            .to_string();
        let feed_token = data["feedToken"].as_str().unwrap_or_default().to_string();
        let refresh_token = data["refreshToken"].as_str().unwrap_or_default().to_string();

        let profile = Profile {
            name: data["name"].as_str().unwrap_or_default().to_string(),
            client_code: data["clientcode"].as_str().unwrap_or(client_code).to_string(),
        };

        debug!(client_code = %profile.client_code, "broker login succeeded");

        Ok(Session {
            auth_token,
            feed_token,
            refresh_token,
            profile,
        })
    }

    // -------------------------------------------------------------------------
    // Quotes
    // -------------------------------------------------------------------------

    /// POST /market/v1/quote/ltp — last traded price for one instrument.
    ///
    /// Returns `Ok(None)` when the call succeeds but the payload carries no
    /// usable price (market closed, stale token). Callers treat both `Err`
    /// and `Ok(None)` as "no live quote" and fall back to historical data.
    #[instrument(skip(self, session), name = "broker::ltp")]
    pub async fn ltp(
        &self,
        session: &Session,
        exchange: &str,
        symbol_token: &str,
    ) -> Result<Option<f64>> {
        let url = format!("{}/market/v1/quote/ltp", self.base_url);
        let body = serde_json::json!({
            "exchange": exchange,
            "symboltoken": symbol_token,
        });

        let data = self
            .post_json_authed(&url, &body, session, "quote/ltp")
            .await?;

        let ltp = data.get("ltp").and_then(parse_f64);
        if ltp.is_none() {
            warn!(exchange, symbol_token, "quote payload carried no ltp field");
        }

        Ok(ltp)
    }

    // -------------------------------------------------------------------------
    // Historical candles
    // -------------------------------------------------------------------------

    /// POST /market/v1/candles — historical OHLCV bars.
    ///
    /// `interval` is the upstream's token, passed through verbatim
    /// (`ONE_DAY`, `ONE_MINUTE`, ...). The date range is inclusive.
    ///
    /// A 2xx payload whose `data` is not an array is treated as an empty
    /// series rather than a failure, so downstream indicator logic can
    /// degrade instead of erroring.
    #[instrument(skip(self, session, from, to), name = "broker::candles")]
    pub async fn candles(
        &self,
        session: &Session,
        exchange: &str,
        symbol_token: &str,
        interval: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/market/v1/candles", self.base_url);
        let body = serde_json::json!({
            "exchange": exchange,
            "symboltoken": symbol_token,
            "interval": interval,
            "fromdate": from.format("%Y-%m-%d %H:%M").to_string(),
            "todate": to.format("%Y-%m-%d %H:%M").to_string(),
        });

        let data = self
            .post_json_authed(&url, &body, session, "candles")
            .await?;

        let raw = match data.as_array() {
            Some(arr) => arr,
            None => {
                warn!(exchange, symbol_token, "candle payload was not an array — treating as empty");
                return Ok(Vec::new());
            }
        };

        let mut candles = Vec::with_capacity(raw.len());
        for entry in raw {
            let arr = match entry.as_array() {
                Some(a) if a.len() >= 6 => a,
                _ => {
                    warn!("skipping malformed candle entry: {entry}");
                    continue;
                }
            };

            let time = match parse_time(&arr[0]) {
                Some(t) => t,
                None => {
                    warn!("skipping candle with unparseable timestamp: {}", arr[0]);
                    continue;
                }
            };

            candles.push(Candle {
                time,
                open: parse_f64(&arr[1]).unwrap_or(0.0),
                high: parse_f64(&arr[2]).unwrap_or(0.0),
                low: parse_f64(&arr[3]).unwrap_or(0.0),
                close: parse_f64(&arr[4]).unwrap_or(0.0),
                volume: parse_f64(&arr[5]).unwrap_or(0.0),
            });
        }

        debug!(exchange, symbol_token, interval, count = candles.len(), "candles fetched");
        Ok(candles)
    }

    // -------------------------------------------------------------------------
    // Instrument master
    // -------------------------------------------------------------------------

    /// GET /market/v1/instruments — the full instrument master list.
    ///
    /// The list is large; filtering to the configured equity universe happens
    /// in [`super::instruments::equity_instruments`].
    #[instrument(skip(self), name = "broker::instruments")]
    pub async fn instruments(&self) -> Result<Vec<Instrument>> {
        let url = format!("{}/market/v1/instruments", self.base_url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /market/v1/instruments request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse instrument master response")?;

        if !status.is_success() {
            return Err(ApiError::upstream(
                format!("broker GET instruments returned {status}"),
                Some(body),
            )
            .into());
        }

        let instruments: Vec<Instrument> =
            serde_json::from_value(body).context("instrument master is not a list")?;

        debug!(count = instruments.len(), "instrument master fetched");
        Ok(instruments)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// POST `body` to `url` without session auth and unwrap the envelope.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        what: &str,
    ) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("broker {what} request failed"))?;
        Self::unwrap_envelope(resp, what).await
    }

    /// POST `body` to `url` with the session's Bearer token attached.
    async fn post_json_authed(
        &self,
        url: &str,
        body: &serde_json::Value,
        session: &Session,
        what: &str,
    ) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&session.auth_token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("broker {what} request failed"))?;
        Self::unwrap_envelope(resp, what).await
    }

    /// Check the HTTP status and the broker's `{status, message, data}`
    /// envelope, returning the `data` value.
    ///
    /// Failures keep the upstream body so the endpoint boundary can attach
    /// it to the error response.
    async fn unwrap_envelope(resp: reqwest::Response, what: &str) -> Result<serde_json::Value> {
        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse broker {what} response"))?;

        if !status.is_success() {
            return Err(
                ApiError::upstream(format!("broker {what} returned {status}"), Some(body)).into(),
            );
        }

        // The broker wraps everything in {status, message, data}; status=false
        // with HTTP 200 is still a failure.
        if body.get("status").and_then(|s| s.as_bool()) == Some(false) {
            let message = body["message"].as_str().unwrap_or("unknown error").to_string();
            return Err(
                ApiError::upstream(format!("broker {what} failed: {message}"), Some(body)).into(),
            );
        }

        Ok(body.get("data").cloned().unwrap_or(serde_json::Value::Null))
    }
}

impl std::fmt::Debug for BrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Value parsing
// =============================================================================

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_f64(val: &serde_json::Value) -> Option<f64> {
    if let Some(n) = val.as_f64() {
        Some(n)
    } else {
        val.as_str().and_then(|s| s.parse::<f64>().ok())
    }
}

/// Parse a candle timestamp: RFC 3339 / `YYYY-MM-DDTHH:MM:SS+offset` strings
/// or epoch milliseconds.
fn parse_time(val: &serde_json::Value) -> Option<DateTime<Utc>> {
    if let Some(s) = val.as_str() {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    } else {
        val.as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_accepts_strings_and_numbers() {
        assert_eq!(parse_f64(&serde_json::json!("123.5")), Some(123.5));
        assert_eq!(parse_f64(&serde_json::json!(123.5)), Some(123.5));
        assert_eq!(parse_f64(&serde_json::json!(null)), None);
        assert_eq!(parse_f64(&serde_json::json!("n/a")), None);
    }

    #[test]
    fn parse_time_accepts_rfc3339() {
        let t = parse_time(&serde_json::json!("2024-03-01T09:15:00+05:30")).unwrap();
        assert_eq!(t.timestamp(), 1_709_264_700);
    }

    #[test]
    fn parse_time_accepts_epoch_millis() {
        let t = parse_time(&serde_json::json!(1_709_264_700_000_i64)).unwrap();
        assert_eq!(t.timestamp(), 1_709_264_700);
    }

    #[test]
    fn parse_time_rejects_garbage() {
        assert!(parse_time(&serde_json::json!("yesterday")).is_none());
    }
}
