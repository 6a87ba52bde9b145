// =============================================================================
// Live/Fallback Price Resolver
// =============================================================================
//
// Two-state flow per request:
//
//   TryLive  — ask the broker for a last-traded-price quote. Success means
//              the payload carried a real price; the previous trading day's
//              close is then found by walking back through candidate dates.
//   Fallback — entered when the quote call fails or carries no price
//              (market closed, feed outage). The last two entries of the
//              one-year daily closing series stand in for current/previous.
//
// The resolver never errors: outside trading hours it degrades to the best
// available historical approximation, and change fields collapse to zero
// when no previous close exists.
// =============================================================================

use chrono::{Duration, NaiveTime, Utc};
use tracing::{debug, warn};

use crate::broker::BrokerClient;
use crate::types::Session;

use super::DAILY_INTERVAL;

/// How many prior calendar days to try when hunting for the previous
/// trading day's close. Covers weekends plus a long holiday bridge.
const PREV_CLOSE_LOOKBACK_DAYS: i64 = 5;

/// Resolved price and change fields for one instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolvedPrice {
    pub current_price: Option<f64>,
    pub net_change: f64,
    pub percent_change: f64,
}

/// Resolve the current price and day-change for an instrument.
///
/// `year_closes` is the same one-year daily closing series the indicator
/// calculation ran on; the fallback path reuses it rather than refetching.
pub async fn resolve_price(
    broker: &BrokerClient,
    session: &Session,
    exchange: &str,
    symbol_token: &str,
    year_closes: &[f64],
) -> ResolvedPrice {
    match broker.ltp(session, exchange, symbol_token).await {
        Ok(Some(price)) => {
            let prev = previous_trading_close(broker, session, exchange, symbol_token).await;
            if prev.is_none() {
                warn!(
                    exchange,
                    symbol_token,
                    lookback_days = PREV_CLOSE_LOOKBACK_DAYS,
                    "no previous close found — reporting zero change"
                );
            }
            let (net_change, percent_change) = change_from(price, prev);
            ResolvedPrice {
                current_price: Some(price),
                net_change,
                percent_change,
            }
        }
        Ok(None) => {
            debug!(exchange, symbol_token, "live quote carried no price — using historical fallback");
            fallback_from_closes(year_closes)
        }
        Err(e) => {
            warn!(exchange, symbol_token, error = %e, "live quote failed — using historical fallback");
            fallback_from_closes(year_closes)
        }
    }
}

/// Find the close of the most recent prior day that actually traded.
///
/// Candidate dates are a bounded lazy sequence — yesterday back through
/// [`PREV_CLOSE_LOOKBACK_DAYS`] — consumed until a day returns at least one
/// candle. A fetch error for one candidate skips to the next; the walk never
/// aborts early.
async fn previous_trading_close(
    broker: &BrokerClient,
    session: &Session,
    exchange: &str,
    symbol_token: &str,
) -> Option<f64> {
    let today = Utc::now().date_naive();
    let candidates = (1..=PREV_CLOSE_LOOKBACK_DAYS).map(|offset| today - Duration::days(offset));

    for day in candidates {
        let from = day.and_time(NaiveTime::MIN).and_utc();
        let to = from + Duration::hours(24) - Duration::minutes(1);

        match broker
            .candles(session, exchange, symbol_token, DAILY_INTERVAL, from, to)
            .await
        {
            Ok(candles) => {
                if let Some(last) = candles.last() {
                    debug!(%day, close = last.close, "previous trading close found");
                    return Some(last.close);
                }
            }
            Err(e) => {
                warn!(%day, error = %e, "previous-close lookup failed for candidate day");
            }
        }
    }

    None
}

/// Net and percent change of `current` against `prev`.
///
/// A previous close of zero (or anything non-finite) yields (0, 0) — the
/// dashboard renders that as "unchanged" and must never see NaN/Infinity.
pub fn change_from(current: f64, prev: Option<f64>) -> (f64, f64) {
    match prev {
        Some(p) if p != 0.0 && p.is_finite() && current.is_finite() => {
            let net = current - p;
            (net, net / p * 100.0)
        }
        _ => (0.0, 0.0),
    }
}

/// Derive a price from the tail of the daily closing series: the last close
/// is "current", the one before it "previous". With fewer than two points
/// the change fields are zero.
pub fn fallback_from_closes(closes: &[f64]) -> ResolvedPrice {
    match closes {
        [] => ResolvedPrice::default(),
        [only] => ResolvedPrice {
            current_price: Some(*only),
            net_change: 0.0,
            percent_change: 0.0,
        },
        [.., prev, last] => {
            let (net_change, percent_change) = change_from(*last, Some(*prev));
            ResolvedPrice {
                current_price: Some(*last),
                net_change,
                percent_change,
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    // ---- change_from -----------------------------------------------------

    #[test]
    fn change_math_is_exact() {
        let (net, pct) = change_from(110.0, Some(100.0));
        assert_eq!(net, 10.0);
        assert_eq!(pct, net / 100.0 * 100.0);
    }

    #[test]
    fn negative_change() {
        let (net, pct) = change_from(95.0, Some(100.0));
        assert_eq!(net, -5.0);
        assert_eq!(pct, -5.0);
    }

    #[test]
    fn zero_prev_close_yields_zero_change() {
        let (net, pct) = change_from(110.0, Some(0.0));
        assert_eq!((net, pct), (0.0, 0.0));
    }

    #[test]
    fn missing_prev_close_yields_zero_change() {
        let (net, pct) = change_from(110.0, None);
        assert_eq!((net, pct), (0.0, 0.0));
    }

    #[test]
    fn change_is_never_nan_or_infinite() {
        for prev in [Some(0.0), Some(f64::NAN), Some(f64::INFINITY), None] {
            let (net, pct) = change_from(110.0, prev);
            assert!(net.is_finite() && pct.is_finite());
        }
        let (net, pct) = change_from(f64::NAN, Some(100.0));
        assert!(net.is_finite() && pct.is_finite());
    }

    // ---- fallback_from_closes --------------------------------------------

    #[test]
    fn fallback_uses_last_two_closes() {
        let closes = vec![90.0, 95.0, 100.0, 104.0];
        let resolved = fallback_from_closes(&closes);
        assert_eq!(resolved.current_price, Some(104.0));
        assert_eq!(resolved.net_change, 4.0);
        assert_eq!(resolved.percent_change, 4.0);
    }

    #[test]
    fn fallback_single_point_has_price_but_zero_change() {
        let resolved = fallback_from_closes(&[250.0]);
        assert_eq!(resolved.current_price, Some(250.0));
        assert_eq!((resolved.net_change, resolved.percent_change), (0.0, 0.0));
    }

    #[test]
    fn fallback_empty_series_is_all_zero() {
        let resolved = fallback_from_closes(&[]);
        assert_eq!(resolved, ResolvedPrice::default());
    }

    #[test]
    fn fallback_zero_prev_close_guarded() {
        let resolved = fallback_from_closes(&[0.0, 120.0]);
        assert_eq!(resolved.current_price, Some(120.0));
        assert_eq!((resolved.net_change, resolved.percent_change), (0.0, 0.0));
    }
}
