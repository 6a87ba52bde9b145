// =============================================================================
// Indicator Pipeline — candles in, snapshot out
// =============================================================================
//
// The one non-glue path in the backend:
//
//   1. fetch one year of daily candles for the instrument
//   2. derive RSI(14) and DMA(20/50/200) from the closing prices
//   3. resolve a current price: live quote, or historical fallback when the
//      market is closed
//   4. merge everything into one IndicatorSnapshot
//
// Indicator fields degrade independently: a newly listed stock with 60
// trading days gets RSI/DMA-20/DMA-50 and a null DMA-200.
// =============================================================================

pub mod resolver;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::debug;

use crate::broker::BrokerClient;
use crate::indicators::{self, IndicatorSet};
use crate::types::{IndicatorSnapshot, Session};

use resolver::ResolvedPrice;

/// Interval token the daily pipeline pins.
pub const DAILY_INTERVAL: &str = "ONE_DAY";

/// History window feeding the indicator calculation.
const HISTORY_DAYS: i64 = 365;

/// Build the full indicator/price snapshot for one instrument.
pub async fn indicator_snapshot(
    broker: &BrokerClient,
    session: &Session,
    exchange: &str,
    symbol_token: &str,
) -> Result<IndicatorSnapshot> {
    let to = Utc::now();
    let from = to - Duration::days(HISTORY_DAYS);

    let candles = broker
        .candles(session, exchange, symbol_token, DAILY_INTERVAL, from, to)
        .await?;
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let set = indicators::compute(&closes);
    let price = resolver::resolve_price(broker, session, exchange, symbol_token, &closes).await;

    debug!(
        exchange,
        symbol_token,
        closes = closes.len(),
        live = price.current_price.is_some(),
        "indicator snapshot built"
    );

    Ok(compose(set, price))
}

/// Merge indicator values and the resolved price into the response shape.
/// Change fields are always concrete numbers (zero in the degraded cases);
/// everything else stays null when its window was not reachable.
fn compose(set: IndicatorSet, price: ResolvedPrice) -> IndicatorSnapshot {
    IndicatorSnapshot {
        current_price: price.current_price,
        net_change: Some(price.net_change),
        percent_change: Some(price.percent_change),
        rsi: set.rsi,
        dma_20: set.dma_20,
        dma_50: set.dma_50,
        dma_200: set.dma_200,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_merges_both_sides() {
        let set = IndicatorSet {
            rsi: Some(61.2),
            dma_20: Some(101.0),
            dma_50: None,
            dma_200: None,
        };
        let price = ResolvedPrice {
            current_price: Some(104.0),
            net_change: 4.0,
            percent_change: 4.0,
        };
        let snap = compose(set, price);
        assert_eq!(snap.current_price, Some(104.0));
        assert_eq!(snap.net_change, Some(4.0));
        assert_eq!(snap.rsi, Some(61.2));
        assert!(snap.dma_50.is_none());
    }

    #[test]
    fn snapshot_serializes_missing_fields_as_null() {
        let snap = compose(IndicatorSet::default(), ResolvedPrice::default());
        let json = serde_json::to_value(&snap).unwrap();
        assert!(json["currentPrice"].is_null());
        assert!(json["rsi"].is_null());
        assert!(json["dma200"].is_null());
        // Change fields are concrete zeros even in the fully degraded case.
        assert_eq!(json["netChange"], 0.0);
        assert_eq!(json["percentChange"], 0.0);
    }
}
