// =============================================================================
// Instrument master filtering
// =============================================================================

use serde::{Deserialize, Serialize};

/// One row of the broker's instrument master list.
///
/// The upstream file carries many more columns; only the ones the dashboard
/// consumes are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub token: String,
    pub symbol: String,
    pub name: String,
    #[serde(rename = "exch_seg")]
    pub exchange_segment: String,
    #[serde(default, rename = "instrumenttype")]
    pub instrument_type: String,
}

/// Filter the instrument master down to cash equities: the configured
/// exchange segment plus the equity symbol suffix (e.g. NSE + "-EQ").
/// Derivatives, indices and other segments never pass through.
pub fn equity_instruments(
    all: Vec<Instrument>,
    exchange_segment: &str,
    equity_suffix: &str,
) -> Vec<Instrument> {
    all.into_iter()
        .filter(|i| i.exchange_segment == exchange_segment && i.symbol.ends_with(equity_suffix))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn inst(symbol: &str, seg: &str) -> Instrument {
        Instrument {
            token: "1".into(),
            symbol: symbol.into(),
            name: symbol.trim_end_matches("-EQ").into(),
            exchange_segment: seg.into(),
            instrument_type: String::new(),
        }
    }

    #[test]
    fn keeps_only_matching_segment_and_suffix() {
        let all = vec![
            inst("RELIANCE-EQ", "NSE"),
            inst("RELIANCE-BE", "NSE"),
            inst("NIFTY24APRFUT", "NFO"),
            inst("TCS-EQ", "BSE"),
            inst("INFY-EQ", "NSE"),
        ];
        let filtered = equity_instruments(all, "NSE", "-EQ");
        let symbols: Vec<&str> = filtered.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["RELIANCE-EQ", "INFY-EQ"]);
    }

    #[test]
    fn empty_master_yields_empty() {
        assert!(equity_instruments(Vec::new(), "NSE", "-EQ").is_empty());
    }

    #[test]
    fn no_segment_leaks_through() {
        let all = vec![inst("SENSEX-EQ", "BSE"), inst("BANKNIFTY-EQ", "NFO")];
        assert!(equity_instruments(all, "NSE", "-EQ").is_empty());
    }
}
