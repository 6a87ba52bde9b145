// =============================================================================
// Simple Moving Average (SMA / DMA)
// =============================================================================
//
// The n-day moving average of closing price: the arithmetic mean of the
// trailing `period` closes. The dashboard labels these DMA-20/50/200.

/// Most recent `period`-SMA of `closes`, or `None` when fewer than `period`
/// points are available (or the result is non-finite).
pub fn latest_sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;

    mean.is_finite().then_some(mean)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_empty_input() {
        assert!(latest_sma(&[], 20).is_none());
    }

    #[test]
    fn sma_period_zero() {
        assert!(latest_sma(&[1.0, 2.0], 0).is_none());
    }

    #[test]
    fn sma_insufficient_data() {
        let closes: Vec<f64> = (1..=19).map(|x| x as f64).collect();
        assert!(latest_sma(&closes, 20).is_none());
    }

    #[test]
    fn sma_exact_window() {
        let closes = vec![2.0, 4.0, 6.0];
        let sma = latest_sma(&closes, 3).unwrap();
        assert!((sma - 4.0).abs() < 1e-10);
    }

    #[test]
    fn sma_uses_trailing_window_only() {
        // Mean of the last 3 of [10, 10, 1, 2, 3] is 2.0 — the leading 10s
        // must not contribute.
        let closes = vec![10.0, 10.0, 1.0, 2.0, 3.0];
        let sma = latest_sma(&closes, 3).unwrap();
        assert!((sma - 2.0).abs() < 1e-10);
    }

    #[test]
    fn sma_nan_in_window_yields_none() {
        let closes = vec![1.0, f64::NAN, 3.0];
        assert!(latest_sma(&closes, 3).is_none());
    }
}
