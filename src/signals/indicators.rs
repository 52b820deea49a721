//! Momentum indicator arithmetic over oldest-first price series.

/// Simple-average RSI over the trailing `period` price changes.
///
/// Returns `None` until at least `period + 1` prices are available. A window
/// with no losses saturates at 100, no gains at 0.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &deltas[deltas.len() - period..];

    let avg_gain = tail.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let avg_loss = tail.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Simple moving average of the trailing `window` prices.
pub fn sma(prices: &[f64], window: usize) -> Option<f64> {
    if window == 0 || prices.len() < window {
        return None;
    }

    let tail = &prices[prices.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// 15 prices falling by 2 each step: 100, 98, ..., 72.
    fn falling_series() -> Vec<f64> {
        (0..15).map(|i| 100.0 - 2.0 * i as f64).collect()
    }

    #[test]
    fn sustained_losses_push_rsi_below_30() {
        let value = rsi(&falling_series(), 14).unwrap();
        assert!(value < 30.0, "expected oversold, got {value}");
    }

    #[test]
    fn sustained_gains_push_rsi_above_70() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + 2.0 * i as f64).collect();
        let value = rsi(&prices, 14).unwrap();
        assert!(value > 70.0, "expected overbought, got {value}");
    }

    #[test]
    fn mixed_series_stays_in_the_middle() {
        let prices: Vec<f64> = (0..20)
            .map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let value = rsi(&prices, 14).unwrap();
        assert!((30.0..=70.0).contains(&value), "got {value}");
    }

    #[test]
    fn short_series_yields_none() {
        let prices: Vec<f64> = (0..14).map(|i| i as f64).collect();
        assert!(rsi(&prices, 14).is_none());
        assert!(rsi(&[], 14).is_none());
    }

    #[test]
    fn sma_averages_the_trailing_window() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&prices, 2), Some(4.5));
        assert_eq!(sma(&prices, 5), Some(3.0));
        assert_eq!(sma(&prices, 6), None);
    }

    proptest! {
        #[test]
        fn rsi_is_bounded(prices in prop::collection::vec(1.0f64..1e9, 15..60)) {
            if let Some(value) = rsi(&prices, 14) {
                prop_assert!((0.0..=100.0).contains(&value));
            }
        }
    }
}
