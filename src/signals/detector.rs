use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, instrument};

use crate::market::types::{SignalAction, StreamEvent};
use crate::signals::indicators;
use crate::stream::broadcaster::Broadcaster;
use crate::upstream::rest::CandleSource;

/// Tuning for the momentum signal detector.
///
/// Thresholds are deliberately configuration, not constants; deployments
/// run anything from 30/70 to 40/60.
#[derive(Clone, Debug)]
pub struct SignalConfig {
    /// Markets scanned each iteration.
    pub markets: Vec<String>,
    /// Cadence of a full scan.
    pub interval: Duration,
    /// Shorter delay applied after a failed iteration.
    pub recovery: Duration,
    /// RSI below this emits a BUY signal.
    pub rsi_low: f64,
    /// RSI above this emits a SELL signal.
    pub rsi_high: f64,
    /// Candles fetched per market.
    pub candle_count: u32,
    /// RSI lookback period.
    pub rsi_period: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            markets: vec![
                "KRW-BTC".to_string(),
                "KRW-ETH".to_string(),
                "KRW-SOL".to_string(),
            ],
            interval: Duration::from_secs(60),
            recovery: Duration::from_secs(10),
            rsi_low: 30.0,
            rsi_high: 70.0,
            candle_count: 50,
            rsi_period: 14,
        }
    }
}

/// Periodic oversold/overbought detector.
///
/// Each iteration pulls recent daily candles per market, computes the RSI
/// and broadcasts a signal event when a threshold is crossed. A failed
/// iteration is logged and retried after the recovery delay; it never
/// affects the other background loops.
pub struct SignalDetector<C> {
    source: C,
    config: SignalConfig,
    broadcaster: Broadcaster,
}

impl<C: CandleSource> SignalDetector<C> {
    pub fn new(source: C, config: SignalConfig, broadcaster: Broadcaster) -> Self {
        Self {
            source,
            config,
            broadcaster,
        }
    }

    /// One full scan over the configured markets.
    pub async fn run_once(&self) -> anyhow::Result<()> {
        for market in &self.config.markets {
            let mut candles = self
                .source
                .daily_candles(market, self.config.candle_count)
                .await
                .with_context(|| format!("fetch candles for {market}"))?;

            // Upstream returns newest first; the RSI wants oldest first.
            candles.reverse();
            let prices: Vec<f64> = candles.iter().map(|c| c.trade_price).collect();

            let Some(value) = indicators::rsi(&prices, self.config.rsi_period) else {
                continue;
            };

            if let Some(event) = self.evaluate(market, value) {
                info!(market = %market, rsi = value, "momentum signal detected");
                self.broadcaster.broadcast(&event);
            }
        }

        Ok(())
    }

    /// Threshold check only, no I/O.
    fn evaluate(&self, market: &str, value: f64) -> Option<StreamEvent> {
        let (action, side) = if value < self.config.rsi_low {
            (SignalAction::Buy, "Oversold")
        } else if value > self.config.rsi_high {
            (SignalAction::Sell, "Overbought")
        } else {
            return None;
        };

        Some(StreamEvent::Signal {
            symbol: market.to_string(),
            rsi: value,
            action,
            message: format!("{market} RSI is {value:.2} - {side}!"),
            timestamp: crate::time::wall_clock_hms(),
        })
    }

    /// Run the detector until process exit.
    #[instrument(skip(self), fields(markets = self.config.markets.len()))]
    pub async fn run(self) {
        info!(
            interval = ?self.config.interval,
            low = self.config.rsi_low,
            high = self.config.rsi_high,
            "signal detector started"
        );

        loop {
            match self.run_once().await {
                Ok(()) => tokio::time::sleep(self.config.interval).await,
                Err(e) => {
                    error!(error = ?e, "signal detector iteration failed");
                    tokio::time::sleep(self.config.recovery).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::SignalAction;

    struct NoopSource;

    #[async_trait::async_trait]
    impl CandleSource for NoopSource {
        async fn daily_candles(
            &self,
            _market: &str,
            _count: u32,
        ) -> anyhow::Result<Vec<crate::upstream::rest::Candle>> {
            Ok(Vec::new())
        }
    }

    fn detector(low: f64, high: f64) -> SignalDetector<NoopSource> {
        SignalDetector::new(
            NoopSource,
            SignalConfig {
                rsi_low: low,
                rsi_high: high,
                ..SignalConfig::default()
            },
            Broadcaster::new(),
        )
    }

    fn action_of(event: &StreamEvent) -> SignalAction {
        match event {
            StreamEvent::Signal { action, .. } => *action,
            other => panic!("expected signal event, got {other:?}"),
        }
    }

    #[test]
    fn below_low_threshold_is_buy() {
        let d = detector(30.0, 70.0);
        let ev = d.evaluate("KRW-BTC", 25.0).unwrap();
        assert_eq!(action_of(&ev), SignalAction::Buy);

        match ev {
            StreamEvent::Signal { message, .. } => {
                assert!(message.contains("25.00"));
                assert!(message.contains("Oversold"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn above_high_threshold_is_sell() {
        let d = detector(30.0, 70.0);
        let ev = d.evaluate("KRW-ETH", 80.5).unwrap();
        assert_eq!(action_of(&ev), SignalAction::Sell);
    }

    #[test]
    fn neutral_value_emits_nothing() {
        let d = detector(30.0, 70.0);
        assert!(d.evaluate("KRW-BTC", 50.0).is_none());
        assert!(d.evaluate("KRW-BTC", 30.0).is_none());
        assert!(d.evaluate("KRW-BTC", 70.0).is_none());
    }

    #[test]
    fn thresholds_are_configurable() {
        let d = detector(40.0, 60.0);
        assert_eq!(action_of(&d.evaluate("KRW-BTC", 35.0).unwrap()), SignalAction::Buy);
        assert_eq!(action_of(&d.evaluate("KRW-BTC", 65.0).unwrap()), SignalAction::Sell);
        assert!(d.evaluate("KRW-BTC", 50.0).is_none());
    }
}
