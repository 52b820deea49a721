use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::alerts::model::AlertCondition;

/// Latest observed ticker state for one market.
///
/// Overwritten wholesale by the upstream ingester on every tick; readers
/// always see a complete quote, never a partially updated one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Exchange-qualified market code, e.g. `KRW-BTC`.
    pub code: String,

    /// Last trade price.
    pub price: f64,

    /// Upstream direction flag (`RISE` / `EVEN` / `FALL`).
    pub change: String,

    /// Signed 24h change rate, in percent.
    pub change_rate: f64,

    /// Accumulated 24h trade volume.
    pub volume: f64,

    /// 24h high.
    pub high: f64,

    /// 24h low.
    pub low: f64,

    /// Absolute 24h price change.
    pub change_price: f64,
}

/// Trade direction carried by a momentum signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
}

/// Everything pushed to downstream subscribers.
///
/// Immutable once constructed; serialized exactly once per broadcast.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Live ticker republished straight from the upstream feed.
    Tick {
        #[serde(flatten)]
        quote: Quote,
    },

    /// Oversold/overbought momentum signal from the detector.
    Signal {
        symbol: String,
        rsi: f64,
        action: SignalAction,
        message: String,
        timestamp: String,
    },

    /// A user price alert fired.
    AlertTriggered {
        symbol: String,
        target_price: f64,
        condition: AlertCondition,
        message: String,
        timestamp: String,
    },

    /// Full cache snapshot, sent once when a subscriber joins.
    Snapshot { data: HashMap<String, Quote> },
}

/// Aggregate market statistics shown on the dashboard header.
///
/// Pre-formatted display strings; each field is updated independently by the
/// stats aggregator and keeps its previous value when an upstream branch
/// fails.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketStats {
    pub market_cap: String,
    pub market_cap_change: String,
    pub kimchi_premium: String,
    pub kimchi_change: String,
    pub dominance: String,
    pub liquidations_24h: String,
}

impl Default for MarketStats {
    fn default() -> Self {
        Self {
            market_cap: "₩3,450T".to_string(),
            market_cap_change: "+1.2%".to_string(),
            kimchi_premium: "+0.00%".to_string(),
            kimchi_change: "0.0%".to_string(),
            dominance: "52.4%".to_string(),
            liquidations_24h: "₩1,650억".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(code: &str, price: f64) -> Quote {
        Quote {
            code: code.to_string(),
            price,
            change: "RISE".to_string(),
            change_rate: 1.5,
            volume: 1000.0,
            high: price * 1.1,
            low: price * 0.9,
            change_price: 10.0,
        }
    }

    #[test]
    fn tick_event_is_flat() {
        let ev = StreamEvent::Tick {
            quote: quote("KRW-BTC", 100.0),
        };
        let v: serde_json::Value = serde_json::from_str(&serde_json::to_string(&ev).unwrap()).unwrap();
        assert_eq!(v["type"], "tick");
        assert_eq!(v["code"], "KRW-BTC");
        assert_eq!(v["price"], 100.0);
    }

    #[test]
    fn signal_action_serializes_uppercase() {
        let ev = StreamEvent::Signal {
            symbol: "KRW-BTC".to_string(),
            rsi: 25.0,
            action: SignalAction::Buy,
            message: "m".to_string(),
            timestamp: "00:00:00".to_string(),
        };
        let v: serde_json::Value = serde_json::from_str(&serde_json::to_string(&ev).unwrap()).unwrap();
        assert_eq!(v["type"], "signal");
        assert_eq!(v["action"], "BUY");
    }
}
