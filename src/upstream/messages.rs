use serde::Deserialize;

use crate::market::types::Quote;

/// Subset of the Upbit ticker frame the ingester consumes.
///
/// Frames without a `code` field fail deserialization and are ignored by the
/// feed; every other field is defaulted so a sparse frame still yields a
/// usable quote.
#[derive(Debug, Deserialize)]
pub struct TickerMessage {
    pub code: String,
    #[serde(default)]
    pub trade_price: f64,
    #[serde(default)]
    pub change: String,
    /// Signed fractional 24h change, e.g. `0.0123` for +1.23%.
    #[serde(default)]
    pub signed_change_rate: f64,
    #[serde(default)]
    pub acc_trade_volume_24h: f64,
    #[serde(default)]
    pub high_price: f64,
    #[serde(default)]
    pub low_price: f64,
    #[serde(default)]
    pub change_price: f64,
}

impl TickerMessage {
    pub fn into_quote(self) -> Quote {
        Quote {
            code: self.code,
            price: self.trade_price,
            change: self.change,
            change_rate: self.signed_change_rate * 100.0,
            volume: self.acc_trade_volume_24h,
            high: self.high_price,
            low: self.low_price,
            change_price: self.change_price,
        }
    }
}
