use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One candle as returned by the Upbit REST API, newest first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candle {
    /// KST candle open time, `YYYY-MM-DDTHH:MM:SS`.
    pub candle_date_time_kst: String,
    pub opening_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    /// Close price of the candle.
    pub trade_price: f64,
    pub candle_acc_trade_volume: f64,
}

/// Candle granularity accepted by the proxy endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandleInterval {
    Minutes(u16),
    Days,
    Weeks,
    Months,
}

impl CandleInterval {
    /// Parse the querystring form. Anything unrecognized falls back to
    /// daily candles.
    pub fn parse(s: &str) -> Self {
        match s {
            "1" => Self::Minutes(1),
            "3" => Self::Minutes(3),
            "5" => Self::Minutes(5),
            "10" => Self::Minutes(10),
            "15" => Self::Minutes(15),
            "30" => Self::Minutes(30),
            "60" => Self::Minutes(60),
            "240" => Self::Minutes(240),
            "weeks" => Self::Weeks,
            "months" => Self::Months,
            _ => Self::Days,
        }
    }

    /// True for minute-granularity candles; drives timestamp formatting.
    pub fn is_intraday(&self) -> bool {
        matches!(self, Self::Minutes(_))
    }

    fn path(&self) -> String {
        match self {
            Self::Minutes(unit) => format!("candles/minutes/{unit}"),
            Self::Days => "candles/days".to_string(),
            Self::Weeks => "candles/weeks".to_string(),
            Self::Months => "candles/months".to_string(),
        }
    }
}

/// Read-only source of historical candles, newest first.
///
/// Abstracted so the signal detector can be driven by canned data in tests.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn daily_candles(&self, market: &str, count: u32) -> anyhow::Result<Vec<Candle>>;
}

/// Upbit REST client used for candle history.
#[derive(Clone)]
pub struct UpbitRestClient {
    http: Client,
    base_url: String,
}

impl UpbitRestClient {
    pub fn new(base_url: String) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, base_url })
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn candles(
        &self,
        market: &str,
        interval: CandleInterval,
        count: u32,
    ) -> Result<Vec<Candle>, UpstreamError> {
        let url = format!(
            "{}/{}?market={}&count={}",
            self.base_url,
            interval.path(),
            market,
            count
        );

        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let candles: Vec<Candle> = resp.json().await?;

        debug!(market, n = candles.len(), "candles fetched");
        Ok(candles)
    }
}

#[async_trait]
impl CandleSource for UpbitRestClient {
    async fn daily_candles(&self, market: &str, count: u32) -> anyhow::Result<Vec<Candle>> {
        Ok(self.candles(market, CandleInterval::Days, count).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_intervals_parse_to_minute_paths() {
        assert_eq!(CandleInterval::parse("5"), CandleInterval::Minutes(5));
        assert_eq!(CandleInterval::parse("240"), CandleInterval::Minutes(240));
        assert_eq!(CandleInterval::Minutes(15).path(), "candles/minutes/15");
        assert!(CandleInterval::parse("60").is_intraday());
    }

    #[test]
    fn unknown_interval_falls_back_to_days() {
        assert_eq!(CandleInterval::parse("days"), CandleInterval::Days);
        assert_eq!(CandleInterval::parse("hourly"), CandleInterval::Days);
        assert_eq!(CandleInterval::parse(""), CandleInterval::Days);
        assert!(!CandleInterval::parse("weeks").is_intraday());
    }
}
