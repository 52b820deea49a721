use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Global aggregate market snapshot.
#[derive(Clone, Debug)]
pub struct GlobalSnapshot {
    pub total_market_cap_usd: f64,
    pub btc_dominance_pct: f64,
    pub market_cap_change_24h_pct: f64,
}

/// Read-only external sources feeding the market-stats aggregator.
///
/// Split per call so the updater can join the three fetches concurrently
/// and merge whatever subset succeeded.
#[async_trait]
pub trait StatsProviders: Send + Sync {
    /// BTC spot price on the global reference exchange, in USD.
    async fn reference_btc_usd(&self) -> anyhow::Result<f64>;

    /// USD→KRW conversion rate.
    async fn usd_krw_rate(&self) -> anyhow::Result<f64>;

    /// Global aggregate market snapshot.
    async fn global_snapshot(&self) -> anyhow::Result<GlobalSnapshot>;
}

#[derive(Debug, Deserialize)]
struct BinancePrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeRates {
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct GlobalEnvelope {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    total_market_cap: HashMap<String, f64>,
    market_cap_percentage: HashMap<String, f64>,
    market_cap_change_percentage_24h_usd: f64,
}

/// HTTP implementation over Binance, exchangerate-api and CoinGecko.
#[derive(Clone)]
pub struct HttpStatsProviders {
    http: Client,
    binance_url: String,
    exchange_rate_url: String,
    global_url: String,
}

impl HttpStatsProviders {
    pub fn new() -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("build stats http client")?;

        Ok(Self {
            http,
            binance_url: "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT".to_string(),
            exchange_rate_url: "https://api.exchangerate-api.com/v4/latest/USD".to_string(),
            global_url: "https://api.coingecko.com/api/v3/global".to_string(),
        })
    }
}

#[async_trait]
impl StatsProviders for HttpStatsProviders {
    #[instrument(skip(self), level = "debug")]
    async fn reference_btc_usd(&self) -> anyhow::Result<f64> {
        let resp: BinancePrice = self
            .http
            .get(&self.binance_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let price: f64 = resp.price.parse().context("parse binance price")?;
        debug!(price, "reference spot fetched");
        Ok(price)
    }

    #[instrument(skip(self), level = "debug")]
    async fn usd_krw_rate(&self) -> anyhow::Result<f64> {
        let resp: ExchangeRates = self
            .http
            .get(&self.exchange_rate_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let rate = resp
            .rates
            .get("KRW")
            .copied()
            .ok_or_else(|| anyhow!("KRW missing from exchange rates"))?;
        debug!(rate, "usd/krw rate fetched");
        Ok(rate)
    }

    #[instrument(skip(self), level = "debug")]
    async fn global_snapshot(&self) -> anyhow::Result<GlobalSnapshot> {
        let resp: GlobalEnvelope = self
            .http
            .get(&self.global_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let total_market_cap_usd = resp
            .data
            .total_market_cap
            .get("usd")
            .copied()
            .ok_or_else(|| anyhow!("usd missing from total market cap"))?;
        let btc_dominance_pct = resp
            .data
            .market_cap_percentage
            .get("btc")
            .copied()
            .ok_or_else(|| anyhow!("btc missing from market cap percentage"))?;

        Ok(GlobalSnapshot {
            total_market_cap_usd,
            btc_dominance_pct,
            market_cap_change_24h_pct: resp.data.market_cap_change_percentage_24h_usd,
        })
    }
}
