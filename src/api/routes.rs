use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::ApiState;
use crate::market::types::{MarketStats, Quote};
use crate::portfolio::{self, PortfolioView};
use crate::signals::indicators as ind;
use crate::upstream::CandleInterval;

/// Upstream proxy failure mapped onto an HTTP response.
///
/// Cache-backed endpoints never return this; only the candle proxy paths
/// can, when Upbit itself is unreachable.
pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self.0, "upstream proxy request failed");
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "coinpulse api is running" }))
}

pub async fn market_summary(State(state): State<ApiState>) -> Json<HashMap<String, Quote>> {
    Json(state.cache.snapshot().await)
}

pub async fn market_stats(State(state): State<ApiState>) -> Json<MarketStats> {
    Json(state.stats.read().await)
}

#[derive(Debug, Serialize)]
pub struct IndicatorSummary {
    pub symbol: String,
    pub rsi: Option<f64>,
    pub ma7: Option<f64>,
    pub ma20: Option<f64>,
    pub last_price: Option<f64>,
    pub recommendation: String,
}

pub async fn indicators(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
) -> Result<Json<IndicatorSummary>, ApiError> {
    let mut candles = state.rest.candles(&symbol, CandleInterval::Days, 50).await?;
    candles.reverse();

    let prices: Vec<f64> = candles.iter().map(|c| c.trade_price).collect();
    let rsi = ind::rsi(&prices, 14);

    let recommendation = match rsi {
        Some(v) if v < state.rsi_low => "Strong Buy",
        Some(v) if v > state.rsi_high => "Strong Sell",
        _ => "Hold",
    };

    Ok(Json(IndicatorSummary {
        symbol,
        rsi,
        ma7: ind::sma(&prices, 7),
        ma20: ind::sma(&prices, 20),
        last_price: prices.last().copied(),
        recommendation: recommendation.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CandleQuery {
    pub interval: Option<String>,
    pub count: Option<u32>,
}

/// One chart point: OHLCV plus a short display timestamp.
#[derive(Debug, Serialize)]
pub struct ChartCandle {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub vol: f64,
}

pub async fn candles(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<Vec<ChartCandle>>, ApiError> {
    let interval = CandleInterval::parse(query.interval.as_deref().unwrap_or("days"));
    let count = query.count.unwrap_or(50);

    let mut candles = state.rest.candles(&symbol, interval, count).await?;
    candles.reverse();

    let chart = candles
        .into_iter()
        .map(|c| ChartCandle {
            time: format_candle_time(&c.candle_date_time_kst, interval.is_intraday()),
            open: c.opening_price,
            high: c.high_price,
            low: c.low_price,
            close: c.trade_price,
            vol: c.candle_acc_trade_volume,
        })
        .collect();

    Ok(Json(chart))
}

pub async fn portfolio(State(state): State<ApiState>) -> Json<PortfolioView> {
    let quotes = state.cache.snapshot().await;
    Json(portfolio::value_portfolio(&portfolio::demo_holdings(), &quotes))
}

/// `MM-DD` for day-or-longer candles, `HH:MM` for intraday ones.
/// Input is the KST open time, `YYYY-MM-DDTHH:MM:SS`.
fn format_candle_time(kst: &str, intraday: bool) -> String {
    let formatted = if intraday {
        kst.split('T').nth(1).and_then(|t| t.get(..5))
    } else {
        kst.split('T').next().and_then(|d| d.get(5..))
    };

    formatted.unwrap_or(kst).to_string()
}
