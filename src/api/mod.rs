pub mod routes;
pub mod ws;

use axum::Router;
use axum::routing::get;

use crate::market::{MarketCache, StatsStore};
use crate::stream::Broadcaster;
use crate::upstream::UpbitRestClient;

/// Shared state handed to every HTTP/WebSocket handler.
#[derive(Clone)]
pub struct ApiState {
    pub cache: MarketCache,
    pub stats: StatsStore,
    pub broadcaster: Broadcaster,
    pub rest: UpbitRestClient,
    pub rsi_low: f64,
    pub rsi_high: f64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/api/v1/market-summary", get(routes::market_summary))
        .route("/api/v1/market-stats", get(routes::market_stats))
        .route("/api/v1/indicators/{symbol}", get(routes::indicators))
        .route("/api/v1/candles/{symbol}", get(routes::candles))
        .route("/api/v1/portfolio", get(routes::portfolio))
        .route("/ws/market", get(ws::ws_market))
        .with_state(state)
}
