use std::time::Duration;

/// KRW markets subscribed on the upstream ticker stream.
const DEFAULT_MARKETS: [&str; 18] = [
    "KRW-BTC", "KRW-ETH", "KRW-SOL", "KRW-XRP", "KRW-ADA", "KRW-DOGE", "KRW-DOT", "KRW-MATIC",
    "KRW-STX", "KRW-AVAX", "KRW-LINK", "KRW-CHZ", "KRW-NEAR", "KRW-ALGO", "KRW-FLOW", "KRW-SAND",
    "KRW-MANA", "KRW-EGLD",
];

/// Markets scanned by the momentum signal detector.
const DEFAULT_SIGNAL_MARKETS: [&str; 3] = ["KRW-BTC", "KRW-ETH", "KRW-SOL"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Upbit WebSocket endpoint for the realtime ticker stream.
    pub upstream_ws_url: String,

    /// Upbit REST base used for historical candles.
    pub upstream_rest_url: String,

    /// Ticket field sent with the upstream subscription frame.
    pub upstream_ticket: String,

    /// Markets subscribed on the ticker stream.
    pub markets: Vec<String>,

    /// Delay before re-dialing the upstream feed after any failure.
    ///
    /// Fixed, not exponential: the feed retries forever and a short
    /// constant delay keeps the cache fresh after transient drops.
    pub upstream_retry: Duration,

    /// Socket address the HTTP/WebSocket server binds to.
    pub bind_addr: String,

    // =========================
    // Signal detector
    // =========================
    /// Markets scanned for oversold/overbought conditions.
    pub signal_markets: Vec<String>,

    /// Cadence of a full detector scan.
    pub signal_interval: Duration,

    /// Shorter delay applied after a failed detector iteration.
    pub signal_recovery: Duration,

    /// RSI below this value flags an oversold market (BUY).
    pub rsi_low: f64,

    /// RSI above this value flags an overbought market (SELL).
    pub rsi_high: f64,

    // =========================
    // Alert monitor
    // =========================
    /// Cadence of an alert evaluation pass.
    pub alert_poll_interval: Duration,

    /// Alert store connection string.
    ///
    /// When unset the alert monitor is not started at all; the rest of the
    /// system runs unchanged.
    pub database_url: Option<String>,

    // =========================
    // Market stats aggregator
    // =========================
    /// Cadence of a stats aggregation pass.
    pub stats_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            upstream_ws_url: env_or("UPBIT_WS_URL", "wss://api.upbit.com/websocket/v1"),
            upstream_rest_url: env_or("UPBIT_REST_URL", "https://api.upbit.com/v1"),
            upstream_ticket: env_or("UPBIT_TICKET", "coinpulse"),
            markets: DEFAULT_MARKETS.iter().map(|s| s.to_string()).collect(),
            upstream_retry: env_secs("UPSTREAM_RETRY_SECS", 5),

            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),

            signal_markets: DEFAULT_SIGNAL_MARKETS.iter().map(|s| s.to_string()).collect(),
            signal_interval: env_secs("SIGNAL_INTERVAL_SECS", 60),
            signal_recovery: env_secs("SIGNAL_RECOVERY_SECS", 10),
            rsi_low: env_parse("RSI_LOW", 30.0),
            rsi_high: env_parse("RSI_HIGH", 70.0),

            alert_poll_interval: env_secs("ALERT_POLL_SECS", 10),
            database_url: std::env::var("DATABASE_URL").ok(),

            stats_interval: env_secs("STATS_INTERVAL_SECS", 60),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(env_parse(key, default))
}
