use std::time::Duration;

use coinpulse::{
    alerts::{AlertMonitor, SqlxAlertRepository},
    api::{self, ApiState},
    config::AppConfig,
    db::Db,
    logger::init_tracing,
    market::{MarketCache, StatsStore},
    signals::{SignalConfig, SignalDetector},
    stats::{HttpStatsProviders, StatsUpdater},
    stream::Broadcaster,
    upstream::{UpbitFeed, UpbitRestClient},
};
use tracing::{error, info, warn};

/// Connects the alert store and runs migrations.
async fn init_alert_store(database_url: &str) -> anyhow::Result<SqlxAlertRepository> {
    let db = Db::connect(database_url).await?;
    db.migrate().await?;
    Ok(SqlxAlertRepository::new(db.pool.clone()))
}

fn start_signal_detector(rest: UpbitRestClient, cfg: &AppConfig, broadcaster: Broadcaster) {
    let detector = SignalDetector::new(
        rest,
        SignalConfig {
            markets: cfg.signal_markets.clone(),
            interval: cfg.signal_interval,
            recovery: cfg.signal_recovery,
            rsi_low: cfg.rsi_low,
            rsi_high: cfg.rsi_high,
            ..SignalConfig::default()
        },
        broadcaster,
    );

    tokio::spawn(detector.run());
}

fn start_stats_updater(
    cache: MarketCache,
    stats: StatsStore,
    interval: Duration,
) -> anyhow::Result<()> {
    let providers = HttpStatsProviders::new()?;
    let updater = StatsUpdater::new(providers, cache, stats, interval, None);

    tokio::spawn(updater.run());
    Ok(())
}

/// The alert monitor only runs when an alert store is configured; a missing
/// or unreachable store disables it for the life of the process.
async fn start_alert_monitor(cfg: &AppConfig, cache: MarketCache, broadcaster: Broadcaster) {
    let Some(url) = &cfg.database_url else {
        warn!("DATABASE_URL not set; alert monitor disabled");
        return;
    };

    match init_alert_store(url).await {
        Ok(repo) => {
            let monitor = AlertMonitor::new(repo, cache, broadcaster, cfg.alert_poll_interval);
            tokio::spawn(monitor.run());
        }
        Err(e) => error!(error = ?e, "alert store unavailable; alert monitor disabled"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    info!("starting coinpulse backend");

    let cfg = AppConfig::from_env();

    let cache = MarketCache::new();
    let stats = StatsStore::new();
    let broadcaster = Broadcaster::new();

    // Upstream ingester: sole writer of the market cache.
    let feed = UpbitFeed::new(
        cfg.upstream_ws_url.clone(),
        cfg.upstream_ticket.clone(),
        cfg.markets.clone(),
        cfg.upstream_retry,
    );
    tokio::spawn(feed.run(cache.clone(), broadcaster.clone()));

    let rest = UpbitRestClient::new(cfg.upstream_rest_url.clone())?;

    start_signal_detector(rest.clone(), &cfg, broadcaster.clone());
    start_stats_updater(cache.clone(), stats.clone(), cfg.stats_interval)?;
    start_alert_monitor(&cfg, cache.clone(), broadcaster.clone()).await;

    let state = ApiState {
        cache,
        stats,
        broadcaster,
        rest,
        rsi_low: cfg.rsi_low,
        rsi_high: cfg.rsi_high,
    };

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!(addr = %cfg.bind_addr, "http server listening");
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
