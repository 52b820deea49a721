use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::market::cache::MarketCache;
use crate::market::stats_store::StatsStore;
use crate::market::types::MarketStats;
use crate::stats::providers::StatsProviders;

/// Optional non-authoritative write-through target for the stats object.
///
/// Absence removes the mirroring side effect and nothing else.
#[async_trait]
pub trait StatsMirror: Send + Sync {
    async fn store(&self, stats: &MarketStats, ttl: Duration) -> anyhow::Result<()>;
}

/// Periodic market-stats aggregator.
///
/// One pass issues the three external reads concurrently and merges the
/// results field by field: a failed branch leaves its fields at their
/// previous value. The premium additionally needs a domestic BTC print in
/// the cache and is skipped until one arrives.
pub struct StatsUpdater<P> {
    providers: P,
    cache: MarketCache,
    store: StatsStore,
    interval: Duration,
    mirror: Option<Arc<dyn StatsMirror>>,
    mirror_ttl: Duration,
}

impl<P: StatsProviders> StatsUpdater<P> {
    pub fn new(
        providers: P,
        cache: MarketCache,
        store: StatsStore,
        interval: Duration,
        mirror: Option<Arc<dyn StatsMirror>>,
    ) -> Self {
        Self {
            providers,
            cache,
            store,
            interval,
            mirror,
            mirror_ttl: Duration::from_secs(60),
        }
    }

    /// One aggregation pass. Never fails; partial results are merged.
    pub async fn run_once(&self) {
        let (spot, rate, global) = tokio::join!(
            self.providers.reference_btc_usd(),
            self.providers.usd_krw_rate(),
            self.providers.global_snapshot(),
        );

        let usd_krw = match rate {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = ?e, "usd/krw rate fetch failed");
                None
            }
        };

        // Premium needs the foreign spot, the fx rate and a domestic print.
        let premium = match (spot, usd_krw) {
            (Ok(spot), Some(rate)) => match self.cache.get("KRW-BTC").await {
                Some(domestic) => {
                    let global_krw = spot * rate;
                    Some(((domestic.price - global_krw) / global_krw) * 100.0)
                }
                None => {
                    debug!("no domestic BTC print yet; skipping premium");
                    None
                }
            },
            (Err(e), _) => {
                warn!(error = ?e, "reference spot fetch failed");
                None
            }
            _ => None,
        };

        let global = match global {
            Ok(g) => Some(g),
            Err(e) => {
                warn!(error = ?e, "global snapshot fetch failed");
                None
            }
        };

        self.store
            .update(|stats| {
                if let Some(p) = premium {
                    stats.kimchi_premium = if p >= 0.0 {
                        format!("+{p:.2}%")
                    } else {
                        format!("{p:.2}%")
                    };
                }

                if let (Some(g), Some(rate)) = (&global, usd_krw) {
                    stats.market_cap = format!("₩{:.1}T", g.total_market_cap_usd * rate / 1e12);
                }

                if let Some(g) = &global {
                    stats.dominance = format!("{:.1}%", g.btc_dominance_pct);
                    stats.market_cap_change = format!("{:.1}%", g.market_cap_change_24h_pct);
                }
            })
            .await;

        if let Some(mirror) = &self.mirror {
            let stats = self.store.read().await;
            if let Err(e) = mirror.store(&stats, self.mirror_ttl).await {
                warn!(error = ?e, "stats mirror write failed");
            }
        }
    }

    /// Run the aggregator until process exit.
    #[instrument(skip(self))]
    pub async fn run(self) {
        info!(interval = ?self.interval, "market stats updater started");

        loop {
            self.run_once().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
