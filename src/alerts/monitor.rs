use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, instrument, warn};

use crate::alerts::model::UserAlert;
use crate::alerts::repository::AlertRepository;
use crate::market::cache::MarketCache;
use crate::market::types::{Quote, StreamEvent};
use crate::stream::broadcaster::Broadcaster;

/// Periodic user price-alert evaluator.
///
/// Each pass loads the active alerts, looks the asset up in the market cache
/// (alerts for markets that have not ticked yet are skipped silently) and
/// fires the ones whose condition is met. The monitor is only spawned when
/// an alert store is configured.
pub struct AlertMonitor<R> {
    repo: R,
    cache: MarketCache,
    broadcaster: Broadcaster,
    poll: Duration,
}

impl<R: AlertRepository> AlertMonitor<R> {
    pub fn new(repo: R, cache: MarketCache, broadcaster: Broadcaster, poll: Duration) -> Self {
        Self {
            repo,
            cache,
            broadcaster,
            poll,
        }
    }

    /// One evaluation pass over all active alerts.
    pub async fn run_once(&self) -> anyhow::Result<()> {
        let alerts = self.repo.fetch_active().await.context("fetch active alerts")?;

        for alert in alerts {
            let code = alert.market_code();
            let Some(quote) = self.cache.get(&code).await else {
                continue;
            };

            if alert.condition.is_met(quote.price, alert.target_price) {
                self.fire(&alert, &quote).await;
            }
        }

        Ok(())
    }

    /// Trigger side effects: history record, deactivation, broadcast.
    ///
    /// Each is best-effort and independently attempted. A crash between them
    /// re-arms the alert on the next pass; at-least-once delivery is the
    /// accepted contract here.
    async fn fire(&self, alert: &UserAlert, quote: &Quote) {
        info!(
            alert = %alert.id,
            asset = %alert.asset,
            price = quote.price,
            target = alert.target_price,
            "price alert triggered"
        );

        if let Err(e) = self
            .repo
            .insert_history(alert, quote.price, crate::time::now_ms())
            .await
        {
            warn!(alert = %alert.id, error = ?e, "failed to record alert history");
        }

        if let Err(e) = self.repo.deactivate(&alert.id).await {
            warn!(alert = %alert.id, error = ?e, "failed to deactivate alert");
        }

        self.broadcaster.broadcast(&StreamEvent::AlertTriggered {
            symbol: alert.market_code(),
            target_price: alert.target_price,
            condition: alert.condition,
            message: format!(
                "{} hit {:.0} (target {:.0})",
                alert.market_code(),
                quote.price,
                alert.target_price
            ),
            timestamp: crate::time::wall_clock_hms(),
        });
    }

    /// Run the monitor until process exit.
    #[instrument(skip(self))]
    pub async fn run(self) {
        info!(poll = ?self.poll, "alert monitor started");

        loop {
            if let Err(e) = self.run_once().await {
                error!(error = ?e, "alert evaluation pass failed");
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}
