use std::sync::Arc;

use tokio::sync::RwLock;

use crate::market::types::MarketStats;

/// Shared holder of the aggregate market statistics object.
///
/// Updated incrementally by the stats aggregator; each update mutates only
/// the fields its caller actually computed, so a failed upstream branch
/// cannot blank out fields written by another.
#[derive(Clone, Default)]
pub struct StatsStore {
    inner: Arc<RwLock<MarketStats>>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stats object.
    pub async fn read(&self) -> MarketStats {
        self.inner.read().await.clone()
    }

    /// Field-scoped update under the write lock.
    pub async fn update(&self, f: impl FnOnce(&mut MarketStats)) {
        let mut g = self.inner.write().await;
        f(&mut g);
    }
}
