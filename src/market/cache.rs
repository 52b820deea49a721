use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::market::types::Quote;

/// In-memory store of the latest quote per market.
///
/// Written only by the upstream ingester; read by every evaluator and the
/// HTTP handlers. Entries are replaced wholesale and never deleted, so a
/// reader observes either the previous or the new quote for a market.
#[derive(Clone, Default)]
pub struct MarketCache {
    inner: Arc<RwLock<HashMap<String, Quote>>>,
}

impl MarketCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest quote for a market. Last write wins.
    pub async fn put(&self, quote: Quote) {
        let mut g = self.inner.write().await;
        g.insert(quote.code.clone(), quote);
    }

    /// Latest quote for a market, if one has been observed.
    pub async fn get(&self, code: &str) -> Option<Quote> {
        let g = self.inner.read().await;
        g.get(code).cloned()
    }

    /// Clone of the full cache, keyed by market code.
    ///
    /// Per-entry consistency only; the snapshot is not a point-in-time view
    /// across markets, which is sufficient for subscriber-join payloads and
    /// aggregate reads.
    pub async fn snapshot(&self) -> HashMap<String, Quote> {
        let g = self.inner.read().await;
        g.clone()
    }

    /// True until the first tick has been ingested.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(code: &str, price: f64) -> Quote {
        Quote {
            code: code.to_string(),
            price,
            change: "RISE".to_string(),
            change_rate: 0.0,
            volume: 0.0,
            high: 0.0,
            low: 0.0,
            change_price: 0.0,
        }
    }

    #[tokio::test]
    async fn last_write_wins() {
        let cache = MarketCache::new();
        cache.put(quote("KRW-BTC", 1.0)).await;
        cache.put(quote("KRW-BTC", 2.0)).await;

        let q = cache.get("KRW-BTC").await.unwrap();
        assert_eq!(q.price, 2.0);
    }

    #[tokio::test]
    async fn get_unknown_market_is_none() {
        let cache = MarketCache::new();
        assert!(cache.get("KRW-ETH").await.is_none());
    }

    #[tokio::test]
    async fn snapshot_contains_every_market() {
        let cache = MarketCache::new();
        assert!(cache.is_empty().await);

        cache.put(quote("KRW-BTC", 1.0)).await;
        cache.put(quote("KRW-ETH", 2.0)).await;

        let snap = cache.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert_eq!(snap["KRW-ETH"].price, 2.0);
        assert!(!cache.is_empty().await);
    }
}
