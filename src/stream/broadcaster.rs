use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::market::types::StreamEvent;
use crate::time::now_ms;

/// Per-subscriber outbound queue depth. A subscriber that falls this far
/// behind is treated as dead and dropped rather than replayed.
const SUBSCRIBER_QUEUE: usize = 256;

/// Handle identifying one registered downstream connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscriber {
    joined_ms: u64,
    tx: mpsc::Sender<String>,
}

/// Registry of live downstream connections plus best-effort fan-out.
///
/// The broadcaster never touches a socket. Each subscriber is an mpsc sender
/// whose receiving end is drained by that connection's writer task, so a
/// stalled peer cannot block the registry or other subscribers. The registry
/// lock is held only for map mutation and for cloning the sender list, never
/// across a send.
#[derive(Clone, Default)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream connection and hand back its outbound queue.
    ///
    /// Every call creates a fresh subscriber, even for the same underlying
    /// peer.
    pub fn register(&self) -> (SubscriberId, mpsc::Receiver<String>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);

        self.inner.subscribers.lock().insert(
            id,
            Subscriber {
                joined_ms: now_ms(),
                tx,
            },
        );

        debug!(subscriber = id, "downstream subscriber registered");
        (SubscriberId(id), rx)
    }

    /// Remove a subscriber. Safe to call more than once.
    pub fn unregister(&self, id: SubscriberId) {
        if let Some(sub) = self.inner.subscribers.lock().remove(&id.0) {
            debug!(
                subscriber = id.0,
                session_ms = now_ms().saturating_sub(sub.joined_ms),
                "downstream subscriber removed"
            );
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Serialize `event` once and queue it to every registered subscriber.
    ///
    /// A subscriber whose queue is closed or full is dropped from the
    /// registry; the failure never surfaces to the caller and never affects
    /// delivery to the remaining subscribers. Events broadcast sequentially
    /// by one producer reach each surviving subscriber in that same order.
    pub fn broadcast(&self, event: &StreamEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to encode stream event; dropping it");
                return;
            }
        };

        let targets: Vec<(u64, mpsc::Sender<String>)> = {
            let g = self.inner.subscribers.lock();
            g.iter().map(|(id, s)| (*id, s.tx.clone())).collect()
        };

        let mut dead = Vec::new();
        for (id, tx) in targets {
            if let Err(e) = tx.try_send(payload.clone()) {
                warn!(subscriber = id, error = %e, "dropping unreachable subscriber");
                dead.push(id);
            }
        }

        for id in dead {
            self.unregister(SubscriberId(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{Quote, StreamEvent};

    fn tick(price: f64) -> StreamEvent {
        StreamEvent::Tick {
            quote: Quote {
                code: "KRW-BTC".to_string(),
                price,
                change: "RISE".to_string(),
                change_rate: 0.0,
                volume: 0.0,
                high: 0.0,
                low: 0.0,
                change_price: 0.0,
            },
        }
    }

    fn price_of(payload: &str) -> f64 {
        let v: serde_json::Value = serde_json::from_str(payload).unwrap();
        v["price"].as_f64().unwrap()
    }

    #[tokio::test]
    async fn events_arrive_in_broadcast_order() {
        let b = Broadcaster::new();
        let (_id, mut rx) = b.register();

        b.broadcast(&tick(1.0));
        b.broadcast(&tick(2.0));
        b.broadcast(&tick(3.0));

        assert_eq!(price_of(&rx.recv().await.unwrap()), 1.0);
        assert_eq!(price_of(&rx.recv().await.unwrap()), 2.0);
        assert_eq!(price_of(&rx.recv().await.unwrap()), 3.0);
    }

    #[tokio::test]
    async fn dead_subscriber_is_dropped_without_affecting_others() {
        let b = Broadcaster::new();
        let (_dead_id, dead_rx) = b.register();
        let (_live_id, mut live_rx) = b.register();
        assert_eq!(b.subscriber_count(), 2);

        // Closing the receiving end makes every send to it fail.
        drop(dead_rx);

        b.broadcast(&tick(42.0));

        assert_eq!(price_of(&live_rx.recv().await.unwrap()), 42.0);
        assert_eq!(b.subscriber_count(), 1);

        // Subsequent broadcasts only see the survivor.
        b.broadcast(&tick(43.0));
        assert_eq!(price_of(&live_rx.recv().await.unwrap()), 43.0);
        assert_eq!(b.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn slow_subscriber_is_dropped_once_queue_fills() {
        let b = Broadcaster::new();
        let (_id, _rx) = b.register();

        // Never drained; the queue eventually fills and the subscriber goes.
        for i in 0..=SUBSCRIBER_QUEUE {
            b.broadcast(&tick(i as f64));
        }

        assert_eq!(b.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let b = Broadcaster::new();
        let (id, _rx) = b.register();

        b.unregister(id);
        b.unregister(id);
        assert_eq!(b.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn each_register_call_creates_a_new_subscriber() {
        let b = Broadcaster::new();
        let (a, _rx_a) = b.register();
        let (c, _rx_c) = b.register();

        assert_ne!(a, c);
        assert_eq!(b.subscriber_count(), 2);
    }
}
