use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, instrument, warn};

use crate::market::cache::MarketCache;
use crate::market::types::StreamEvent;
use crate::stream::broadcaster::Broadcaster;
use crate::upstream::messages::TickerMessage;

/// Resilient Upbit ticker feed.
///
/// Holds one persistent WebSocket subscription for the configured markets,
/// writes every decoded ticker into the market cache (it is the sole writer)
/// and republishes it to downstream subscribers. On any failure it waits a
/// fixed delay and reconnects; the loop never terminates.
pub struct UpbitFeed {
    ws_url: String,
    ticket: String,
    markets: Vec<String>,
    retry: Duration,
}

impl UpbitFeed {
    pub fn new(ws_url: String, ticket: String, markets: Vec<String>, retry: Duration) -> Self {
        Self {
            ws_url,
            ticket,
            markets,
            retry,
        }
    }

    /// Upbit subscription frame: session ticket plus the ticker code list.
    fn subscribe_frame(&self) -> String {
        json!([
            { "ticket": self.ticket },
            { "type": "ticker", "codes": self.markets },
        ])
        .to_string()
    }

    /// Run the feed until process exit. Errors are logged and absorbed by
    /// the reconnect loop.
    #[instrument(skip_all, fields(url = %self.ws_url, markets = self.markets.len()))]
    pub async fn run(self, cache: MarketCache, broadcaster: Broadcaster) {
        loop {
            debug!("dialing upstream ticker feed");
            match connect_async(&self.ws_url).await {
                Ok((ws, _)) => {
                    info!("upstream feed connected");
                    let (mut write, mut read) = ws.split();

                    match write.send(Message::Text(self.subscribe_frame().into())).await {
                        Ok(()) => self.stream_until_error(&mut read, &cache, &broadcaster).await,
                        Err(e) => error!(error = ?e, "ticker subscription failed"),
                    }
                }
                Err(e) => error!(error = ?e, "upstream connection failed"),
            }

            warn!(delay = ?self.retry, "upstream feed disconnected; reconnecting");
            tokio::time::sleep(self.retry).await;
        }
    }

    /// Consume frames until the socket errors or closes.
    async fn stream_until_error<S>(
        &self,
        read: &mut S,
        cache: &MarketCache,
        broadcaster: &Broadcaster,
    ) where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        while let Some(msg) = read.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = ?e, "upstream stream error");
                    break;
                }
            };

            if msg.is_ping() || msg.is_pong() {
                continue;
            }

            // Upbit delivers ticker frames as binary; text is accepted too.
            let raw: &[u8] = match &msg {
                Message::Text(t) => t.as_bytes(),
                Message::Binary(b) => b,
                Message::Close(_) => {
                    warn!("upstream closed the connection");
                    break;
                }
                _ => continue,
            };

            // A frame that is not JSON at all means the stream is corrupt:
            // drop the connection and resubscribe. Valid JSON that is not a
            // ticker (status frames, frames without a code) is skipped.
            let value: serde_json::Value = match serde_json::from_slice(raw) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "undecodable upstream frame; dropping connection");
                    break;
                }
            };

            let ticker: TickerMessage = match serde_json::from_value(value) {
                Ok(t) => t,
                Err(e) => {
                    debug!(error = %e, "skipping non-ticker upstream frame");
                    continue;
                }
            };

            let quote = ticker.into_quote();
            debug!(code = %quote.code, price = quote.price, "ticker received");

            cache.put(quote.clone()).await;
            broadcaster.broadcast(&StreamEvent::Tick { quote });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn feed() -> UpbitFeed {
        UpbitFeed::new(
            "ws://unused".to_string(),
            "test".to_string(),
            vec!["KRW-BTC".to_string()],
            Duration::from_millis(1),
        )
    }

    fn ticker_frame(price: f64) -> Message {
        Message::Text(
            json!({
                "type": "ticker",
                "code": "KRW-BTC",
                "trade_price": price,
                "change": "RISE",
                "signed_change_rate": 0.0,
                "acc_trade_volume_24h": 0.0,
                "high_price": price,
                "low_price": price,
                "change_price": 0.0
            })
            .to_string()
            .into(),
        )
    }

    #[tokio::test]
    async fn corrupt_frame_drops_the_connection() {
        let cache = MarketCache::new();
        let broadcaster = Broadcaster::new();

        let frames: Vec<Result<Message, tungstenite::Error>> = vec![
            Ok(ticker_frame(1.0)),
            Ok(Message::Text("not json".into())),
            Ok(ticker_frame(2.0)),
        ];
        let mut frames = stream::iter(frames);

        feed()
            .stream_until_error(&mut frames, &cache, &broadcaster)
            .await;

        // Bailed out on the corrupt frame: the one after it was never read.
        assert_eq!(cache.get("KRW-BTC").await.unwrap().price, 1.0);
        assert!(frames.next().await.is_some());
    }

    #[tokio::test]
    async fn non_ticker_json_is_skipped_in_place() {
        let cache = MarketCache::new();
        let broadcaster = Broadcaster::new();

        let frames: Vec<Result<Message, tungstenite::Error>> = vec![
            Ok(Message::Text(r#"{"status": "UP"}"#.into())),
            Ok(ticker_frame(3.0)),
        ];
        let mut frames = stream::iter(frames);

        feed()
            .stream_until_error(&mut frames, &cache, &broadcaster)
            .await;

        assert_eq!(cache.get("KRW-BTC").await.unwrap().price, 3.0);
    }
}
