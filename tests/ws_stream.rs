use std::time::Duration;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use coinpulse::{
    api::{self, ApiState},
    market::{
        MarketCache, StatsStore,
        types::{Quote, StreamEvent},
    },
    stream::Broadcaster,
    upstream::UpbitRestClient,
};

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

/// Serves the real router on a loopback port and returns the market
/// socket URL.
async fn serve(state: ApiState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        axum::serve(listener, api::router(state)).await.ok();
    });

    format!("ws://{addr}/ws/market")
}

fn state(cache: MarketCache, broadcaster: Broadcaster) -> ApiState {
    ApiState {
        cache,
        stats: StatsStore::new(),
        broadcaster,
        // Never dialed by the socket path.
        rest: UpbitRestClient::new("http://127.0.0.1:1".to_string()).expect("client"),
        rsi_low: 30.0,
        rsi_high: 70.0,
    }
}

async fn wait_for_subscribers(broadcaster: &Broadcaster, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if broadcaster.subscriber_count() == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "subscriber count never reached {expected}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn next_json(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>) -> serde_json::Value {
    let frame = ws.next().await.expect("frame").expect("ws message");
    serde_json::from_str(frame.to_text().expect("text frame")).expect("json payload")
}

#[tokio::test]
async fn join_gets_snapshot_first_then_live_events() {
    let cache = MarketCache::new();
    cache.put(quote("KRW-BTC", 100.0)).await;
    cache.put(quote("KRW-ETH", 200.0)).await;

    let broadcaster = Broadcaster::new();
    let url = serve(state(cache, broadcaster.clone())).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("connect");

    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "snapshot");
    assert_eq!(first["data"]["KRW-BTC"]["price"], 100.0);
    assert_eq!(first["data"]["KRW-ETH"]["price"], 200.0);

    // Only broadcast once the join path has registered the subscriber.
    wait_for_subscribers(&broadcaster, 1).await;
    broadcaster.broadcast(&StreamEvent::Tick {
        quote: quote("KRW-BTC", 101.0),
    });

    let second = next_json(&mut ws).await;
    assert_eq!(second["type"], "tick");
    assert_eq!(second["price"], 101.0);

    // Disconnecting removes the subscriber from the registry.
    ws.close(None).await.expect("close");
    wait_for_subscribers(&broadcaster, 0).await;
}

#[tokio::test]
async fn join_with_empty_cache_skips_the_snapshot() {
    let broadcaster = Broadcaster::new();
    let url = serve(state(MarketCache::new(), broadcaster.clone())).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("connect");

    wait_for_subscribers(&broadcaster, 1).await;
    broadcaster.broadcast(&StreamEvent::Tick {
        quote: quote("KRW-SOL", 42.0),
    });

    // No snapshot frame: the first thing on the wire is the live tick.
    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "tick");
    assert_eq!(first["code"], "KRW-SOL");

    ws.close(None).await.ok();
}
