use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::debug;

use crate::api::ApiState;
use crate::market::types::StreamEvent;

pub async fn ws_market(State(state): State<ApiState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One downstream subscriber connection.
///
/// The joining snapshot is written first, then a writer task drains the
/// subscriber's broadcast queue into the socket. The read side only keeps
/// the connection alive; any failure on either side unregisters.
async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (mut sink, mut stream) = socket.split();

    if !state.cache.is_empty().await {
        let event = StreamEvent::Snapshot {
            data: state.cache.snapshot().await,
        };
        let Ok(payload) = serde_json::to_string(&event) else {
            return;
        };
        if sink.send(Message::Text(payload.into())).await.is_err() {
            return;
        }
    }

    let (id, mut rx) = state.broadcaster.register();
    debug!(subscriber = ?id, "market socket joined");

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sink.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Drain inbound frames until the peer goes away or the writer dies.
    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = stream.next() => match frame {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    state.broadcaster.unregister(id);
    writer.abort();
    debug!(subscriber = ?id, "market socket left");
}
