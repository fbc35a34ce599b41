//! WebSocket push: every connected client gets the last completed cycle on
//! connect, then pre-serialized update frames fanned out over a broadcast
//! channel. Clients send nothing meaningful; inbound frames are drained only
//! to notice disconnects.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::api::health::now_ms;
use crate::api::routes::AppState;
use crate::types::PushMessage;

#[derive(Default)]
pub struct ClientRegistry {
    next_id: AtomicU64,
    connected_at_ms: DashMap<u64, u64>,
}

impl ClientRegistry {
    pub fn register(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connected_at_ms.insert(id, now_ms());
        id
    }

    pub fn deregister(&self, id: u64) {
        self.connected_at_ms.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.connected_at_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected_at_ms.is_empty()
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = state.registry.register();
    state.health.client_connected();
    debug!(client_id, "websocket client connected");

    // Subscribe before the initial send so no cycle lands in the gap.
    let mut rx = state.push_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    if let Some(snapshot) = state.store.latest() {
        let initial = PushMessage::Initial {
            data: (*snapshot).clone(),
            timestamp: now_ms(),
        };
        match serde_json::to_string(&initial) {
            Ok(json) => {
                if sender.send(Message::Text(json)).await.is_err() {
                    finish(&state, client_id);
                    return;
                }
            }
            Err(e) => warn!(client_id, "failed to serialize initial snapshot: {e}"),
        }
    }

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Slow client: skip what it missed, the next update is
                    // a full snapshot anyway.
                    warn!(client_id, missed, "client lagging behind broadcast");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    finish(&state, client_id);
}

fn finish(state: &AppState, client_id: u64) {
    state.registry.deregister(client_id);
    state.health.client_disconnected();
    debug!(client_id, "websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_assigns_unique_ids_and_tracks_count() {
        let registry = ClientRegistry::default();
        let a = registry.register();
        let b = registry.register();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        registry.deregister(a);
        assert_eq!(registry.len(), 1);
        registry.deregister(b);
        assert!(registry.is_empty());
    }
}
