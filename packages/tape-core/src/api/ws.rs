//! WebSocket push channel for display clients.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use tokio::sync::mpsc;

use crate::api::hub::{BroadcastHub, SessionGuard};
use crate::api::AppState;

/// WebSocket upgrade handler.
///
/// The session is registered as `Connecting` before the upgrade completes;
/// if the upgrade fails the guard is dropped and the session disappears.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let (guard, outbound) = state.hub.register();
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_ws(socket, hub, guard, outbound))
}

/// Main WebSocket connection handler.
async fn handle_ws(
    socket: WebSocket,
    hub: Arc<BroadcastHub>,
    guard: SessionGuard,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
) {
    let (mut sender, mut receiver) = socket.split();
    let cancel_token = guard.cancel_token().clone();

    guard.mark_open();
    log::info!("[WS] Display connected: {}", guard.id());

    loop {
        tokio::select! {
            // Handle force-close request
            _ = cancel_token.cancelled() => {
                log::info!("[WS] Connection force-closed: {}", guard.id());
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            // Handle incoming messages from the client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        hub.on_client_message(guard.id(), text.as_str());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        log::warn!(
                            "[WS] Ignoring {} byte binary frame from {}",
                            data.len(),
                            guard.id()
                        );
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        log::warn!("[WS] Receive error on {}: {}", guard.id(), e);
                        break;
                    }
                    _ => {}
                }
            }
            // Deliver queued broadcasts
            Some(text) = outbound.recv() => {
                if let Err(e) = sender.send(Message::Text(text)).await {
                    log::warn!("[WS] Write failed on {}: {}", guard.id(), e);
                    break;
                }
            }
        }
    }

    guard.mark_closed();
    log::info!("[WS] Display disconnected: {}", guard.id());
    // SessionGuard::drop() removes the session from the hub
}
