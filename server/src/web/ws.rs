use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use super::AppState;

/// `GET /event`
pub async fn ws_events(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Forward every published message as a text frame until either side goes away.
/// The subscription is dropped, and so unregistered, on every exit path.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = state.registry.subscribe();
    debug!(subscriber = %subscription.id(), "WebSocket client connected");

    loop {
        tokio::select! {
            message = subscription.recv() => {
                let Some(message) = message else {
                    return;
                };
                let json = match serde_json::to_string(message.as_ref()) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize push message: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!(subscriber = %subscription.id(), "WebSocket send failed");
                    return;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(subscriber = %subscription.id(), "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Clients have nothing to say on this channel.
                    _ => {}
                }
            }
        }
    }
}
