use crate::models::{ClientMessage, PriceUpdate, ServerMessage};
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One task per connection: forwards filtered quote batches out and feeds
/// subscribe messages into the registry. The registry entry lives exactly
/// as long as this task.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.registry.register(id, tx).await;

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            batch = rx.recv() => {
                let Some(batch) = batch else { break };
                let event = ServerMessage::PriceUpdate {
                    data: batch.iter().map(PriceUpdate::from).collect(),
                };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!("failed to encode price update: {}", e),
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { symbols }) => {
                                state.registry.subscribe(id, symbols).await;
                            }
                            Err(e) => {
                                tracing::debug!("ignoring malformed message from {}: {}", id, e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings are answered by axum; other frames carry nothing for us.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("websocket error on {}: {}", id, e);
                        break;
                    }
                }
            }
        }
    }

    state.registry.unregister(id).await;
}
