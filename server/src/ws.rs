//! WebSocket adapter binding an axum socket to a [`arrayd_core::stream`]
//! client session.
//!
//! Splits the connection into an independent reader duty and writer duty
//! joined with `tokio::select!`, with deadline-enforced framing on both
//! sides.

use crate::http::AppState;
use arrayd_core::stream::{ClientMessage, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

const MAX_FRAME_BYTES: usize = 512;
const READ_DEADLINE: std::time::Duration = std::time::Duration::from_secs(60);
const WRITE_DEADLINE: std::time::Duration = std::time::Duration::from_secs(10);
const PING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(54);

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session = state.fanout.register_client();
    let client_id = session.handle.id().to_string();
    debug!(client_id, "stream client connected");

    let (mut sink, mut stream) = socket.split();
    let handle = session.handle.clone();
    let mut outbound_rx = session.outbound_rx;

    let writer = async move {
        let mut ping_tick = tokio::time::interval(PING_INTERVAL);
        ping_tick.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                message = outbound_rx.recv() => {
                    let Some(message) = message else {
                        let _ = tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Close(None))).await;
                        break;
                    };
                    if !send_frame(&mut sink, &message).await {
                        break;
                    }
                }
                _ = ping_tick.tick() => {
                    if tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Ping(Vec::new().into())))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
    };

    let reader = async move {
        loop {
            let Ok(Some(Ok(message))) = tokio::time::timeout(READ_DEADLINE, stream.next()).await else {
                break;
            };
            match message {
                Message::Text(text) => {
                    if text.len() > MAX_FRAME_BYTES {
                        warn!(client_id = handle.id(), "oversized frame dropped");
                        continue;
                    }
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(parsed) => {
                            if let Some(ack) = handle.handle_message(parsed).await {
                                handle.try_send(ack);
                            }
                        }
                        Err(err) => {
                            debug!(client_id = handle.id(), %err, "ignoring malformed frame");
                        }
                    }
                }
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    state.fanout.remove_client(&client_id);
    debug!(client_id, "stream client disconnected");
}

async fn send_frame(sink: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    let Ok(text) = serde_json::to_string(message) else {
        return false;
    };
    tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Text(text.into())))
        .await
        .is_ok_and(|r| r.is_ok())
}
