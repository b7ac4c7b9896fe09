//! Live event stream over WebSocket

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{State, WebSocketUpgrade, ws::{Message, WebSocket}},
    response::Response,
};
use threatflow_core::subscribers::ChannelSubscriber;

use crate::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (subscriber, mut rx) = ChannelSubscriber::channel(state.config.service.subscriber_queue);

    let id = match state.pipeline.subscribe(Arc::new(subscriber)) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Subscriber rejected: {}", e);
            return;
        }
    };
    tracing::info!("WebSocket subscriber {} connected", id);

    let mut ping = tokio::time::interval(Duration::from_secs(state.config.ws_ping_secs));
    ping.tick().await;
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            // Registry drops the sender when delivery fails
            message = rx.recv() => {
                let Some(message) = message else { break };
                match message.to_json() {
                    Ok(json) => {
                        if socket.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!("Failed to encode stream message: {}", e),
                }
            }
            _ = ping.tick() => {
                if awaiting_pong {
                    tracing::debug!("Subscriber {} missed ping", id);
                    break;
                }
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => awaiting_pong = false,
                }
            }
        }
    }

    state.pipeline.unsubscribe(id);
    tracing::info!("WebSocket subscriber {} disconnected", id);
}
