//! WebSocket event feed: `/ws/events` streams lifecycle events as JSON.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::warn;

use crate::api::routes::AppState;
use crate::events::Event;

pub async fn events_ws(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: Receiver<Event>) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let text = event.to_message().to_string();
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("event subscriber lagged, dropped {n} events");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // The feed is one-way; ignore anything else the client sends.
                Some(Ok(_)) => {}
            },
        }
    }
}
