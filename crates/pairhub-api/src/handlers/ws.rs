//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt, future};

use pairhub_realtime::connection::{InboundFrame, serve_connection};

use crate::state::AppState;

/// GET /ws: WebSocket upgrade
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max_message_size = state.config.realtime.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_ws_connection(state, socket))
}

/// Maps an axum frame onto the engine's transport-neutral frame.
pub fn to_inbound(message: Message) -> InboundFrame {
    match message {
        Message::Text(text) => InboundFrame::Text(text.as_str().to_owned()),
        Message::Binary(data) => InboundFrame::Binary(data.to_vec()),
        Message::Ping(_) => InboundFrame::Ping,
        Message::Pong(_) => InboundFrame::Pong,
        Message::Close(_) => InboundFrame::Close,
    }
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, socket: WebSocket) {
    let (ws_tx, ws_rx) = socket.split();

    let inbound = ws_rx.map(|frame| frame.map(to_inbound));
    let outbound = ws_tx.with(|text: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(text.into())))
    });

    serve_connection(state.realtime.connections.clone(), inbound, outbound).await;
}
