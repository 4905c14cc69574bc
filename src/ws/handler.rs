//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::ConnId;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};
use crate::ws::transport::{Frame, Transport};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id: ConnId = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let outbound = state.hub.register(conn_id);

    state.hub.send_to(
        conn_id,
        &ServerMsg::Welcome {
            conn_id,
            server_time: unix_millis(),
        },
    );

    let writer = tokio::spawn(write_frames(conn_id, ws_sink, outbound));

    read_intents(conn_id, ws_stream, &state).await;

    // Cleanup on disconnect
    state.matchmaking.disconnect(conn_id);
    state.hub.unregister(conn_id);
    writer.abort();

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Writer task: hub channel -> WebSocket
async fn write_frames(
    conn_id: ConnId,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outbound: tokio::sync::mpsc::UnboundedReceiver<Frame>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
            debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Reader loop: WebSocket -> matchmaking
async fn read_intents(
    conn_id: ConnId,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    state: &AppState,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_intent() {
                    debug!(conn_id = %conn_id, "Rate limited intent");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => state.matchmaking.dispatch(conn_id, msg),
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}
