use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use roomchat_types::frame::{PushEvent, SendFrame};
use roomchat_types::models::{Message as ChatMessage, UserId};

use crate::AppState;

/// Server pings every 15 seconds; two missed pongs drop the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// The channel is addressed by the session's user id. Unknown ids get 400.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ws: WebSocketUpgrade,
) -> Response {
    match state.users.read().await.get(&user_id) {
        Some(user) => info!("{} ({}) upgrading to push channel", user.name, user.id),
        None => return StatusCode::BAD_REQUEST.into_response(),
    }
    // Subscribe before the handshake completes so nothing sent after the
    // client sees the upgrade is missed.
    let push_rx = state.push_tx.subscribe();
    ws.on_upgrade(move |socket| handle_connection(socket, state, user_id, push_rx))
}

async fn handle_connection(
    socket: WebSocket,
    state: AppState,
    user_id: UserId,
    mut push_rx: broadcast::Receiver<String>,
) {
    let (mut sender, mut receiver) = socket.split();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = push_rx.recv() => {
                    let frame = match result {
                        Ok(frame) => frame,
                        Err(RecvError::Lagged(n)) => {
                            warn!("{} push receiver lagged by {} frames", user_id, n);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_received.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("{} heartbeat timeout, dropping connection", user_id);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => relay_send_frame(&recv_state, user_id, &text).await,
                Message::Pong(_) => pong_flag_recv.store(true, Ordering::Release),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} disconnected from push channel", user_id);
}

/// Append a client's send frame to its room and push it to every session.
async fn relay_send_frame(state: &AppState, user_id: UserId, payload: &str) {
    let frame = match SendFrame::decode(payload) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("{} sent bad frame: {}", user_id, e);
            return;
        }
    };

    // Broadcast under the write lock so the push order matches the room log.
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&frame.room_name) else {
        warn!("{} posted to unknown room {:?}", user_id, frame.room_name);
        return;
    };
    room.messages.push(ChatMessage {
        user_id: Some(user_id),
        text: frame.text.clone(),
    });

    let _ = state
        .push_tx
        .send(PushEvent::encode(user_id, &frame.room_name, &frame.text));
}
