use std::collections::BTreeSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use roomchat_types::models::Room;

use crate::AppState;
use crate::middleware::Caller;

pub async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.users.read().await.clone())
}

pub async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.rooms.read().await.clone())
}

pub async fn create_room(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut rooms = state.rooms.write().await;
    if rooms.contains_key(&room_name) {
        return Err(StatusCode::CONFLICT);
    }

    let room = Room {
        name: room_name.clone(),
        participant_ids: BTreeSet::from([caller.user_id]),
        messages: Vec::new(),
    };
    rooms.insert(room_name.clone(), room.clone());

    info!("{} created room {}", caller.user_id, room_name);
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(&room_name).ok_or(StatusCode::NOT_FOUND)?;
    room.participant_ids.insert(caller.user_id);

    info!("{} joined room {}", caller.user_id, room_name);
    Ok(Json(room.clone()))
}
