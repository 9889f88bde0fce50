use std::sync::atomic::Ordering;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use roomchat_types::api::RegisterResponse;
use roomchat_types::frame::SEPARATOR;
use roomchat_types::models::User;

use crate::AppState;
use crate::middleware::Caller;

pub async fn register(
    State(state): State<AppState>,
    Path(user_name): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    // Names travel inside line-delimited frames elsewhere, so no separators.
    if user_name.is_empty() || user_name.contains(SEPARATOR) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user_id = state.next_user_id.fetch_add(1, Ordering::SeqCst);
    state.users.write().await.insert(
        user_id,
        User {
            id: user_id,
            name: user_name.clone(),
        },
    );

    info!("registered {} ({})", user_name, user_id);
    Ok(Json(RegisterResponse { user_id }))
}

pub async fn login(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, StatusCode> {
    let users = state.users.read().await;
    let user = users.get(&caller.user_id).ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(user.clone()))
}
