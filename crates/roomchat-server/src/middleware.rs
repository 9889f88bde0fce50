use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};

use roomchat_types::models::UserId;

use crate::AppState;

/// Authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: UserId,
}

/// The bearer credential is the caller's user id; it must name a registered user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id: UserId = token.trim().parse().map_err(|_| StatusCode::UNAUTHORIZED)?;

    if !state.users.read().await.contains_key(&user_id) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    req.extensions_mut().insert(Caller { user_id });
    Ok(next.run(req).await)
}
