pub mod auth;
pub mod gateway;
pub mod middleware;
pub mod rooms;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use roomchat_types::models::{RoomsSnapshot, UsersSnapshot};

/// Capacity of the push broadcast. Slow sessions that fall further behind
/// skip the missed frames.
const BROADCAST_CAPACITY: usize = 100;

pub type AppState = Arc<AppStateInner>;

/// In-memory server of record. Nothing survives a restart.
pub struct AppStateInner {
    pub users: RwLock<UsersSnapshot>,
    pub rooms: RwLock<RoomsSnapshot>,
    pub next_user_id: AtomicU64,
    pub push_tx: broadcast::Sender<String>,
}

pub fn new_state() -> AppState {
    let (push_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
    Arc::new(AppStateInner {
        users: RwLock::new(HashMap::new()),
        rooms: RwLock::new(HashMap::new()),
        next_user_id: AtomicU64::new(0),
        push_tx,
    })
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register/{user_name}", post(auth::register))
        .route("/{user_id}", get(gateway::ws_upgrade))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/login", get(auth::login))
        .route("/users", get(rooms::list_users))
        .route("/rooms", get(rooms::list_rooms))
        .route("/rooms/{room_name}", post(rooms::create_room))
        .route("/rooms/{room_name}/join", post(rooms::join_room))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the router on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
