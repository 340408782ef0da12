//! HTTP lobby: read-only room listing and a health probe.
//!
//! Clients poll `GET /rooms` to discover rooms; nothing here mutates a
//! room. Each request snapshots the room handles under the manager lock,
//! then asks every room for its summary with the lock released.

use std::sync::Arc;

use axum::extract::State;
use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use cardduel_protocol::{Codec, RoomList};
use cardduel_room::collect_summaries;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use crate::server::ServerState;

/// Lobby route under the client's API prefix.
pub const ROOMS_PATH: &str = "/api/20250120_card-game01/rooms";

pub(crate) fn router<C: Codec>(state: Arc<ServerState<C>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rooms", get(list_rooms::<C>))
        .route(ROOMS_PATH, get(list_rooms::<C>))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET])
                .allow_origin(Any),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_rooms<C: Codec>(State(state): State<Arc<ServerState<C>>>) -> Json<RoomList> {
    let handles = state.rooms.lock().await.room_handles();
    let rooms = collect_summaries(handles).await;
    tracing::debug!(rooms = rooms.len(), "lobby listing served");
    Json(RoomList { rooms })
}
