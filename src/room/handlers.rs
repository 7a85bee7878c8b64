use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::types::{RoomResponse, SubmitMessageRequest};
use crate::shared::{AppError, AppState};

/// HTTP handler for posting a message into a room
///
/// POST /rooms/{room_id}/messages
/// Creates the room on first use; a congested room answers 503 rather than
/// holding the request hostage.
#[instrument(name = "submit_message", skip(state, request))]
pub async fn submit_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<SubmitMessageRequest>,
) -> Result<Json<Value>, AppError> {
    info!(room_id = %room_id, user_id = %request.user_id, "Submitting message");

    state
        .rooms
        .submit(request.user_id, room_id, request.text)
        .await?;

    Ok(Json(json!({ "message": "Message submitted" })))
}

/// HTTP handler for listing all active rooms
///
/// GET /rooms
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomResponse>> {
    let rooms: Vec<RoomResponse> = state
        .rooms
        .rooms()
        .await
        .into_iter()
        .map(RoomResponse::from)
        .collect();

    info!(room_count = rooms.len(), "Rooms listed");
    Json(rooms)
}

/// HTTP handler for fetching one active room
///
/// GET /rooms/{room_id}
/// 404 when the room is not active.
#[instrument(name = "get_room", skip(state))]
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    let info = state.rooms.room(&room_id).await?;
    Ok(Json(RoomResponse::from(info)))
}

/// HTTP handler for deleting a room's broadcaster
///
/// DELETE /rooms/{room_id}
/// Idempotent; listeners still attached observe their stream closing.
#[instrument(name = "delete_room", skip(state))]
pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Json<Value> {
    info!(room_id = %room_id, "Deleting room");

    state.rooms.delete_broadcast(&room_id).await;

    Json(json!({ "message": "Room deleted" }))
}
