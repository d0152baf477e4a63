//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    domain::{RoomName, UserId},
    infrastructure::dto::http::{
        ClaimRoomRequest, OkResponse, RoomAuthRequest, RoomStatusDto, RoomStatusQuery,
        RoomSummaryDto, TaAuthRequest, UserStatusDto, UserStatusQuery,
    },
    ui::state::AppState,
    usecase::{AccessError, RoomAccessUseCase},
};

fn access_usecase(state: &AppState) -> RoomAccessUseCase {
    RoomAccessUseCase::new(
        Arc::clone(&state.registry),
        Arc::clone(&state.store),
        Arc::clone(&state.dispatcher),
        Arc::clone(&state.config),
    )
}

fn access_error_status(e: &AccessError) -> StatusCode {
    match e {
        AccessError::MasterPasswordRejected | AccessError::RoomPasswordRejected => {
            StatusCode::UNAUTHORIZED
        }
        AccessError::UnknownRoom => StatusCode::NOT_FOUND,
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// List all rooms with queue lengths.
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    Json(access_usecase(&state).rooms_list().await)
}

/// Existence and password status of a single room.
pub async fn room_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomStatusQuery>,
) -> Json<RoomStatusDto> {
    Json(access_usecase(&state).room_status(&query.room).await)
}

/// Where a user is currently queued, if anywhere.
pub async fn user_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserStatusQuery>,
) -> Result<Json<UserStatusDto>, StatusCode> {
    let user_id = UserId::new(query.user_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(access_usecase(&state).user_status(&user_id).await))
}

/// Claim a room behind the master secret and set or clear its password.
pub async fn claim_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClaimRoomRequest>,
) -> Result<Json<OkResponse>, (StatusCode, String)> {
    let room = RoomName::new(request.room)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    access_usecase(&state)
        .claim_room(&room, &request.master_password, &request.new_password)
        .await
        .map_err(|e| (access_error_status(&e), e.to_string()))?;
    Ok(Json(OkResponse { ok: true }))
}

/// Validate a room password.
pub async fn room_auth(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RoomAuthRequest>,
) -> Result<Json<OkResponse>, (StatusCode, String)> {
    access_usecase(&state)
        .login_room(&request.room, &request.password)
        .await
        .map_err(|e| (access_error_status(&e), e.to_string()))?;
    Ok(Json(OkResponse { ok: true }))
}

/// Validate the shared TA secret.
pub async fn ta_auth(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TaAuthRequest>,
) -> Result<Json<OkResponse>, StatusCode> {
    if access_usecase(&state).ta_auth(&request.password) {
        Ok(Json(OkResponse { ok: true }))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
