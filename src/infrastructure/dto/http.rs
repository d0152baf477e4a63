//! HTTP API request/response DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EntryStatus, QueueType};

/// Room summary for the list endpoint and `rooms-list-update` broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub name: String,
    pub marking_count: usize,
    pub question_count: usize,
    pub has_password: bool,
}

/// Response of `GET /api/room-status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatusDto {
    pub exists: bool,
    pub has_password: bool,
}

/// Response of `GET /api/user-status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusDto {
    pub in_queue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_type: Option<QueueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
}

impl UserStatusDto {
    pub fn not_queued() -> Self {
        Self {
            in_queue: false,
            room: None,
            queue_type: None,
            entry_id: None,
            status: None,
        }
    }
}

/// Body of `POST /api/claim-room`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRoomRequest {
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub master_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Body of `POST /api/room-auth`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAuthRequest {
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub password: String,
}

/// Body of `POST /api/ta-auth`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaAuthRequest {
    #[serde(default)]
    pub password: String,
}

/// Query of `GET /api/room-status`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomStatusQuery {
    #[serde(default)]
    pub room: String,
}

/// Query of `GET /api/user-status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusQuery {
    #[serde(default)]
    pub user_id: String,
}

/// Generic success body for the auth/claim endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}
