//! WebSocket event protocol DTOs.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Client events hard-validate `queueType` against the enum; all other
//! optional fields fall back to safe defaults so a sparse payload never
//! crashes a handler.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Entry, EntryDetails, EntryStatus, QueueSelector, QueueType};

use super::http::RoomSummaryDto;

/// Events received from clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    RegisterUser(RegisterUserPayload),
    JoinMarking(JoinMarkingPayload),
    JoinQuestion(JoinQuestionPayload),
    LeaveQueue(LeaveQueuePayload),
    PushBack(PushBackPayload),
    FollowQuestion(FollowQuestionPayload),
    UnfollowQuestion(UnfollowQuestionPayload),
    TaCheckin(TaQueuePayload),
    TaCallSpecific(TaEntryPayload),
    TaCancelCall(TaEntryPayload),
    TaStartAssisting(TaEntryPayload),
    TaNext(TaQueuePayload),
    TaRemove(TaRemovePayload),
    TaClearAll(TaRoomPayload),
    TaDeleteRoom(TaRoomPayload),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMarkingPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQuestionPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveQueuePayload {
    pub queue_type: QueueType,
    pub entry_id: Uuid,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushBackPayload {
    pub queue_type: QueueType,
    pub entry_id: Uuid,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowQuestionPayload {
    pub entry_id: Uuid,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowQuestionPayload {
    pub entry_id: Uuid,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaQueuePayload {
    pub queue_type: QueueSelector,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaEntryPayload {
    pub queue_type: QueueSelector,
    pub entry_id: Uuid,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaRemovePayload {
    pub queue_type: QueueType,
    pub entry_id: Uuid,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaRoomPayload {
    #[serde(default)]
    pub room: String,
}

/// Events pushed to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    QueuesUpdate(QueuesUpdatePayload),
    RestoreEntries(RestoreEntriesPayload),
    #[serde(rename_all = "camelCase")]
    JoinedQueue {
        queue_type: QueueType,
        position: usize,
        entry_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    LeftQueue {
        queue_type: QueueType,
        entry_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    TurnApproaching {
        queue_type: QueueType,
        position: usize,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    BeingCalled {
        queue_type: QueueType,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_follower: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    PushedBack {
        queue_type: QueueType,
        position: usize,
    },
    #[serde(rename_all = "camelCase")]
    FinishedAssisting {
        queue_type: QueueType,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    AssistingStarted {
        queue_type: QueueType,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    RemovedFromQueue {
        #[serde(skip_serializing_if = "Option::is_none")]
        queue_type: Option<QueueType>,
        message: String,
    },
    RoomDeleted {
        message: String,
    },
    RoomsListUpdate(Vec<RoomSummaryDto>),
    Error {
        message: String,
    },
}

/// Full room snapshot: both queues with derived positions.
#[derive(Debug, Clone, Serialize)]
pub struct QueuesUpdatePayload {
    pub marking: Vec<EntryView>,
    pub question: Vec<EntryView>,
}

/// One queue entry as broadcast to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<FollowerView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub user_id: String,
    pub status: EntryStatus,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowerView {
    pub user_id: String,
    pub name: String,
}

impl EntryView {
    pub fn from_entry(entry: &Entry, position: usize) -> Self {
        let (student_id, description, followers) = match &entry.details {
            EntryDetails::Marking { student_id } => {
                (Some(student_id.as_str().to_string()), None, None)
            }
            EntryDetails::Question {
                description,
                followers,
            } => (
                None,
                Some(description.clone()),
                Some(
                    followers
                        .iter()
                        .map(|f| FollowerView {
                            user_id: f.user_id.as_str().to_string(),
                            name: f.name.clone(),
                        })
                        .collect(),
                ),
            ),
        };
        Self {
            id: entry.id,
            name: entry.name.clone(),
            student_id,
            description,
            followers,
            email: entry.email.clone(),
            joined_at: entry.joined_at,
            user_id: entry.user_id.as_str().to_string(),
            status: entry.status,
            position,
        }
    }
}

/// The registering user's current entries across both queue types.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreEntriesPayload {
    pub marking: Option<EntryRestore>,
    pub question: Option<EntryRestore>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRestore {
    pub entry_id: Uuid,
    pub position: usize,
    pub status: EntryStatus,
}
