//! Notification Dispatcher.
//!
//! After every mutation the dispatcher recomputes positions and pushes:
//! full room snapshots to the room, the rooms list to everyone, and
//! targeted "turn approaching" notices to the front of the marking queue.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{QueueType, Room};
use crate::infrastructure::dto::http::RoomSummaryDto;
use crate::infrastructure::dto::ws::{EntryView, QueuesUpdatePayload, ServerEvent};
use crate::infrastructure::registry::RoomRegistry;
use crate::ui::sessions::SessionManager;

/// How far into the waiting queue approach notices reach.
const APPROACH_WINDOW: usize = 2;
/// How many front entries are recomputed after a mutation.
const FRONT_RECOMPUTE: usize = 3;

/// Build the full snapshot of one room, positions included.
pub fn queues_payload(room: &Room) -> QueuesUpdatePayload {
    let view = |queue_type| {
        room.with_positions(queue_type)
            .into_iter()
            .map(|(position, entry)| EntryView::from_entry(entry, position))
            .collect()
    };
    QueuesUpdatePayload {
        marking: view(QueueType::Marking),
        question: view(QueueType::Question),
    }
}

/// Summaries of every room, for `/api/rooms` and `rooms-list-update`.
pub fn room_summaries(registry: &RoomRegistry) -> Vec<RoomSummaryDto> {
    let mut summaries: Vec<RoomSummaryDto> = registry
        .iter()
        .map(|(name, room)| RoomSummaryDto {
            name: name.clone(),
            marking_count: room.marking.len(),
            question_count: room.question.len(),
            has_password: room.has_password(),
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    summaries
}

/// Routes recomputed state to the right connections.
pub struct Dispatcher {
    registry: Arc<Mutex<RoomRegistry>>,
    sessions: Arc<SessionManager>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Mutex<RoomRegistry>>, sessions: Arc<SessionManager>) -> Self {
        Self { registry, sessions }
    }

    /// Broadcast the room's snapshot to its members and the refreshed
    /// rooms list to every connection.
    pub async fn broadcast_room(&self, room: &str) {
        let (snapshot, summaries) = {
            let registry = self.registry.lock().await;
            let snapshot = registry.get(room).map(queues_payload);
            (snapshot, room_summaries(&registry))
        };
        if let Some(snapshot) = snapshot {
            self.sessions
                .broadcast_room(room, &ServerEvent::QueuesUpdate(snapshot))
                .await;
        }
        self.sessions
            .broadcast_all(&ServerEvent::RoomsListUpdate(summaries))
            .await;
    }

    /// Broadcast only the rooms list (after claim/delete).
    pub async fn broadcast_rooms_list(&self) {
        let summaries = {
            let registry = self.registry.lock().await;
            room_summaries(&registry)
        };
        self.sessions
            .broadcast_all(&ServerEvent::RoomsListUpdate(summaries))
            .await;
    }

    /// Recompute the queue front after a mutation and notify users whose
    /// turn is approaching.
    pub async fn notify_front(&self, room: &str, queue_type: QueueType) {
        let front: Vec<(usize, String)> = {
            let registry = self.registry.lock().await;
            let Some(room) = registry.get(room) else {
                return;
            };
            room.waiting_front(queue_type, FRONT_RECOMPUTE)
                .into_iter()
                .map(|(position, entry)| (position, entry.user_id.as_str().to_string()))
                .collect()
        };
        for (position, user_id) in front {
            self.notify_upcoming(queue_type, position, &user_id).await;
        }
    }

    /// Targeted "turn approaching" notice.
    pub async fn notify_upcoming(&self, queue_type: QueueType, position: usize, user_id: &str) {
        if queue_type == QueueType::Question {
            // Approach notices are marking-only.
            return;
        }
        if position == 0 || position > APPROACH_WINDOW {
            return;
        }
        let message = if position == 1 {
            "You're next! Please be ready.".to_string()
        } else {
            format!("You're #{position} in the {queue_type} queue.")
        };
        self.to_user(
            user_id,
            ServerEvent::TurnApproaching {
                queue_type,
                position,
                message,
            },
        )
        .await;
    }

    /// Targeted event to every connection of a user.
    pub async fn to_user(&self, user_id: &str, event: ServerEvent) {
        self.sessions.send_to_user(user_id, &event).await;
    }

    /// Event to every member of a room.
    pub async fn to_room(&self, room: &str, event: ServerEvent) {
        self.sessions.broadcast_room(room, &event).await;
    }
}
