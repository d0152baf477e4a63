//! UseCase: bind a connection to a user identity and room.
//!
//! Registration is how a reloaded tab finds its way back: the connection
//! immediately receives the room snapshot plus its own entries so the
//! client can restore queue badges without rejoining.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{QueueType, RoomName, UserId};
use crate::infrastructure::dto::ws::{EntryRestore, RestoreEntriesPayload, ServerEvent};
use crate::infrastructure::registry::RoomRegistry;
use crate::ui::sessions::SessionManager;

use super::notify::queues_payload;

pub struct RegisterUserUseCase {
    registry: Arc<Mutex<RoomRegistry>>,
    sessions: Arc<SessionManager>,
}

impl RegisterUserUseCase {
    pub fn new(registry: Arc<Mutex<RoomRegistry>>, sessions: Arc<SessionManager>) -> Self {
        Self { registry, sessions }
    }

    /// Bind the connection and push the current room state back to it.
    /// The room is created in memory on first reference; it reaches the
    /// store with the next persisted mutation.
    pub async fn execute(&self, conn_id: Uuid, user_id: &UserId, room: &RoomName) {
        self.sessions
            .register(conn_id, user_id.as_str(), room.as_str())
            .await;

        let (snapshot, restore) = {
            let mut registry = self.registry.lock().await;
            let snapshot = queues_payload(registry.get_or_create(room.as_str()));
            let restore = RestoreEntriesPayload {
                marking: self.restore_entry(&registry, room, QueueType::Marking, user_id),
                question: self.restore_entry(&registry, room, QueueType::Question, user_id),
            };
            (snapshot, restore)
        };

        tracing::debug!("registered {} in room '{}'", user_id, room);

        self.sessions
            .send_to_conn(conn_id, &ServerEvent::QueuesUpdate(snapshot))
            .await;
        self.sessions
            .send_to_conn(conn_id, &ServerEvent::RestoreEntries(restore))
            .await;
    }

    fn restore_entry(
        &self,
        registry: &RoomRegistry,
        room: &RoomName,
        queue_type: QueueType,
        user_id: &UserId,
    ) -> Option<EntryRestore> {
        registry
            .user_entry_with_position(room.as_str(), queue_type, user_id)
            .map(|(entry, position)| EntryRestore {
                entry_id: entry.id,
                position,
                status: entry.status,
            })
    }
}
