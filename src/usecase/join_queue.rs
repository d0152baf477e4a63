//! UseCase: join a room's marking or question queue.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{Entry, QueueError, RoomName, StudentId, UserId};
use crate::infrastructure::dto::ws::ServerEvent;
use crate::infrastructure::registry::RoomRegistry;
use crate::infrastructure::store::QueueStore;

use super::notify::Dispatcher;

/// Queue-type-specific join payload.
#[derive(Debug, Clone)]
pub enum JoinRequest {
    Marking { student_id: StudentId },
    Question { description: String },
}

pub struct JoinQueueUseCase {
    registry: Arc<Mutex<RoomRegistry>>,
    store: Arc<dyn QueueStore>,
    dispatcher: Arc<Dispatcher>,
}

impl JoinQueueUseCase {
    pub fn new(
        registry: Arc<Mutex<RoomRegistry>>,
        store: Arc<dyn QueueStore>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            registry,
            store,
            dispatcher,
        }
    }

    /// Admit a user to the tail of a queue.
    ///
    /// The cross-room guard runs first; the per-queue duplicate check is
    /// part of the domain join. Rooms are created on first reference.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::CrossRoomConflict` or
    /// `QueueError::DuplicateEntry`; the state is unchanged on error.
    pub async fn execute(
        &self,
        room: &RoomName,
        name: String,
        email: Option<String>,
        user_id: UserId,
        request: JoinRequest,
    ) -> Result<(), QueueError> {
        let (snapshot, queue_type, entry_id, position) = {
            let mut registry = self.registry.lock().await;
            registry.check_cross_room(&user_id, room.as_str())?;

            let entry = match request {
                JoinRequest::Marking { student_id } => {
                    Entry::new_marking(name.clone(), student_id, email, user_id.clone())
                }
                JoinRequest::Question { description } => {
                    Entry::new_question(name.clone(), description, email, user_id.clone())
                }
            };
            let queue_type = entry.queue_type();
            let entry_id = entry.id;
            let position = registry.get_or_create(room.as_str()).join(entry)?;
            (registry.snapshot_json(), queue_type, entry_id, position)
        };

        tracing::info!(
            "{} ({}) joined {} queue in room '{}'",
            name,
            user_id,
            queue_type,
            room
        );

        self.store.request_save(snapshot).await;
        self.dispatcher.broadcast_room(room.as_str()).await;
        self.dispatcher
            .to_user(
                user_id.as_str(),
                ServerEvent::JoinedQueue {
                    queue_type,
                    position,
                    entry_id,
                },
            )
            .await;

        Ok(())
    }
}
