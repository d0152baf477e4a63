//! UseCase: swap an entry one place toward the tail.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{QueueType, RoomName, UserId};
use crate::infrastructure::dto::ws::ServerEvent;
use crate::infrastructure::registry::RoomRegistry;
use crate::infrastructure::store::QueueStore;

use super::notify::Dispatcher;

pub struct PushBackUseCase {
    registry: Arc<Mutex<RoomRegistry>>,
    store: Arc<dyn QueueStore>,
    dispatcher: Arc<Dispatcher>,
}

impl PushBackUseCase {
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

    /// Swap the entry with its successor. Tail entries, non-waiting
    /// entries and unknown ids are silent no-ops.
    pub async fn execute(
        &self,
        room: &RoomName,
        queue_type: QueueType,
        entry_id: Uuid,
        user_id: &UserId,
    ) {
        let (snapshot, position) = {
            let mut registry = self.registry.lock().await;
            let Some(position) = registry
                .get_mut(room.as_str())
                .and_then(|r| r.push_back(queue_type, entry_id))
            else {
                return;
            };
            (registry.snapshot_json(), position)
        };

        tracing::info!(
            "{} pushed back to position {} in the {} queue of room '{}'",
            user_id,
            position,
            queue_type,
            room
        );

        self.store.request_save(snapshot).await;
        self.dispatcher
            .to_user(
                user_id.as_str(),
                ServerEvent::PushedBack {
                    queue_type,
                    position,
                },
            )
            .await;
        self.dispatcher.broadcast_room(room.as_str()).await;
        self.dispatcher.notify_front(room.as_str(), queue_type).await;
    }
}
