//! UseCase: voluntarily leave a queue.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{QueueType, RoomName, UserId};
use crate::infrastructure::dto::ws::ServerEvent;
use crate::infrastructure::registry::RoomRegistry;
use crate::infrastructure::store::QueueStore;

use super::notify::Dispatcher;

pub struct LeaveQueueUseCase {
    registry: Arc<Mutex<RoomRegistry>>,
    store: Arc<dyn QueueStore>,
    dispatcher: Arc<Dispatcher>,
}

impl LeaveQueueUseCase {
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

    /// Remove the user's entry. Unknown room or entry id is a silent
    /// no-op: nothing is persisted and no events go out.
    pub async fn execute(
        &self,
        room: &RoomName,
        queue_type: QueueType,
        entry_id: Uuid,
        user_id: &UserId,
    ) {
        let snapshot = {
            let mut registry = self.registry.lock().await;
            let removed = registry
                .get_mut(room.as_str())
                .and_then(|r| r.remove(queue_type, entry_id));
            if removed.is_none() {
                return;
            }
            registry.snapshot_json()
        };

        tracing::info!(
            "{} left the {} queue in room '{}'",
            user_id,
            queue_type,
            room
        );

        self.store.request_save(snapshot).await;
        self.dispatcher
            .to_user(
                user_id.as_str(),
                ServerEvent::LeftQueue {
                    queue_type,
                    entry_id,
                },
            )
            .await;
        self.dispatcher.broadcast_room(room.as_str()).await;
        self.dispatcher.notify_front(room.as_str(), queue_type).await;
    }
}
