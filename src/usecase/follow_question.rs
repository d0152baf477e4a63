//! UseCase: follow / unfollow a question entry.
//!
//! Followers ride along on someone else's question: they appear in the
//! broadcast snapshot and get the call notice when the entry is called,
//! but hold no queue position of their own.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{QueueError, RoomName, UserId};
use crate::infrastructure::registry::RoomRegistry;
use crate::infrastructure::store::QueueStore;

use super::notify::Dispatcher;

pub struct FollowQuestionUseCase {
    registry: Arc<Mutex<RoomRegistry>>,
    store: Arc<dyn QueueStore>,
    dispatcher: Arc<Dispatcher>,
}

impl FollowQuestionUseCase {
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

    /// Attach the user as a follower. Unknown entry ids are silent;
    /// following across rooms is rejected by the same guard as joining.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::CrossRoomConflict`, `QueueError::FollowOwnEntry`
    /// or `QueueError::AlreadyFollowing`.
    pub async fn follow(
        &self,
        room: &RoomName,
        entry_id: Uuid,
        user_id: UserId,
        name: String,
    ) -> Result<(), QueueError> {
        let snapshot = {
            let mut registry = self.registry.lock().await;
            registry.check_cross_room(&user_id, room.as_str())?;
            let Some(room_state) = registry.get_mut(room.as_str()) else {
                return Ok(());
            };
            let followed = room_state.follow(entry_id, user_id.clone(), name)?;
            if followed.is_none() {
                return Ok(());
            }
            registry.snapshot_json()
        };

        tracing::info!("{} follows question {} in room '{}'", user_id, entry_id, room);

        self.store.request_save(snapshot).await;
        self.dispatcher.broadcast_room(room.as_str()).await;
        Ok(())
    }

    /// Detach the user from a question entry. Silent when not following.
    pub async fn unfollow(&self, room: &RoomName, entry_id: Uuid, user_id: &UserId) {
        let snapshot = {
            let mut registry = self.registry.lock().await;
            let changed = registry
                .get_mut(room.as_str())
                .is_some_and(|r| r.unfollow(entry_id, user_id));
            if !changed {
                return;
            }
            registry.snapshot_json()
        };

        self.store.request_save(snapshot).await;
        self.dispatcher.broadcast_room(room.as_str()).await;
    }
}
