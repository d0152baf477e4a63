//! UseCase: room listing, passwords and status lookups.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::domain::{RoomName, UserId};
use crate::infrastructure::dto::http::{RoomStatusDto, RoomSummaryDto, UserStatusDto};
use crate::infrastructure::registry::RoomRegistry;
use crate::infrastructure::store::QueueStore;

use super::error::AccessError;
use super::notify::{Dispatcher, room_summaries};

pub struct RoomAccessUseCase {
    registry: Arc<Mutex<RoomRegistry>>,
    store: Arc<dyn QueueStore>,
    dispatcher: Arc<Dispatcher>,
    config: Arc<ServerConfig>,
}

impl RoomAccessUseCase {
    pub fn new(
        registry: Arc<Mutex<RoomRegistry>>,
        store: Arc<dyn QueueStore>,
        dispatcher: Arc<Dispatcher>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            registry,
            store,
            dispatcher,
            config,
        }
    }

    /// All known rooms with queue lengths, sorted by name.
    pub async fn rooms_list(&self) -> Vec<RoomSummaryDto> {
        let registry = self.registry.lock().await;
        room_summaries(&registry)
    }

    /// Existence and password status of one room.
    pub async fn room_status(&self, room: &str) -> RoomStatusDto {
        let registry = self.registry.lock().await;
        match registry.get(room) {
            Some(room) => RoomStatusDto {
                exists: true,
                has_password: room.has_password(),
            },
            None => RoomStatusDto {
                exists: false,
                has_password: false,
            },
        }
    }

    /// Claim a room behind the master secret, setting or clearing its
    /// password. An empty new password clears it. The room is created
    /// when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::MasterPasswordRejected` when the master
    /// secret is unset or mismatched.
    pub async fn claim_room(
        &self,
        room: &RoomName,
        master_password: &str,
        new_password: &str,
    ) -> Result<(), AccessError> {
        if !self
            .config
            .master_password
            .as_deref()
            .is_some_and(|secret| secret == master_password)
        {
            return Err(AccessError::MasterPasswordRejected);
        }

        let snapshot = {
            let mut registry = self.registry.lock().await;
            let room_state = registry.get_or_create(room.as_str());
            room_state.password = if new_password.is_empty() {
                None
            } else {
                Some(new_password.to_string())
            };
            registry.snapshot_json()
        };

        tracing::info!("room '{}' claimed", room);

        self.store.request_save(snapshot).await;
        self.dispatcher.broadcast_rooms_list().await;
        Ok(())
    }

    /// Validate a room password. Passwordless rooms accept anything.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::UnknownRoom` or
    /// `AccessError::RoomPasswordRejected`.
    pub async fn login_room(&self, room: &str, password: &str) -> Result<(), AccessError> {
        let registry = self.registry.lock().await;
        let room = registry.get(room).ok_or(AccessError::UnknownRoom)?;
        match &room.password {
            None => Ok(()),
            Some(expected) if expected == password => Ok(()),
            Some(_) => Err(AccessError::RoomPasswordRejected),
        }
    }

    /// Validate the shared TA secret. Always false when unconfigured.
    pub fn ta_auth(&self, password: &str) -> bool {
        self.config
            .ta_password
            .as_deref()
            .is_some_and(|secret| secret == password)
    }

    /// Where (if anywhere) a user is currently queued.
    pub async fn user_status(&self, user_id: &UserId) -> UserStatusDto {
        let registry = self.registry.lock().await;
        match registry.find_active_entry(user_id) {
            Some(active) => UserStatusDto {
                in_queue: true,
                room: Some(active.room),
                queue_type: Some(active.queue_type),
                entry_id: Some(active.entry_id),
                status: Some(active.status),
            },
            None => UserStatusDto::not_queued(),
        }
    }
}
