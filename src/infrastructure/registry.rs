//! In-memory multi-room registry.
//!
//! The registry owns the full room map for the lifetime of the process.
//! It is held behind a single mutex in `AppState`, so every mutation is
//! serialized; the store only ever receives serialized snapshots of it.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Entry, EntryStatus, QueueError, QueueType, Room, UserId};

/// Where a user's active entry lives, for the cross-room guard and the
/// user-status lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEntry {
    pub room: String,
    pub queue_type: QueueType,
    pub entry_id: Uuid,
    pub status: EntryStatus,
}

/// The full multi-room queue state.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    /// Rebuild the registry from a loaded room map.
    pub fn from_rooms(rooms: HashMap<String, Room>) -> Self {
        Self { rooms }
    }

    /// Existing room state, or a fresh empty room created on first
    /// reference.
    pub fn get_or_create(&mut self, name: &str) -> &mut Room {
        self.rooms.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    /// Drop a room entirely. `None` when the room was unknown.
    pub fn delete(&mut self, name: &str) -> Option<Room> {
        self.rooms.remove(name)
    }

    /// Iterate rooms in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Room)> {
        self.rooms.iter()
    }

    /// Find the first active entry a user holds anywhere.
    ///
    /// O(total entries across all rooms); join frequency is human-paced,
    /// so the scan is not a hot path.
    pub fn find_active_entry(&self, user_id: &UserId) -> Option<ActiveEntry> {
        for (room_name, room) in &self.rooms {
            for queue_type in [QueueType::Marking, QueueType::Question] {
                if let Some(entry) = room.entry_for_user(queue_type, user_id) {
                    return Some(ActiveEntry {
                        room: room_name.clone(),
                        queue_type,
                        entry_id: entry.id,
                        status: entry.status,
                    });
                }
            }
        }
        None
    }

    /// Cross-room membership guard.
    ///
    /// A user may hold entries in at most one room at a time. Same-room
    /// entries pass: holding one marking and one question entry in the
    /// same room is allowed (the per-queue duplicate check is separate).
    ///
    /// # Errors
    ///
    /// Returns `QueueError::CrossRoomConflict` naming the conflicting room
    /// and queue type.
    pub fn check_cross_room(&self, user_id: &UserId, room: &str) -> Result<(), QueueError> {
        match self.find_active_entry(user_id) {
            Some(active) if active.room != room => Err(QueueError::CrossRoomConflict {
                room: active.room,
                queue_type: active.queue_type,
            }),
            _ => Ok(()),
        }
    }

    /// The entry a user holds in a given room and queue, with its position.
    pub fn user_entry_with_position(
        &self,
        room: &str,
        queue_type: QueueType,
        user_id: &UserId,
    ) -> Option<(&Entry, usize)> {
        let room = self.get(room)?;
        let entry = room.entry_for_user(queue_type, user_id)?;
        Some((entry, room.entry_position(queue_type, entry.id)))
    }

    /// Serialize the whole room map for the persistent store.
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.rooms).expect("room map serializes")
    }
}

impl Serialize for RoomRegistry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rooms.serialize(serializer)
    }
}
