//! Connection and identity tracking.
//!
//! One user may hold several live connections (tabs, devices), so the
//! manager keeps a bidirectional index: connection → (user, room) and
//! user/room → set of connections. Disconnecting only unregisters the
//! connection; queue entries are never touched here — a closed tab must
//! not forfeit a queue position.

use std::collections::{HashMap, HashSet};

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::infrastructure::dto::ws::ServerEvent;

/// One live WebSocket connection.
struct Connection {
    /// Outbound frame channel
    sender: mpsc::UnboundedSender<String>,
    /// Identity bound by `register-user`, if any
    user_id: Option<String>,
    /// Room joined by `register-user`, if any
    room: Option<String>,
}

#[derive(Default)]
struct SessionIndex {
    connections: HashMap<Uuid, Connection>,
    by_user: HashMap<String, HashSet<Uuid>>,
    by_room: HashMap<String, HashSet<Uuid>>,
}

/// Tracks live connections and routes targeted and broadcast events.
#[derive(Default)]
pub struct SessionManager {
    index: Mutex<SessionIndex>,
}

fn encode(event: &ServerEvent) -> String {
    serde_json::to_string(event).expect("server event serializes")
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a fresh connection. Identity and room are bound later by
    /// `register-user`.
    pub async fn connect(&self, sender: mpsc::UnboundedSender<String>) -> Uuid {
        let conn_id = Uuid::new_v4();
        let mut index = self.index.lock().await;
        index.connections.insert(
            conn_id,
            Connection {
                sender,
                user_id: None,
                room: None,
            },
        );
        conn_id
    }

    /// Bind a connection to a user identity and room, replacing any
    /// previous binding of the same connection.
    pub async fn register(&self, conn_id: Uuid, user_id: &str, room: &str) {
        let mut index = self.index.lock().await;
        Self::unbind(&mut index, conn_id);
        let Some(conn) = index.connections.get_mut(&conn_id) else {
            return;
        };
        conn.user_id = Some(user_id.to_string());
        conn.room = Some(room.to_string());
        index
            .by_user
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id);
        index
            .by_room
            .entry(room.to_string())
            .or_default()
            .insert(conn_id);
    }

    /// Forget a connection entirely.
    pub async fn disconnect(&self, conn_id: Uuid) {
        let mut index = self.index.lock().await;
        Self::unbind(&mut index, conn_id);
        index.connections.remove(&conn_id);
    }

    fn unbind(index: &mut SessionIndex, conn_id: Uuid) {
        let Some(conn) = index.connections.get_mut(&conn_id) else {
            return;
        };
        let user_id = conn.user_id.take();
        let room = conn.room.take();
        if let Some(user_id) = user_id
            && let Some(set) = index.by_user.get_mut(&user_id)
        {
            set.remove(&conn_id);
            if set.is_empty() {
                index.by_user.remove(&user_id);
            }
        }
        if let Some(room) = room
            && let Some(set) = index.by_room.get_mut(&room)
        {
            set.remove(&conn_id);
            if set.is_empty() {
                index.by_room.remove(&room);
            }
        }
    }

    /// Send an event to one connection.
    pub async fn send_to_conn(&self, conn_id: Uuid, event: &ServerEvent) {
        let frame = encode(event);
        let index = self.index.lock().await;
        if let Some(conn) = index.connections.get(&conn_id)
            && conn.sender.send(frame).is_err()
        {
            tracing::warn!("Failed to send event to connection {}", conn_id);
        }
    }

    /// Send an event to every connection of a user identity.
    pub async fn send_to_user(&self, user_id: &str, event: &ServerEvent) {
        let frame = encode(event);
        let index = self.index.lock().await;
        let Some(conn_ids) = index.by_user.get(user_id) else {
            return;
        };
        for conn_id in conn_ids {
            if let Some(conn) = index.connections.get(conn_id)
                && conn.sender.send(frame.clone()).is_err()
            {
                tracing::warn!("Failed to send event to user '{}'", user_id);
            }
        }
    }

    /// Send an event to every connection registered to a room.
    pub async fn broadcast_room(&self, room: &str, event: &ServerEvent) {
        let frame = encode(event);
        let index = self.index.lock().await;
        let Some(conn_ids) = index.by_room.get(room) else {
            return;
        };
        for conn_id in conn_ids {
            if let Some(conn) = index.connections.get(conn_id) {
                let _ = conn.sender.send(frame.clone());
            }
        }
    }

    /// Send an event to every live connection.
    pub async fn broadcast_all(&self, event: &ServerEvent) {
        let frame = encode(event);
        let index = self.index.lock().await;
        for conn in index.connections.values() {
            let _ = conn.sender.send(frame.clone());
        }
    }

    /// Number of live connections (all rooms).
    pub async fn connection_count(&self) -> usize {
        self.index.lock().await.connections.len()
    }
}
