//! UseCase: TA-side operations on a room.
//!
//! Call / cancel / assist / finish / remove / clear-all / delete-room.
//! Every state change persists a snapshot and rebroadcasts the room.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{Entry, QueueError, QueueSelector, QueueType, RoomName};
use crate::infrastructure::dto::ws::ServerEvent;
use crate::infrastructure::registry::RoomRegistry;
use crate::infrastructure::store::QueueStore;

use super::notify::Dispatcher;

pub struct OperatorUseCase {
    registry: Arc<Mutex<RoomRegistry>>,
    store: Arc<dyn QueueStore>,
    dispatcher: Arc<Dispatcher>,
}

impl OperatorUseCase {
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

    /// Call the earliest waiting entry under the selector.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::EmptyQueue` when nothing is waiting. Entries
    /// already called stay called and are not picked again.
    pub async fn check_in(
        &self,
        room: &RoomName,
        selector: QueueSelector,
    ) -> Result<(), QueueError> {
        let (snapshot, queue_type, entry) = {
            let mut registry = self.registry.lock().await;
            let room_state = registry
                .get_mut(room.as_str())
                .ok_or(QueueError::EmptyQueue { selector })?;
            let (queue_type, entry) = room_state.call_next(selector)?;
            (registry.snapshot_json(), queue_type, entry)
        };

        tracing::info!(
            "TA called {} from the {} queue in room '{}'",
            entry.name,
            queue_type,
            room
        );

        self.store.request_save(snapshot).await;
        self.notify_called(queue_type, &entry).await;
        self.dispatcher.broadcast_room(room.as_str()).await;
        Ok(())
    }

    /// Call a specific entry out of order. Unknown ids are silent.
    pub async fn call_specific(
        &self,
        room: &RoomName,
        selector: QueueSelector,
        entry_id: Uuid,
    ) {
        let (snapshot, queue_type, entry) = {
            let mut registry = self.registry.lock().await;
            let Some((queue_type, entry)) = registry
                .get_mut(room.as_str())
                .and_then(|r| r.call_entry(selector, entry_id))
            else {
                return;
            };
            (registry.snapshot_json(), queue_type, entry)
        };

        tracing::info!("TA called {} out of order in room '{}'", entry.name, room);

        self.store.request_save(snapshot).await;
        self.notify_called(queue_type, &entry).await;
        self.dispatcher.broadcast_room(room.as_str()).await;
    }

    /// Reverse a call: the entry returns to waiting and learns its
    /// recomputed position through the join confirmation event.
    pub async fn cancel_call(&self, room: &RoomName, selector: QueueSelector, entry_id: Uuid) {
        let (snapshot, queue_type, entry, position) = {
            let mut registry = self.registry.lock().await;
            let Some((queue_type, entry, position)) = registry
                .get_mut(room.as_str())
                .and_then(|r| r.cancel_call(selector, entry_id))
            else {
                return;
            };
            (registry.snapshot_json(), queue_type, entry, position)
        };

        self.store.request_save(snapshot).await;
        self.dispatcher
            .to_user(
                entry.user_id.as_str(),
                ServerEvent::JoinedQueue {
                    queue_type,
                    position,
                    entry_id: entry.id,
                },
            )
            .await;
        self.dispatcher.broadcast_room(room.as_str()).await;
    }

    /// Mark an entry as being assisted.
    pub async fn start_assisting(&self, room: &RoomName, selector: QueueSelector, entry_id: Uuid) {
        let (snapshot, queue_type, entry) = {
            let mut registry = self.registry.lock().await;
            let Some((queue_type, entry)) = registry
                .get_mut(room.as_str())
                .and_then(|r| r.start_assisting(selector, entry_id))
            else {
                return;
            };
            (registry.snapshot_json(), queue_type, entry)
        };

        tracing::info!("TA started assisting {} in room '{}'", entry.name, room);

        self.store.request_save(snapshot).await;
        self.dispatcher
            .to_user(
                entry.user_id.as_str(),
                ServerEvent::AssistingStarted {
                    queue_type,
                    message: "The TA is assisting you now.".to_string(),
                },
            )
            .await;
        self.dispatcher.broadcast_room(room.as_str()).await;
    }

    /// Remove every assisting entry under the selector in one step.
    pub async fn finish(&self, room: &RoomName, selector: QueueSelector) {
        let (snapshot, removed) = {
            let mut registry = self.registry.lock().await;
            let Some(room_state) = registry.get_mut(room.as_str()) else {
                return;
            };
            let removed = room_state.finish(selector);
            if removed.is_empty() {
                return;
            }
            (registry.snapshot_json(), removed)
        };

        self.store.request_save(snapshot).await;
        for (queue_type, entry) in &removed {
            tracing::info!("TA finished assisting {} in room '{}'", entry.name, room);
            self.notify_finished(*queue_type, entry).await;
        }
        self.dispatcher.broadcast_room(room.as_str()).await;
        for &queue_type in selector.queues() {
            self.dispatcher.notify_front(room.as_str(), queue_type).await;
        }
    }

    /// Remove one entry regardless of status, with a notice to its owner.
    pub async fn remove(&self, room: &RoomName, queue_type: QueueType, entry_id: Uuid) {
        let (snapshot, entry) = {
            let mut registry = self.registry.lock().await;
            let Some(entry) = registry
                .get_mut(room.as_str())
                .and_then(|r| r.remove(queue_type, entry_id))
            else {
                return;
            };
            (registry.snapshot_json(), entry)
        };

        tracing::info!(
            "TA removed {} from the {} queue in room '{}'",
            entry.name,
            queue_type,
            room
        );

        self.store.request_save(snapshot).await;
        self.dispatcher
            .to_user(
                entry.user_id.as_str(),
                ServerEvent::RemovedFromQueue {
                    queue_type: Some(queue_type),
                    message: format!("You have been removed from the {queue_type} queue."),
                },
            )
            .await;
        self.dispatcher.broadcast_room(room.as_str()).await;
        self.dispatcher.notify_front(room.as_str(), queue_type).await;
    }

    /// Empty both queues. Every room member gets the reset notice,
    /// queued or not.
    pub async fn clear_all(&self, room: &RoomName) {
        let snapshot = {
            let mut registry = self.registry.lock().await;
            let Some(room_state) = registry.get_mut(room.as_str()) else {
                return;
            };
            room_state.clear();
            registry.snapshot_json()
        };

        tracing::info!("TA cleared all queues in room '{}'", room);

        self.store.request_save(snapshot).await;
        self.dispatcher
            .to_room(
                room.as_str(),
                ServerEvent::RemovedFromQueue {
                    queue_type: None,
                    message: "The queue has been reset by the TA.".to_string(),
                },
            )
            .await;
        self.dispatcher.broadcast_room(room.as_str()).await;
    }

    /// Drop a room entirely. Members are told before the rooms list
    /// refreshes.
    pub async fn delete_room(&self, room: &RoomName) {
        let snapshot = {
            let mut registry = self.registry.lock().await;
            if registry.delete(room.as_str()).is_none() {
                return;
            }
            registry.snapshot_json()
        };

        tracing::info!("TA deleted room '{}'", room);

        self.store.request_save(snapshot).await;
        self.dispatcher
            .to_room(
                room.as_str(),
                ServerEvent::RoomDeleted {
                    message: "This room has been deleted by the TA.".to_string(),
                },
            )
            .await;
        self.dispatcher.broadcast_rooms_list().await;
    }

    /// The call notice goes to the entry's owner and, for questions, to
    /// every follower.
    async fn notify_called(&self, queue_type: QueueType, entry: &Entry) {
        self.dispatcher
            .to_user(
                entry.user_id.as_str(),
                ServerEvent::BeingCalled {
                    queue_type,
                    message: "TA will be with you shortly. Please raise your hand.".to_string(),
                    is_follower: None,
                },
            )
            .await;
        for follower in entry.followers() {
            self.dispatcher
                .to_user(
                    follower.user_id.as_str(),
                    ServerEvent::BeingCalled {
                        queue_type,
                        message: "TA will be with you shortly. Please raise your hand."
                            .to_string(),
                        is_follower: Some(true),
                    },
                )
                .await;
        }
    }

    async fn notify_finished(&self, queue_type: QueueType, entry: &Entry) {
        if queue_type == QueueType::Question {
            // Completion notices are marking-only.
            return;
        }
        self.dispatcher
            .to_user(
                entry.user_id.as_str(),
                ServerEvent::FinishedAssisting {
                    queue_type,
                    message: "The TA has finished assisting you. Hope that helped!".to_string(),
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StudentId, UserId};
    use crate::infrastructure::store::MockQueueStore;
    use crate::ui::sessions::SessionManager;
    use tokio::sync::mpsc;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn room_name(name: &str) -> RoomName {
        RoomName::new(name.to_string()).unwrap()
    }

    fn marking_entry(user_id: &str) -> Entry {
        Entry::new_marking(
            user_id.to_string(),
            StudentId::new("5555".to_string()).unwrap(),
            None,
            user(user_id),
        )
    }

    fn question_entry(user_id: &str) -> Entry {
        Entry::new_question(user_id.to_string(), "q".to_string(), None, user(user_id))
    }

    fn setup() -> (Arc<Mutex<RoomRegistry>>, Arc<SessionManager>, OperatorUseCase) {
        let registry = Arc::new(Mutex::new(RoomRegistry::default()));
        let sessions = Arc::new(SessionManager::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
        ));
        let mut store = MockQueueStore::new();
        store.expect_request_save().returning(|_| ());
        let usecase = OperatorUseCase::new(
            Arc::clone(&registry),
            Arc::new(store),
            dispatcher,
        );
        (registry, sessions, usecase)
    }

    async fn connect_user(
        sessions: &SessionManager,
        user_id: &str,
        room: &str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = sessions.connect(tx).await;
        sessions.register(conn_id, user_id, room).await;
        rx
    }

    fn events(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_checkin_calls_first_waiting_and_notifies() {
        // Scenario: U1, U2, U3 waiting in question; checkin calls U1.
        let (registry, sessions, usecase) = setup();
        {
            let mut reg = registry.lock().await;
            let room = reg.get_or_create("r1");
            for id in ["u1", "u2", "u3"] {
                room.join(question_entry(id)).unwrap();
            }
        }
        let mut rx1 = connect_user(&sessions, "u1", "r1").await;

        usecase
            .check_in(&room_name("r1"), QueueSelector::Question)
            .await
            .unwrap();

        let frames = events(&mut rx1);
        let called = frames.iter().find(|f| f["event"] == "being-called").unwrap();
        assert_eq!(called["data"]["queueType"], "question");
        assert_eq!(
            called["data"]["message"],
            "TA will be with you shortly. Please raise your hand."
        );
        let reg = registry.lock().await;
        assert_eq!(
            reg.get("r1").unwrap().question[0].status,
            crate::domain::EntryStatus::Called
        );
    }

    #[tokio::test]
    async fn test_called_entries_are_not_recallable() {
        let (registry, _sessions, usecase) = setup();
        {
            let mut reg = registry.lock().await;
            reg.get_or_create("r1").join(question_entry("u1")).unwrap();
        }

        usecase
            .check_in(&room_name("r1"), QueueSelector::Question)
            .await
            .unwrap();
        let second = usecase
            .check_in(&room_name("r1"), QueueSelector::Question)
            .await;

        assert_eq!(
            second.unwrap_err(),
            QueueError::EmptyQueue {
                selector: QueueSelector::Question
            }
        );
    }

    #[tokio::test]
    async fn test_combined_checkin_prefers_earlier_marking_on_tie() {
        let (registry, _sessions, usecase) = setup();
        {
            let mut reg = registry.lock().await;
            let room = reg.get_or_create("r1");
            let mut m = marking_entry("m1");
            let mut q = question_entry("q1");
            let now = crate::common::time::now();
            m.joined_at = now;
            q.joined_at = now;
            room.join(q).unwrap();
            room.join(m).unwrap();
        }

        usecase
            .check_in(&room_name("r1"), QueueSelector::Combined)
            .await
            .unwrap();

        let reg = registry.lock().await;
        let room = reg.get("r1").unwrap();
        assert_eq!(room.marking[0].status, crate::domain::EntryStatus::Called);
        assert_eq!(room.question[0].status, crate::domain::EntryStatus::Waiting);
    }

    #[tokio::test]
    async fn test_call_notice_reaches_followers_flagged() {
        let (registry, sessions, usecase) = setup();
        {
            let mut reg = registry.lock().await;
            let room = reg.get_or_create("r1");
            let entry = question_entry("owner");
            let id = entry.id;
            room.join(entry).unwrap();
            room.follow(id, user("buddy"), "Buddy".to_string()).unwrap();
        }
        let mut rx_owner = connect_user(&sessions, "owner", "r1").await;
        let mut rx_buddy = connect_user(&sessions, "buddy", "r1").await;

        usecase
            .check_in(&room_name("r1"), QueueSelector::Question)
            .await
            .unwrap();

        let owner_called = events(&mut rx_owner)
            .into_iter()
            .find(|f| f["event"] == "being-called")
            .unwrap();
        assert!(owner_called["data"].get("isFollower").is_none());

        let buddy_called = events(&mut rx_buddy)
            .into_iter()
            .find(|f| f["event"] == "being-called")
            .unwrap();
        assert_eq!(buddy_called["data"]["isFollower"], true);
    }

    #[tokio::test]
    async fn test_call_specific_on_assisting_entry_is_silent() {
        let (registry, sessions, usecase) = setup();
        let entry_id = {
            let mut reg = registry.lock().await;
            let room = reg.get_or_create("r1");
            let entry = marking_entry("u1");
            let id = entry.id;
            room.join(entry).unwrap();
            room.start_assisting(QueueSelector::Marking, id).unwrap();
            id
        };
        let mut rx = connect_user(&sessions, "u1", "r1").await;

        usecase
            .call_specific(&room_name("r1"), QueueSelector::Marking, entry_id)
            .await;

        // No event, no status change: the student stays mid-assist.
        assert!(rx.try_recv().is_err());
        let reg = registry.lock().await;
        assert_eq!(
            reg.get("r1").unwrap().marking[0].status,
            crate::domain::EntryStatus::Assisting
        );
    }

    #[tokio::test]
    async fn test_cancel_call_returns_entry_to_waiting_with_position() {
        let (registry, sessions, usecase) = setup();
        let entry_id = {
            let mut reg = registry.lock().await;
            let room = reg.get_or_create("r1");
            let entry = marking_entry("u1");
            let id = entry.id;
            room.join(entry).unwrap();
            room.call_entry(QueueSelector::Marking, id).unwrap();
            id
        };
        let mut rx = connect_user(&sessions, "u1", "r1").await;

        usecase
            .cancel_call(&room_name("r1"), QueueSelector::Marking, entry_id)
            .await;

        let frames = events(&mut rx);
        let rejoined = frames.iter().find(|f| f["event"] == "joined-queue").unwrap();
        assert_eq!(rejoined["data"]["position"], 1);
        let reg = registry.lock().await;
        assert_eq!(
            reg.get("r1").unwrap().marking[0].status,
            crate::domain::EntryStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_finish_combined_notifies_marking_only() {
        // The completion notice asymmetry: marking users hear about it,
        // question users do not.
        let (registry, sessions, usecase) = setup();
        {
            let mut reg = registry.lock().await;
            let room = reg.get_or_create("r1");
            let m = marking_entry("m1");
            let m_id = m.id;
            let q = question_entry("q1");
            let q_id = q.id;
            room.join(m).unwrap();
            room.join(q).unwrap();
            room.start_assisting(QueueSelector::Marking, m_id).unwrap();
            room.start_assisting(QueueSelector::Question, q_id).unwrap();
        }
        let mut rx_m = connect_user(&sessions, "m1", "r1").await;
        let mut rx_q = connect_user(&sessions, "q1", "r1").await;

        usecase.finish(&room_name("r1"), QueueSelector::Combined).await;

        let m_frames = events(&mut rx_m);
        let finished = m_frames
            .iter()
            .find(|f| f["event"] == "finished-assisting")
            .unwrap();
        assert_eq!(
            finished["data"]["message"],
            "The TA has finished assisting you. Hope that helped!"
        );

        assert!(events(&mut rx_q)
            .iter()
            .all(|f| f["event"] != "finished-assisting"));

        let reg = registry.lock().await;
        let room = reg.get("r1").unwrap();
        assert!(room.marking.is_empty());
        assert!(room.question.is_empty());
    }

    #[tokio::test]
    async fn test_finish_with_no_assisting_is_silent() {
        let (registry, sessions, usecase) = setup();
        {
            let mut reg = registry.lock().await;
            reg.get_or_create("r1").join(marking_entry("u1")).unwrap();
        }
        let mut rx = connect_user(&sessions, "u1", "r1").await;

        usecase.finish(&room_name("r1"), QueueSelector::Combined).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(registry.lock().await.get("r1").unwrap().marking.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_notifies_removed_user() {
        let (registry, sessions, usecase) = setup();
        let entry_id = {
            let mut reg = registry.lock().await;
            let entry = marking_entry("u1");
            let id = entry.id;
            reg.get_or_create("r1").join(entry).unwrap();
            id
        };
        let mut rx = connect_user(&sessions, "u1", "r1").await;

        usecase
            .remove(&room_name("r1"), QueueType::Marking, entry_id)
            .await;

        let frames = events(&mut rx);
        let removed = frames
            .iter()
            .find(|f| f["event"] == "removed-from-queue")
            .unwrap();
        assert_eq!(removed["data"]["queueType"], "marking");
        assert_eq!(
            removed["data"]["message"],
            "You have been removed from the marking queue."
        );
    }

    #[tokio::test]
    async fn test_clear_all_notifies_every_room_member() {
        let (registry, sessions, usecase) = setup();
        {
            let mut reg = registry.lock().await;
            reg.get_or_create("r1").join(marking_entry("u1")).unwrap();
        }
        let mut rx_queued = connect_user(&sessions, "u1", "r1").await;
        let mut rx_bystander = connect_user(&sessions, "u2", "r1").await;

        usecase.clear_all(&room_name("r1")).await;

        for rx in [&mut rx_queued, &mut rx_bystander] {
            let frames = events(rx);
            let reset = frames
                .iter()
                .find(|f| f["event"] == "removed-from-queue")
                .unwrap();
            assert!(reset["data"].get("queueType").is_none());
            assert_eq!(
                reset["data"]["message"],
                "The queue has been reset by the TA."
            );
        }
        let reg = registry.lock().await;
        assert!(reg.get("r1").unwrap().marking.is_empty());
    }

    #[tokio::test]
    async fn test_delete_room_notifies_members_and_refreshes_list() {
        let (registry, sessions, usecase) = setup();
        registry.lock().await.get_or_create("r1");
        let mut rx = connect_user(&sessions, "u1", "r1").await;

        usecase.delete_room(&room_name("r1")).await;

        let frames = events(&mut rx);
        assert_eq!(frames[0]["event"], "room-deleted");
        assert_eq!(
            frames[0]["data"]["message"],
            "This room has been deleted by the TA."
        );
        assert_eq!(frames[1]["event"], "rooms-list-update");
        assert!(registry.lock().await.get("r1").is_none());
    }
}
