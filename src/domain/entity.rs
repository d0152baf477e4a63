//! Core domain models: rooms, queue entries, and entry lifecycle transitions.
//!
//! A room owns two ordered queues (marking, question). Entries move through
//! `waiting → called → assisting` and are spliced out on leave, remove,
//! finish, or clear. Positions are derived, never stored: the 1-based rank
//! among waiting-or-called entries in sequence order, with 0 meaning
//! "being served".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::QueueError;
use super::value_object::{StudentId, UserId};
use crate::common::time;

/// The two real queue types of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueType {
    Marking,
    Question,
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueType::Marking => write!(f, "marking"),
            QueueType::Question => write!(f, "question"),
        }
    }
}

/// Queue selector for operator actions: a real queue or the time-merged
/// combined view over both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueSelector {
    Marking,
    Question,
    Combined,
}

impl QueueSelector {
    /// The real queues covered by this selector.
    pub fn queues(&self) -> &'static [QueueType] {
        match self {
            QueueSelector::Marking => &[QueueType::Marking],
            QueueSelector::Question => &[QueueType::Question],
            QueueSelector::Combined => &[QueueType::Marking, QueueType::Question],
        }
    }
}

impl From<QueueType> for QueueSelector {
    fn from(qt: QueueType) -> Self {
        match qt {
            QueueType::Marking => QueueSelector::Marking,
            QueueType::Question => QueueSelector::Question,
        }
    }
}

/// Lifecycle status of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Waiting,
    Called,
    Assisting,
}

/// A second user who shares an already-queued question.
///
/// A follower does not occupy a queue slot; they are notified alongside the
/// original asker when the entry is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follower {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub name: String,
}

/// Queue-type-specific entry payload.
///
/// The variant tags each entry with its real queue type at all times, so
/// combined-view operations never have to sniff which array an entry came
/// from. Serialized flat into the entry object; marking entries are
/// recognized by `studentId`, question entries carry `description` and
/// (when non-empty) `followers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryDetails {
    Marking {
        #[serde(rename = "studentId")]
        student_id: StudentId,
    },
    Question {
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        followers: Vec<Follower>,
    },
}

impl EntryDetails {
    /// The queue type this payload belongs to.
    pub fn queue_type(&self) -> QueueType {
        match self {
            EntryDetails::Marking { .. } => QueueType::Marking,
            EntryDetails::Question { .. } => QueueType::Question,
        }
    }
}

/// One user's active claim on a position in a room's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Opaque unique entry id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Optional contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Join timestamp; ordering across queues derives from this, not from
    /// raw sequence position
    pub joined_at: DateTime<Utc>,
    /// Stable cross-session identity of the owning user
    pub user_id: UserId,
    /// Lifecycle status
    pub status: EntryStatus,
    /// Queue-type-specific payload
    #[serde(flatten)]
    pub details: EntryDetails,
}

impl Entry {
    /// Create a fresh waiting marking entry with the current timestamp.
    pub fn new_marking(
        name: String,
        student_id: StudentId,
        email: Option<String>,
        user_id: UserId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            joined_at: time::now(),
            user_id,
            status: EntryStatus::Waiting,
            details: EntryDetails::Marking { student_id },
        }
    }

    /// Create a fresh waiting question entry with the current timestamp.
    pub fn new_question(
        name: String,
        description: String,
        email: Option<String>,
        user_id: UserId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            joined_at: time::now(),
            user_id,
            status: EntryStatus::Waiting,
            details: EntryDetails::Question {
                description,
                followers: Vec::new(),
            },
        }
    }

    /// The real queue type of this entry.
    pub fn queue_type(&self) -> QueueType {
        self.details.queue_type()
    }

    /// Followers of this entry (empty for marking entries).
    pub fn followers(&self) -> &[Follower] {
        match &self.details {
            EntryDetails::Question { followers, .. } => followers,
            EntryDetails::Marking { .. } => &[],
        }
    }
}

/// An isolated namespace holding the two ordered queues and an optional
/// access password. Unclaimed rooms have `password: None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Room {
    #[serde(default)]
    pub marking: Vec<Entry>,
    #[serde(default)]
    pub question: Vec<Entry>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Room {
    /// Immutable access to one queue.
    pub fn queue(&self, queue_type: QueueType) -> &Vec<Entry> {
        match queue_type {
            QueueType::Marking => &self.marking,
            QueueType::Question => &self.question,
        }
    }

    /// Mutable access to one queue.
    pub fn queue_mut(&mut self, queue_type: QueueType) -> &mut Vec<Entry> {
        match queue_type {
            QueueType::Marking => &mut self.marking,
            QueueType::Question => &mut self.question,
        }
    }

    /// The entry a user holds in the given queue, if any (any status).
    pub fn entry_for_user(&self, queue_type: QueueType, user_id: &UserId) -> Option<&Entry> {
        self.queue(queue_type).iter().find(|e| &e.user_id == user_id)
    }

    /// All active entries this user holds in the room.
    pub fn entries_of_user(&self, user_id: &UserId) -> Vec<&Entry> {
        self.marking
            .iter()
            .chain(self.question.iter())
            .filter(|e| &e.user_id == user_id)
            .collect()
    }

    /// Append a new waiting entry to the tail of its queue.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::DuplicateEntry` if the user already holds an
    /// entry in that exact queue, regardless of status.
    pub fn join(&mut self, entry: Entry) -> Result<usize, QueueError> {
        let queue_type = entry.queue_type();
        if self.entry_for_user(queue_type, &entry.user_id).is_some() {
            return Err(QueueError::DuplicateEntry { queue_type });
        }
        let entry_id = entry.id;
        self.queue_mut(queue_type).push(entry);
        Ok(self.entry_position(queue_type, entry_id))
    }

    /// Splice out the entry with the given id. `None` when absent.
    pub fn remove(&mut self, queue_type: QueueType, entry_id: Uuid) -> Option<Entry> {
        let queue = self.queue_mut(queue_type);
        let index = queue.iter().position(|e| e.id == entry_id)?;
        Some(queue.remove(index))
    }

    /// Move a waiting entry one position toward the tail.
    ///
    /// No-op (`None`) if the entry is absent, not waiting, or already at
    /// the tail. After relocation the entry's `joinedAt` is rewritten to
    /// one second after its new predecessor's, so the time-merged combined
    /// view respects the new order.
    pub fn push_back(&mut self, queue_type: QueueType, entry_id: Uuid) -> Option<usize> {
        let queue = self.queue_mut(queue_type);
        let index = queue.iter().position(|e| e.id == entry_id)?;
        if queue[index].status != EntryStatus::Waiting {
            return None;
        }
        if index + 1 >= queue.len() {
            return None;
        }

        let mut entry = queue.remove(index);
        let new_index = index + 1;
        entry.joined_at = time::one_second_after(queue[new_index - 1].joined_at);
        queue.insert(new_index, entry);

        Some(self.entry_position(queue_type, entry_id))
    }

    /// The queue holding the earliest waiting entry under the selector.
    ///
    /// For the combined view, timestamps are compared across both queues
    /// and marking wins an exact tie.
    fn next_waiting_queue(&self, selector: QueueSelector) -> Option<QueueType> {
        let first_waiting = |qt: QueueType| {
            self.queue(qt)
                .iter()
                .find(|e| e.status == EntryStatus::Waiting)
                .map(|e| e.joined_at)
        };
        match selector {
            QueueSelector::Marking => first_waiting(QueueType::Marking).map(|_| QueueType::Marking),
            QueueSelector::Question => {
                first_waiting(QueueType::Question).map(|_| QueueType::Question)
            }
            QueueSelector::Combined => {
                match (
                    first_waiting(QueueType::Marking),
                    first_waiting(QueueType::Question),
                ) {
                    (Some(m), Some(q)) if m <= q => Some(QueueType::Marking),
                    (Some(_), Some(_)) => Some(QueueType::Question),
                    (Some(_), None) => Some(QueueType::Marking),
                    (None, Some(_)) => Some(QueueType::Question),
                    (None, None) => None,
                }
            }
        }
    }

    /// Transition the earliest waiting entry under the selector to called.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::EmptyQueue` when nothing is waiting. Entries
    /// already called are not re-callable.
    pub fn call_next(&mut self, selector: QueueSelector) -> Result<(QueueType, Entry), QueueError> {
        let queue_type = self
            .next_waiting_queue(selector)
            .ok_or(QueueError::EmptyQueue { selector })?;
        for entry in self.queue_mut(queue_type).iter_mut() {
            if entry.status == EntryStatus::Waiting {
                entry.status = EntryStatus::Called;
                return Ok((queue_type, entry.clone()));
            }
        }
        Err(QueueError::EmptyQueue { selector })
    }

    /// Locate an entry under a selector without mutating it.
    pub fn resolve(&self, selector: QueueSelector, entry_id: Uuid) -> Option<QueueType> {
        selector
            .queues()
            .iter()
            .copied()
            .find(|qt| self.queue(*qt).iter().any(|e| e.id == entry_id))
    }

    /// Transition a specific entry to called, bypassing ordering.
    /// Silent no-op (`None`) on unknown id or on an assisting entry:
    /// assisting never steps backward to called.
    pub fn call_entry(
        &mut self,
        selector: QueueSelector,
        entry_id: Uuid,
    ) -> Option<(QueueType, Entry)> {
        let queue_type = self.resolve(selector, entry_id)?;
        let entry = self
            .queue_mut(queue_type)
            .iter_mut()
            .find(|e| e.id == entry_id)?;
        if entry.status == EntryStatus::Assisting {
            return None;
        }
        entry.status = EntryStatus::Called;
        Some((queue_type, entry.clone()))
    }

    /// Reverse called → waiting. Silent no-op unless the entry is called.
    /// Returns the recomputed waiting position.
    pub fn cancel_call(
        &mut self,
        selector: QueueSelector,
        entry_id: Uuid,
    ) -> Option<(QueueType, Entry, usize)> {
        let queue_type = self.resolve(selector, entry_id)?;
        let entry = self
            .queue_mut(queue_type)
            .iter_mut()
            .find(|e| e.id == entry_id)?;
        if entry.status != EntryStatus::Called {
            return None;
        }
        entry.status = EntryStatus::Waiting;
        let entry = entry.clone();
        let position = self.entry_position(queue_type, entry_id);
        Some((queue_type, entry, position))
    }

    /// Transition an entry to assisting. No hard precondition: calling
    /// waiting → assisting directly is tolerated.
    pub fn start_assisting(
        &mut self,
        selector: QueueSelector,
        entry_id: Uuid,
    ) -> Option<(QueueType, Entry)> {
        let queue_type = self.resolve(selector, entry_id)?;
        let entry = self
            .queue_mut(queue_type)
            .iter_mut()
            .find(|e| e.id == entry_id)?;
        entry.status = EntryStatus::Assisting;
        Some((queue_type, entry.clone()))
    }

    /// Remove every assisting entry under the selector in one step.
    /// Waiting and called entries are untouched.
    pub fn finish(&mut self, selector: QueueSelector) -> Vec<(QueueType, Entry)> {
        let mut removed = Vec::new();
        for &queue_type in selector.queues() {
            let queue = self.queue_mut(queue_type);
            for entry in std::mem::take(queue) {
                if entry.status == EntryStatus::Assisting {
                    removed.push((queue_type, entry));
                } else {
                    queue.push(entry);
                }
            }
        }
        removed
    }

    /// Empty both queues.
    pub fn clear(&mut self) {
        self.marking.clear();
        self.question.clear();
    }

    /// Attach a follower to a question entry.
    ///
    /// Unknown entry ids are a silent no-op (`Ok(None)`); following one's
    /// own entry or following twice is an error.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::FollowOwnEntry` or `QueueError::AlreadyFollowing`.
    pub fn follow(
        &mut self,
        entry_id: Uuid,
        user_id: UserId,
        name: String,
    ) -> Result<Option<Entry>, QueueError> {
        let Some(entry) = self.question.iter_mut().find(|e| e.id == entry_id) else {
            return Ok(None);
        };
        if entry.user_id == user_id {
            return Err(QueueError::FollowOwnEntry);
        }
        let EntryDetails::Question { followers, .. } = &mut entry.details else {
            return Ok(None);
        };
        if followers.iter().any(|f| f.user_id == user_id) {
            return Err(QueueError::AlreadyFollowing);
        }
        followers.push(Follower { user_id, name });
        Ok(Some(entry.clone()))
    }

    /// Detach a follower from a question entry. Silent no-op when absent.
    pub fn unfollow(&mut self, entry_id: Uuid, user_id: &UserId) -> bool {
        let Some(entry) = self.question.iter_mut().find(|e| e.id == entry_id) else {
            return false;
        };
        let EntryDetails::Question { followers, .. } = &mut entry.details else {
            return false;
        };
        let before = followers.len();
        followers.retain(|f| &f.user_id != user_id);
        followers.len() != before
    }

    /// Derived 1-based position of an entry among waiting-or-called entries
    /// in its queue; 0 for assisting or unknown entries.
    pub fn entry_position(&self, queue_type: QueueType, entry_id: Uuid) -> usize {
        let mut rank = 0;
        for entry in self.queue(queue_type) {
            let counts = matches!(entry.status, EntryStatus::Waiting | EntryStatus::Called);
            if counts {
                rank += 1;
            }
            if entry.id == entry_id {
                return if counts { rank } else { 0 };
            }
        }
        0
    }

    /// Every entry of a queue paired with its derived position.
    pub fn with_positions(&self, queue_type: QueueType) -> Vec<(usize, &Entry)> {
        let mut rank = 0;
        self.queue(queue_type)
            .iter()
            .map(|entry| {
                if matches!(entry.status, EntryStatus::Waiting | EntryStatus::Called) {
                    rank += 1;
                    (rank, entry)
                } else {
                    (0, entry)
                }
            })
            .collect()
    }

    /// The first `limit` waiting entries with their derived positions.
    pub fn waiting_front(&self, queue_type: QueueType, limit: usize) -> Vec<(usize, &Entry)> {
        self.with_positions(queue_type)
            .into_iter()
            .filter(|(_, e)| e.status == EntryStatus::Waiting)
            .take(limit)
            .collect()
    }

    /// Whether the room has been claimed with a password.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}
