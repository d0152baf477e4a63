//! Domain layer error definitions.

use thiserror::Error;

use super::entity::{QueueSelector, QueueType};

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// UserId validation error
    #[error("Missing user id.")]
    UserIdEmpty,

    /// UserId too long error
    #[error("User id cannot exceed {max} characters (got {actual}).")]
    UserIdTooLong { max: usize, actual: usize },

    /// RoomName validation error
    #[error("Missing room name.")]
    RoomNameEmpty,

    /// RoomName too long error
    #[error("Room name cannot exceed {max} characters (got {actual}).")]
    RoomNameTooLong { max: usize, actual: usize },

    /// StudentId validation error
    #[error("Student ID must be exactly 4 digits (got '{0}').")]
    StudentIdInvalid(String),
}

/// Errors raised by queue operations.
///
/// All variants are recoverable and surfaced only to the requesting
/// client; none of them leaves the queue state changed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The user already holds an active entry in this exact room + queue.
    #[error("You are already in the {queue_type} queue.")]
    DuplicateEntry { queue_type: QueueType },

    /// The user holds an active entry in a different room.
    #[error("You are already queued in room '{room}' ({queue_type}). Leave that queue first.")]
    CrossRoomConflict {
        room: String,
        queue_type: QueueType,
    },

    /// The operator called next on a queue with nothing waiting.
    #[error("{}", empty_queue_message(.selector))]
    EmptyQueue { selector: QueueSelector },

    /// A user tried to follow their own question.
    #[error("You cannot follow your own question.")]
    FollowOwnEntry,

    /// A user tried to follow the same question twice.
    #[error("You are already following this question.")]
    AlreadyFollowing,
}

fn empty_queue_message(selector: &QueueSelector) -> String {
    match selector {
        QueueSelector::Combined => "No one waiting in any queue.".to_string(),
        QueueSelector::Marking => "No one waiting in the marking queue.".to_string(),
        QueueSelector::Question => "No one waiting in the question queue.".to_string(),
    }
}
