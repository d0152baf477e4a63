//! UseCase layer error definitions.

use thiserror::Error;

/// Errors for the room access / authentication operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Wrong or unconfigured master secret on claim-room.
    #[error("Invalid master password.")]
    MasterPasswordRejected,

    /// Room auth against a room that does not exist.
    #[error("Unknown room.")]
    UnknownRoom,

    /// Wrong room password.
    #[error("Invalid room password.")]
    RoomPasswordRejected,
}
