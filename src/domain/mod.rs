//! Domain layer for the queue server.
//!
//! This module contains the queue state machine and its invariants,
//! independent of transport and storage concerns.

pub mod entity;
pub mod error;
pub mod value_object;

pub use entity::{
    Entry, EntryDetails, EntryStatus, Follower, QueueSelector, QueueType, Room,
};
pub use error::QueueError;
pub use value_object::{RoomName, StudentId, UserId};
