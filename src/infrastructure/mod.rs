//! Infrastructure layer: in-memory room registry, durable store, and wire
//! DTOs.

pub mod dto;
pub mod registry;
pub mod store;

pub use registry::{ActiveEntry, RoomRegistry};
pub use store::{FileStore, QueueStore};
