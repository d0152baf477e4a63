//! Shared helpers used across layers.

pub mod time;
