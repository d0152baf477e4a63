//! Timestamp helpers.
//!
//! Queue entries are ordered by their `joinedAt` timestamp, not by raw
//! sequence position, so everything that rewrites timestamps goes through
//! here.

use chrono::{DateTime, Duration, Utc};

/// Current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// One second after the given instant.
///
/// Used by push-back to slot an entry just behind its new predecessor in
/// the time-merged combined view.
pub fn one_second_after(t: DateTime<Utc>) -> DateTime<Utc> {
    t + Duration::seconds(1)
}
