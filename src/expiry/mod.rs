//! Expiration Module
//!
//! Time-based key expiration.
//!
//! ## Responsibilities
//! - Track which items carry a TTL, ordered by deadline
//! - Background sweep that removes due items through a writable transaction
//! - Expiration hook with an explicit retry policy
//!
//! Reads check deadlines lazily as well, so an item past its TTL is gone for
//! every reader whether or not a sweep has run yet.

mod sweeper;
mod tracker;

use std::time::{SystemTime, UNIX_EPOCH};

pub use sweeper::SweepStats;
pub(crate) use sweeper::{sweep, Sweeper};
pub use tracker::ExpiryTracker;

/// Wall-clock time in unix milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
