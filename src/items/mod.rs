//! Item Store Module
//!
//! The primary ordered store of live items.
//!
//! ## Responsibilities
//! - Own every item (value + optional expiry)
//! - Keep secondary indexes and the expiration tracker consistent with it
//! - Lazy expiration on read
//!
//! ## Data Structure Choice
//! One `OrderedTree<String, Item>` keyed by item key; values are `Bytes` so
//! handing them to iterators, hooks and snapshots never copies.

mod store;

use std::time::Duration;

use bytes::Bytes;

pub use store::ItemStore;

/// A stored value and its optional deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Opaque value bytes
    pub value: Bytes,

    /// Absolute expiry (unix millis), `None` = never expires
    pub expires_at: Option<u64>,
}

impl Item {
    pub fn new(value: impl Into<Bytes>, expires_at: Option<u64>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// True once the deadline has passed
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Remaining lifetime at `now`; `None` for items without a TTL
    pub fn ttl(&self, now: u64) -> Option<Duration> {
        self.expires_at
            .map(|at| Duration::from_millis(at.saturating_sub(now)))
    }
}
