//! Expiration tracker
//!
//! Items with a TTL, ordered by expiry time then key.

use std::collections::HashMap;

use crate::tree::OrderedTree;

/// Time-ordered view over every item that carries a TTL
#[derive(Debug, Default)]
pub struct ExpiryTracker {
    by_time: OrderedTree<(u64, String), ()>,
    by_key: HashMap<String, u64>,
}

impl ExpiryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `key` as expiring at `expires_at` (unix millis), replacing any
    /// earlier deadline
    pub fn track(&mut self, key: &str, expires_at: u64) {
        if let Some(previous) = self.by_key.insert(key.to_string(), expires_at) {
            self.by_time.delete(&(previous, key.to_string()));
        }
        self.by_time.insert((expires_at, key.to_string()), ());
    }

    /// Stop tracking `key`, returning its deadline if it had one
    pub fn untrack(&mut self, key: &str) -> Option<u64> {
        let expires_at = self.by_key.remove(key)?;
        self.by_time.delete(&(expires_at, key.to_string()));
        Some(expires_at)
    }

    /// The entry with the earliest deadline
    pub fn next_expiring(&self) -> Option<(&str, u64)> {
        self.by_time
            .first()
            .map(|((expires_at, key), _)| (key.as_str(), *expires_at))
    }

    /// Keys whose deadline is at or before `now`, earliest first
    pub fn expired(&self, now: u64) -> impl Iterator<Item = &str> + '_ {
        self.by_time
            .iter()
            .take_while(move |((expires_at, _), _)| *expires_at <= now)
            .map(|((_, key), _)| key.as_str())
    }

    /// Deadline of `key`, if tracked
    pub fn expires_at(&self, key: &str) -> Option<u64> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_time.clear();
        self.by_key.clear();
    }
}
