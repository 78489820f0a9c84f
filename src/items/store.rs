//! ItemStore implementation
//!
//! Primary tree plus the structures derived from it. Every mutation goes
//! through `set`/`delete` so indexes and TTL tracking never drift.

use std::ops::Bound;

use crate::error::{EmberError, Result};
use crate::expiry::ExpiryTracker;
use crate::index::{IndexKind, IndexSet, Pattern};
use crate::tree::{OrderedTree, Range};

use super::Item;

/// Primary store of live items
#[derive(Debug, Default)]
pub struct ItemStore {
    /// Items by key, lexicographic order
    items: OrderedTree<String, Item>,

    /// Declared secondary indexes
    indexes: IndexSet,

    /// Items with a TTL, by deadline
    expiry: ExpiryTracker,
}

impl ItemStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item.
    ///
    /// Returns the previous item and whether one was replaced. Indexes whose
    /// pattern matches `key` are updated; the TTL entry follows the new item.
    pub fn set(&mut self, key: &str, item: Item) -> (Option<Item>, bool) {
        let value = item.value.clone();
        let expires_at = item.expires_at;

        let previous = self.items.insert(key.to_string(), item);
        self.indexes
            .on_insert(key, previous.as_ref().map(|p| p.value.as_ref()), &value);

        match expires_at {
            Some(at) => self.expiry.track(key, at),
            None => {
                self.expiry.untrack(key);
            }
        }

        let replaced = previous.is_some();
        (previous, replaced)
    }

    /// Live item under `key`; `NotFound` if absent or expired at `now`
    pub fn get(&self, key: &str, now: u64) -> Result<&Item> {
        match self.items.get(key) {
            Some(item) if !item.is_expired(now) => Ok(item),
            _ => Err(EmberError::NotFound),
        }
    }

    /// Item under `key` regardless of expiry
    pub fn peek(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    /// Remove an item with its index and TTL entries
    pub fn delete(&mut self, key: &str) -> Option<Item> {
        let previous = self.items.delete(key)?;
        self.indexes.on_remove(key, &previous.value);
        if previous.expires_at.is_some() {
            self.expiry.untrack(key);
        }
        Some(previous)
    }

    /// Put `key` back to `previous` (`None` = absent)
    pub fn restore(&mut self, key: &str, previous: Option<Item>) {
        match previous {
            Some(item) => {
                self.set(key, item);
            }
            None => {
                self.delete(key);
            }
        }
    }

    /// Keys matching `pattern`, ascending. A literal prefix narrows the scan.
    pub fn ascend_keys<'a>(
        &'a self,
        pattern: &'a Pattern,
    ) -> impl Iterator<Item = (&'a str, &'a Item)> + 'a {
        self.prefix_span(pattern)
            .filter(move |(key, _)| pattern.matches(key))
            .map(|(key, item)| (key.as_str(), item))
    }

    /// Keys matching `pattern`, descending
    pub fn descend_keys<'a>(
        &'a self,
        pattern: &'a Pattern,
    ) -> impl Iterator<Item = (&'a str, &'a Item)> + 'a {
        self.prefix_span(pattern)
            .rev()
            .filter(move |(key, _)| pattern.matches(key))
            .map(|(key, item)| (key.as_str(), item))
    }

    /// Exactly the keys that start with the pattern's literal prefix
    fn prefix_span(&self, pattern: &Pattern) -> Range<'_, String, Item> {
        let prefix = pattern.literal_prefix();
        let end = match prefix_end(&prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        self.items.span(prefix, end)
    }

    /// All items in key order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &Item)> + '_ {
        self.items.iter().map(|(key, item)| (key.as_str(), item))
    }

    /// The primary tree
    pub fn tree(&self) -> &OrderedTree<String, Item> {
        &self.items
    }

    /// Number of stored items, expired-but-unswept included
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Declare an index and build it from the current items
    pub fn create_index(&mut self, name: &str, pattern: &str, kind: IndexKind) -> Result<()> {
        let existing = self
            .items
            .iter()
            .map(|(key, item)| (key.as_str(), item.value.as_ref()));
        self.indexes.create(name, pattern, kind, existing)
    }

    /// Remove an index declaration
    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        self.indexes.drop_index(name).map(|_| ())
    }

    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    pub fn expiry(&self) -> &ExpiryTracker {
        &self.expiry
    }

    /// Remove every item; index declarations survive
    pub fn clear(&mut self) {
        self.items.clear();
        self.indexes.clear_entries();
        self.expiry.clear();
    }
}

/// Smallest string greater than every string starting with `prefix`;
/// `None` when no such bound exists (empty prefix or all `char::MAX`)
fn prefix_end(prefix: &str) -> Option<String> {
    let mut end = prefix.to_string();
    while let Some(last) = end.pop() {
        let next = match last {
            '\u{D7FF}' => Some('\u{E000}'),
            c => char::from_u32(c as u32 + 1),
        };
        if let Some(next) = next {
            end.push(next);
            return Some(end);
        }
    }
    None
}
