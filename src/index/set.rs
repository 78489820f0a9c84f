//! Index set
//!
//! Every declared index of one store, and the maintenance that keeps each of
//! them in step with the primary item tree.

use std::ops::Bound;

use crate::error::{EmberError, Result};
use crate::tree::OrderedTree;

use super::{IndexKind, Pattern, SortValue};

/// Key part of an index entry. `Min`/`Max` only ever appear in range bounds,
/// where they cover every key sharing a sort value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum EntryKey {
    Min,
    Key(String),
    Max,
}

/// `(sort value, item key)`; equal values tie-break by ascending key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct IndexEntry {
    value: SortValue,
    key: EntryKey,
}

impl IndexEntry {
    fn item(value: SortValue, key: &str) -> Self {
        Self {
            value,
            key: EntryKey::Key(key.to_string()),
        }
    }

    fn item_key(&self) -> &str {
        match &self.key {
            EntryKey::Key(key) => key,
            // Bound markers are never stored
            EntryKey::Min | EntryKey::Max => "",
        }
    }
}

/// One secondary index
#[derive(Debug)]
pub struct Index {
    name: String,
    pattern: Pattern,
    kind: IndexKind,
    entries: OrderedTree<IndexEntry, ()>,
}

impl Index {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn kind(&self) -> &IndexKind {
        &self.kind
    }

    /// Number of indexed items
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether items under `key` belong in this index
    pub fn matches(&self, key: &str) -> bool {
        self.pattern.matches(key)
    }

    fn insert(&mut self, key: &str, raw: &[u8]) {
        self.entries.insert(IndexEntry::item(self.kind.extract(raw), key), ());
    }

    fn remove(&mut self, key: &str, raw: &[u8]) {
        self.entries.delete(&IndexEntry::item(self.kind.extract(raw), key));
    }

    /// Visit item keys with `low <= value <= high` in ascending order.
    /// Returns `true` if the walk ran to completion.
    pub fn ascend<F>(&self, low: Option<&SortValue>, high: Option<&SortValue>, mut visit: F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        let (low, high) = Self::bounds(low, high);
        self.entries.ascend(
            low.as_ref().map_or(Bound::Unbounded, Bound::Included),
            high.as_ref().map_or(Bound::Unbounded, Bound::Included),
            |entry, _| visit(entry.item_key()),
        )
    }

    /// Visit item keys with `low <= value <= high` in descending order.
    pub fn descend<F>(
        &self,
        high: Option<&SortValue>,
        low: Option<&SortValue>,
        mut visit: F,
    ) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        let (low, high) = Self::bounds(low, high);
        self.entries.descend(
            low.as_ref().map_or(Bound::Unbounded, Bound::Included),
            high.as_ref().map_or(Bound::Unbounded, Bound::Included),
            |entry, _| visit(entry.item_key()),
        )
    }

    fn bounds(
        low: Option<&SortValue>,
        high: Option<&SortValue>,
    ) -> (Option<IndexEntry>, Option<IndexEntry>) {
        let low = low.map(|value| IndexEntry {
            value: value.clone(),
            key: EntryKey::Min,
        });
        let high = high.map(|value| IndexEntry {
            value: value.clone(),
            key: EntryKey::Max,
        });
        (low, high)
    }

    /// Item keys in index order
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.entries.iter().map(|(entry, _)| entry.item_key())
    }
}

/// All indexes of a store, by name
#[derive(Debug, Default)]
pub struct IndexSet {
    indexes: OrderedTree<String, Index>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an index and fill it from `existing` items (in key order).
    ///
    /// The empty name is reserved for primary key order.
    pub fn create<'a, I>(
        &mut self,
        name: &str,
        pattern: &str,
        kind: IndexKind,
        existing: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        if name.is_empty() || self.indexes.contains(name) {
            return Err(EmberError::DuplicateIndex(name.to_string()));
        }
        let pattern = Pattern::new(pattern)?;
        kind.validate()?;

        let mut index = Index {
            name: name.to_string(),
            pattern,
            kind,
            entries: OrderedTree::new(),
        };
        for (key, raw) in existing {
            if index.matches(key) {
                index.insert(key, raw);
            }
        }

        tracing::debug!(index = name, entries = index.len(), "index created");
        self.indexes.insert(name.to_string(), index);
        Ok(())
    }

    /// Remove an index (`NotFound` if it was never declared)
    pub fn drop_index(&mut self, name: &str) -> Result<Index> {
        self.indexes.delete(name).ok_or(EmberError::NotFound)
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// Declared names in order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.indexes.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// An item was inserted (`old = None`) or replaced
    pub fn on_insert(&mut self, key: &str, old: Option<&[u8]>, new: &[u8]) {
        for (_, index) in self.indexes.iter_mut() {
            if !index.matches(key) {
                continue;
            }
            // The sort value may change, so the old entry goes first
            if let Some(old) = old {
                index.remove(key, old);
            }
            index.insert(key, new);
        }
    }

    /// An item was removed
    pub fn on_remove(&mut self, key: &str, old: &[u8]) {
        for (_, index) in self.indexes.iter_mut() {
            if index.matches(key) {
                index.remove(key, old);
            }
        }
    }

    /// Drop every entry but keep the declarations
    pub fn clear_entries(&mut self) {
        for (_, index) in self.indexes.iter_mut() {
            index.entries.clear();
        }
    }
}
