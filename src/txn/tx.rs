//! Transaction implementation

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::error::{EmberError, Result};
use crate::expiry::now_millis;
use crate::index::{Pattern, Pivot, SortValue};
use crate::items::{Item, ItemStore};
use crate::log::Mutation;
use crate::store::Shared;

use super::SetOptions;

enum Guard<'db> {
    Read(RwLockReadGuard<'db, ItemStore>),
    Write(RwLockWriteGuard<'db, ItemStore>),
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Ascending,
    Descending,
}

/// Bookkeeping of a writable transaction
#[derive(Default)]
struct WriteSet {
    /// Final state per key (`None` = deleted); becomes the commit record
    pending: BTreeMap<String, Option<Item>>,

    /// Item each touched key had before the transaction
    undo: HashMap<String, Option<Item>>,
}

impl WriteSet {
    fn touch(&mut self, key: &str, current: Option<&Item>) {
        if !self.undo.contains_key(key) {
            self.undo.insert(key.to_string(), current.cloned());
        }
    }
}

/// A transaction against a [`Store`](crate::Store)
///
/// Holds the store's shared lock (read-only) or exclusive lock (writable)
/// until it ends. A writable transaction that is dropped without
/// [`commit`](Tx::commit) rolls back.
pub struct Tx<'db> {
    shared: &'db Shared,
    guard: Guard<'db>,
    writes: Option<WriteSet>,
}

impl<'db> Tx<'db> {
    pub(crate) fn read(shared: &'db Shared) -> Self {
        Self {
            shared,
            guard: Guard::Read(shared.state.read()),
            writes: None,
        }
    }

    pub(crate) fn write(shared: &'db Shared, guard: RwLockWriteGuard<'db, ItemStore>) -> Self {
        Self {
            shared,
            guard: Guard::Write(guard),
            writes: Some(WriteSet::default()),
        }
    }

    pub fn is_writable(&self) -> bool {
        self.writes.is_some()
    }

    fn store(&self) -> &ItemStore {
        match &self.guard {
            Guard::Read(guard) => &**guard,
            Guard::Write(guard) => &**guard,
        }
    }

    fn parts(&mut self) -> Result<(&mut ItemStore, &mut WriteSet)> {
        match (&mut self.guard, self.writes.as_mut()) {
            (Guard::Write(guard), Some(writes)) => Ok((&mut **guard, writes)),
            _ => Err(EmberError::TransactionConflict(
                "write in a read-only transaction".to_string(),
            )),
        }
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Value under `key`; `NotFound` if absent or expired
    pub fn get(&self, key: &str) -> Result<Bytes> {
        Ok(self.store().get(key, now_millis())?.value.clone())
    }

    /// Remaining lifetime of `key`; `None` if it never expires
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = now_millis();
        Ok(self.store().get(key, now)?.ttl(now))
    }

    /// Insert or replace `key`.
    ///
    /// Returns the previous value and whether one was replaced. An expired
    /// previous item counts as absent. Without a TTL in `options` the item
    /// never expires.
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<Bytes>,
        options: Option<SetOptions>,
    ) -> Result<(Option<Bytes>, bool)> {
        let now = now_millis();
        let expires_at = options
            .and_then(|o| o.ttl)
            .map(|ttl| now.saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)));
        let item = Item::new(value, expires_at);

        let (store, writes) = self.parts()?;
        writes.touch(key, store.peek(key));
        writes.pending.insert(key.to_string(), Some(item.clone()));

        match store.set(key, item) {
            (Some(previous), _) if !previous.is_expired(now) => Ok((Some(previous.value), true)),
            _ => Ok((None, false)),
        }
    }

    /// Remove `key`, returning its value; `NotFound` if absent or expired
    pub fn delete(&mut self, key: &str) -> Result<Bytes> {
        let now = now_millis();
        let (store, writes) = self.parts()?;
        let current = store.get(key, now)?;
        writes.touch(key, Some(current));
        writes.pending.insert(key.to_string(), None);
        store.delete(key).map(|item| item.value).ok_or(EmberError::NotFound)
    }

    /// Remove every item
    pub fn delete_all(&mut self) -> Result<()> {
        let (store, writes) = self.parts()?;
        let keys: Vec<String> = store.iter().map(|(key, _)| key.to_string()).collect();
        for key in keys {
            if let Some(previous) = store.delete(&key) {
                writes.touch(&key, Some(&previous));
                writes.pending.insert(key, None);
            }
        }
        Ok(())
    }

    /// Remove `key` if its deadline has passed at `now`, bypassing the lazy
    /// check that hides it from `delete`
    pub(crate) fn remove_expired(&mut self, key: &str, now: u64) -> Result<Option<Item>> {
        let (store, writes) = self.parts()?;
        match store.peek(key) {
            Some(item) if item.is_expired(now) => {
                writes.touch(key, Some(item));
            }
            _ => return Ok(None),
        }
        writes.pending.insert(key.to_string(), None);
        Ok(store.delete(key))
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Declared index names
    pub fn indexes(&self) -> Vec<String> {
        self.store().indexes().names().map(str::to_string).collect()
    }

    // =========================================================================
    // Key Iteration
    // =========================================================================

    /// Visit live items whose key matches `pattern`, in key order
    pub fn ascend_keys<F>(&self, pattern: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        let pattern = Pattern::new(pattern)?;
        let now = now_millis();
        for (key, item) in self.store().ascend_keys(&pattern) {
            if !item.is_expired(now) && !visit(key, &item.value) {
                break;
            }
        }
        Ok(())
    }

    /// Visit live items whose key matches `pattern`, in reverse key order
    pub fn descend_keys<F>(&self, pattern: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        let pattern = Pattern::new(pattern)?;
        let now = now_millis();
        for (key, item) in self.store().descend_keys(&pattern) {
            if !item.is_expired(now) && !visit(key, &item.value) {
                break;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Index Iteration
    //
    // `index` names a declared index; the empty name walks primary key
    // order. Bounds are inclusive. Visitors return `false` to stop.
    // =========================================================================

    /// Every item, ascending by `index`
    pub fn ascend<F>(&self, index: &str, visit: F) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.scan(index, Direction::Ascending, None, None, visit)
    }

    /// Items with `low <= value <= high`, ascending
    pub fn ascend_bounded<F>(
        &self,
        index: &str,
        low: Option<Pivot>,
        high: Option<Pivot>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.scan(index, Direction::Ascending, low.as_ref(), high.as_ref(), visit)
    }

    pub fn ascend_range<F>(
        &self,
        index: &str,
        low: impl Into<Pivot>,
        high: impl Into<Pivot>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.ascend_bounded(index, Some(low.into()), Some(high.into()), visit)
    }

    pub fn ascend_greater_or_equal<F>(
        &self,
        index: &str,
        low: impl Into<Pivot>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.ascend_bounded(index, Some(low.into()), None, visit)
    }

    pub fn ascend_less_or_equal<F>(
        &self,
        index: &str,
        high: impl Into<Pivot>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.ascend_bounded(index, None, Some(high.into()), visit)
    }

    /// Items whose value equals `pivot`'s, in key order
    pub fn ascend_equal<F>(&self, index: &str, pivot: impl Into<Pivot>, visit: F) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        let pivot = pivot.into();
        self.ascend_bounded(index, Some(pivot.clone()), Some(pivot), visit)
    }

    /// Every item, descending by `index`
    pub fn descend<F>(&self, index: &str, visit: F) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.scan(index, Direction::Descending, None, None, visit)
    }

    /// Items with `low <= value <= high`, descending from `high`.
    /// Exactly the reverse of [`ascend_bounded`](Self::ascend_bounded).
    pub fn descend_bounded<F>(
        &self,
        index: &str,
        high: Option<Pivot>,
        low: Option<Pivot>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.scan(index, Direction::Descending, low.as_ref(), high.as_ref(), visit)
    }

    pub fn descend_range<F>(
        &self,
        index: &str,
        high: impl Into<Pivot>,
        low: impl Into<Pivot>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.descend_bounded(index, Some(high.into()), Some(low.into()), visit)
    }

    pub fn descend_less_or_equal<F>(
        &self,
        index: &str,
        high: impl Into<Pivot>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.descend_bounded(index, Some(high.into()), None, visit)
    }

    pub fn descend_greater_or_equal<F>(
        &self,
        index: &str,
        low: impl Into<Pivot>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        self.descend_bounded(index, None, Some(low.into()), visit)
    }

    /// Items whose value equals `pivot`'s, in reverse key order
    pub fn descend_equal<F>(&self, index: &str, pivot: impl Into<Pivot>, visit: F) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        let pivot = pivot.into();
        self.descend_bounded(index, Some(pivot.clone()), Some(pivot), visit)
    }

    fn scan<F>(
        &self,
        index: &str,
        direction: Direction,
        low: Option<&Pivot>,
        high: Option<&Pivot>,
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &Bytes) -> bool,
    {
        let store = self.store();
        let now = now_millis();

        if index.is_empty() {
            let low = low.map(pivot_key).transpose()?;
            let high = high.map(pivot_key).transpose()?;
            let from = low.as_deref().map_or(Bound::Unbounded, Bound::Included);
            let to = high.as_deref().map_or(Bound::Unbounded, Bound::Included);
            let step = |key: &String, item: &Item| item.is_expired(now) || visit(key, &item.value);
            match direction {
                Direction::Ascending => store.tree().ascend(from, to, step),
                Direction::Descending => store.tree().descend(from, to, step),
            };
            return Ok(());
        }

        let found = store.indexes().get(index).ok_or(EmberError::NotFound)?;
        let low = low.map(|pivot| pivot.resolve(found.kind()));
        let high = high.map(|pivot| pivot.resolve(found.kind()));
        let step = |key: &str| match store.peek(key) {
            Some(item) if !item.is_expired(now) => visit(key, &item.value),
            _ => true,
        };
        match direction {
            Direction::Ascending => found.ascend(low.as_ref(), high.as_ref(), step),
            Direction::Descending => found.descend(high.as_ref(), low.as_ref(), step),
        };
        Ok(())
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Make the writes durable and visible.
    ///
    /// One commit record carrying the final state of every touched key is
    /// appended to the log. If that fails, the writes are undone and the
    /// error is returned. Ending a read-only transaction always succeeds.
    pub fn commit(mut self) -> Result<()> {
        let Some(writes) = self.writes.take() else {
            return Ok(());
        };
        if writes.pending.is_empty() {
            return Ok(());
        }

        // Hook failure counts belong to the item they were recorded for
        let touched: Vec<String> = if self.shared.retries.lock().is_empty() {
            Vec::new()
        } else {
            writes.pending.keys().cloned().collect()
        };

        let mutations = writes
            .pending
            .into_iter()
            .map(|(key, item)| match item {
                Some(item) => Mutation::Set {
                    key,
                    value: item.value,
                    expires_at: item.expires_at,
                },
                None => Mutation::Delete { key },
            })
            .collect();

        if let Err(e) = self.shared.append_commit(mutations) {
            tracing::warn!(error = %e, "commit failed, rolling back");
            self.undo(writes.undo);
            return Err(e);
        }

        if !touched.is_empty() {
            let mut retries = self.shared.retries.lock();
            for key in &touched {
                retries.remove(key);
            }
        }
        Ok(())
    }

    /// Discard the writes. Nothing reaches the log.
    pub fn rollback(mut self) {
        if let Some(writes) = self.writes.take() {
            self.undo(writes.undo);
        }
    }

    fn undo(&mut self, undo: HashMap<String, Option<Item>>) {
        if let Guard::Write(store) = &mut self.guard {
            for (key, previous) in undo {
                store.restore(&key, previous);
            }
        }
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if let Some(writes) = self.writes.take() {
            if !writes.undo.is_empty() {
                tracing::debug!(
                    keys = writes.undo.len(),
                    "uncommitted transaction dropped, rolling back"
                );
            }
            self.undo(writes.undo);
        }
    }
}

/// Primary-order bounds are keys
fn pivot_key(pivot: &Pivot) -> Result<String> {
    match pivot {
        Pivot::Raw(raw) => Ok(String::from_utf8_lossy(raw).into_owned()),
        Pivot::Value(SortValue::Str(key)) => Ok(key.clone()),
        Pivot::Value(other) => Err(EmberError::InvalidComparator(format!(
            "primary key order takes string bounds, got {:?}",
            other
        ))),
    }
}
