//! OrderedTree implementation
//!
//! BTreeMap-based ordered container with bounded, early-stop iteration.

use std::borrow::Borrow;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered associative container
///
/// Iteration order is `K`'s total order. Index entries carry the item key as
/// their last component, so equal sort values still have a stable order.
#[derive(Debug, Clone)]
pub struct OrderedTree<K, V> {
    map: BTreeMap<K, V>,
}

impl<K: Ord, V> OrderedTree<K, V> {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Insert, returning the previous value for `key`
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    /// Remove, returning the previous value (`None` = not found)
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove(key)
    }

    /// Exact lookup
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get(key)
    }

    /// Whether `key` is present
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Smallest entry
    pub fn first(&self) -> Option<(&K, &V)> {
        self.map.iter().next()
    }

    /// Largest entry
    pub fn last(&self) -> Option<(&K, &V)> {
        self.map.iter().next_back()
    }

    /// Lazy double-ended iterator over `[from, to]` as given by the bounds.
    /// Inverted bounds yield nothing.
    pub fn range<'a, Q>(&'a self, from: Bound<&'a Q>, to: Bound<&'a Q>) -> Range<'a, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if is_empty_range(from, to) {
            Range { inner: None }
        } else {
            Range {
                inner: Some(self.map.range::<Q, _>((from, to))),
            }
        }
    }

    /// Lazy iterator over entries at or after an owned `from`
    pub fn tail(&self, from: K) -> btree_map::Range<'_, K, V> {
        self.map.range((Bound::Included(from), Bound::Unbounded))
    }

    /// Lazy double-ended iterator from an owned `from` (inclusive) up to `to`.
    /// Inverted bounds yield nothing.
    pub fn span(&self, from: K, to: Bound<K>) -> Range<'_, K, V> {
        if is_empty_range(Bound::Included(&from), to.as_ref()) {
            return Range { inner: None };
        }
        Range {
            inner: Some(self.map.range((Bound::Included(from), to))),
        }
    }

    /// Visit entries in ascending order until `visit` returns `false`.
    ///
    /// Returns `true` if the walk ran to completion.
    pub fn ascend<Q, F>(&self, from: Bound<&Q>, to: Bound<&Q>, mut visit: F) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnMut(&K, &V) -> bool,
    {
        for (key, value) in self.range(from, to) {
            if !visit(key, value) {
                return false;
            }
        }
        true
    }

    /// Visit entries in descending order until `visit` returns `false`.
    ///
    /// `from` and `to` describe the same interval as for [`ascend`](Self::ascend);
    /// only the direction changes.
    pub fn descend<Q, F>(&self, from: Bound<&Q>, to: Bound<&Q>, mut visit: F) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnMut(&K, &V) -> bool,
    {
        for (key, value) in self.range(from, to).rev() {
            if !visit(key, value) {
                return false;
            }
        }
        true
    }

    /// Iterate everything in order
    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.map.iter()
    }

    /// Iterate everything in order, with mutable values
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, K, V> {
        self.map.iter_mut()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl<K: Ord, V> Default for OrderedTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`OrderedTree::range`]
pub struct Range<'a, K, V> {
    inner: Option<btree_map::Range<'a, K, V>>,
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next()
    }
}

impl<K, V> DoubleEndedIterator for Range<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next_back()
    }
}

/// `BTreeMap::range` panics on `start > end` and on equal excluded bounds
fn is_empty_range<Q: Ord + ?Sized>(from: Bound<&Q>, to: Bound<&Q>) -> bool {
    match (from, to) {
        (Bound::Included(a) | Bound::Excluded(a), Bound::Included(b) | Bound::Excluded(b)) => {
            a > b || (a == b && matches!((from, to), (Bound::Excluded(_), Bound::Excluded(_))))
        }
        _ => false,
    }
}
