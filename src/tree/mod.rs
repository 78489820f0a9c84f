//! Ordered Container Module
//!
//! The balanced ordered map every other structure is built on: the primary
//! item tree, each secondary index and the expiration tracker.
//!
//! ## Data Structure Choice
//! `BTreeMap` behind a thin wrapper:
//! - O(log n) insert/delete/lookup
//! - Ordered range iteration in both directions
//! - Early-stop visitors (`false` ends the walk)

mod ordered;

pub use ordered::{OrderedTree, Range};
