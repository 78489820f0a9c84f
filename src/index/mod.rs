//! Index Engine Module
//!
//! Named secondary indexes over the items whose keys match a glob pattern.
//!
//! ## Responsibilities
//! - Extract a comparable [`SortValue`] from each matching item's value
//! - Keep one `(value, key)` entry per matching item, eagerly maintained
//! - Bounded iteration by extracted value in both directions
//!
//! ## Ordering
//! ```text
//!  ("alan",  "user:4")
//!  ("carol", "user:3")
//!  ("janet", "user:2")   equal values fall back to key order
//!  ("janet", "user:7")
//! ```

mod kind;
mod pattern;
mod set;
mod value;

pub use kind::{Extractor, IndexKind, Pivot};
pub use pattern::Pattern;
pub use set::{Index, IndexSet};
pub use value::SortValue;
