//! # EmberKV
//!
//! An embeddable, ordered key-value store with:
//! - Read-only and writable transactions (single writer, many readers)
//! - Secondary indexes over key patterns, including JSON fields
//! - Per-item TTLs with lazy checks and a background sweep
//! - An append-only log with snapshot compaction, save and load
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                                │
//! │          view / update / begin, save / load / compact        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Transactions                             │
//! │        (Shared lock for readers, exclusive for writer)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     Log     │          │  ItemStore  │◄──── Sweeper
//!   │  (Append)   │          │  (RwLock)   │     (thread)
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                     ┌─────────────┼─────────────┐
//!                     ▼             ▼             ▼
//!              ┌───────────┐ ┌───────────┐ ┌───────────┐
//!              │   Items   │ │  Indexes  │ │   TTLs    │
//!              │  (BTree)  │ │  (BTree)  │ │  (BTree)  │
//!              └───────────┘ └───────────┘ └───────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use emberkv::{IndexKind, Store};
//!
//! # fn main() -> emberkv::Result<()> {
//! let store = Store::open_path("data.log")?;
//! store.create_index("age", "user:*", IndexKind::json("age"))?;
//!
//! store.update(|tx| {
//!     tx.set("user:1", r#"{"name":"ann","age":47}"#, None)?;
//!     Ok(())
//! })?;
//!
//! store.view(|tx| {
//!     tx.ascend_range("age", r#"{"age":30}"#, r#"{"age":50}"#, |key, _| {
//!         println!("{key}");
//!         true
//!     })
//! })?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod tree;
pub mod index;
pub mod items;
pub mod expiry;
pub mod log;
pub mod txn;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::{CompactionPolicy, Config, RetryPolicy, StorageMode, SyncPolicy};
pub use expiry::SweepStats;
pub use index::{Extractor, IndexKind, Pivot, SortValue};
pub use store::Store;
pub use txn::{SetOptions, Tx};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
