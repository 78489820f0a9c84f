//! Durability Log Module
//!
//! Append-only record of committed transactions, compacted into snapshots.
//!
//! ## Responsibilities
//! - Append one record per committed transaction before the commit returns
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Replay on open, discarding a torn trailing record
//! - Rewrite as a single snapshot when the log has grown enough
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1 (Snapshot, optional)           │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 (Commit)                       │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! `save` output is the same format holding exactly one snapshot record.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{LogEntry, LogRecord, Mutation, SnapshotItem, HEADER_SIZE, MAX_RECORD_SIZE};
pub use reader::{Frame, LogReader};
pub use recovery::{LogRecovery, RecoveryResult};
pub use writer::LogWriter;
