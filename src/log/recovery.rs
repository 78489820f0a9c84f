//! Log recovery
//!
//! Replays a log (or a saved snapshot) and reports how much of it was sound.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;
use crate::items::ItemStore;

use super::{Frame, LogEntry, LogReader, LogRecord};

/// Handles log replay after a restart
pub struct LogRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of complete records read
    pub entries_recovered: u64,

    /// Number of those that were snapshots
    pub snapshots: u64,

    /// Last valid LSN (0 if none)
    pub last_lsn: u64,

    /// Length of the sound prefix, in bytes
    pub valid_len: u64,

    /// Whether a partial trailing record was found (and must be dropped)
    pub was_truncated: bool,
}

impl LogRecovery {
    /// Read every complete record of a log file, in order.
    ///
    /// A torn tail is reported through `was_truncated`; any other damage
    /// fails with `CorruptLog`.
    pub fn recover(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let mut entries = Vec::new();
        let result = Self::scan(BufReader::new(File::open(path)?), |entry| {
            entries.push(entry);
            Ok(())
        })?;
        Ok((entries, result))
    }

    /// Check a log file without keeping its records
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(BufReader::new(File::open(path)?), |_| Ok(()))
    }

    /// Apply every record of `source` to `store` as it is read.
    ///
    /// `now` (unix millis) decides which TTL'd items are already gone.
    pub fn replay<R: Read>(source: R, store: &mut ItemStore, now: u64) -> Result<RecoveryResult> {
        Self::scan(source, |entry| {
            entry.record.apply(store, now);
            Ok(())
        })
    }

    /// Feed each complete record to `on_entry`
    pub fn scan<R, F>(source: R, mut on_entry: F) -> Result<RecoveryResult>
    where
        R: Read,
        F: FnMut(LogEntry) -> Result<()>,
    {
        let mut reader = LogReader::new(source);
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_frame()? {
                Frame::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    if matches!(entry.record, LogRecord::Snapshot { .. }) {
                        result.snapshots += 1;
                    }
                    on_entry(entry)?;
                }
                Frame::Truncated => {
                    result.was_truncated = true;
                    break;
                }
                Frame::End => break,
            }
        }

        result.valid_len = reader.position();
        Ok(result)
    }
}
