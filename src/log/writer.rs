//! Log writer
//!
//! Appends framed records to the log file and rewrites it on compaction.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::{CompactionPolicy, SyncPolicy};
use crate::error::Result;

use super::{LogEntry, LogRecord};

/// Writes records to the log file
pub struct LogWriter {
    /// Log file path
    path: PathBuf,

    /// Append-mode handle
    file: File,

    /// LSN the next record gets
    next_lsn: u64,

    /// Current file size in bytes
    size: u64,

    /// File size right after the last compaction or open
    base_size: u64,

    sync_policy: SyncPolicy,

    /// Records appended since the last fsync
    unsynced: usize,
}

impl LogWriter {
    /// Open or create a log file for appending
    pub fn open(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let file = Self::open_file(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn: 1,
            size,
            base_size: size,
            sync_policy,
            unsynced: 0,
        })
    }

    fn open_file(path: &Path) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?)
    }

    /// Continue after recovery: next record follows `last_lsn`, and the
    /// current size becomes the compaction baseline
    pub fn resume(&mut self, last_lsn: u64) {
        self.next_lsn = last_lsn + 1;
        self.base_size = self.size;
    }

    /// Append a record, returning its LSN.
    ///
    /// If the write or a required fsync fails, the file is cut back to its
    /// previous length and the error is returned.
    pub fn append(&mut self, record: LogRecord) -> Result<u64> {
        let lsn = self.next_lsn;
        let frame = LogEntry::new(lsn, record).serialize()?;
        let start = self.size;

        if let Err(e) = self.write_frame(&frame) {
            if let Err(undo) = self.truncate_to(start) {
                tracing::error!(error = %undo, "failed to discard partial log append");
            }
            return Err(e);
        }

        self.size = start + frame.len() as u64;
        self.next_lsn += 1;
        Ok(lsn)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.file.write_all(frame)?;
        self.unsynced += 1;
        match self.sync_policy {
            SyncPolicy::EveryCommit => self.sync()?,
            SyncPolicy::EveryNCommits { count } if self.unsynced >= count => self.sync()?,
            _ => {}
        }
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Periodic flush for `SyncPolicy::EverySecond`
    pub fn sync_if_due(&mut self) -> Result<()> {
        if self.sync_policy == SyncPolicy::EverySecond && self.unsynced > 0 {
            self.sync()?;
        }
        Ok(())
    }

    /// Cut the file back to `len` bytes
    pub fn truncate_to(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.size = len;
        Ok(())
    }

    /// Replace the whole log with one snapshot record.
    ///
    /// The snapshot goes to a sibling file that is fsynced and renamed over
    /// the log; on failure the old log stays in place. The sibling's handle
    /// becomes the append handle, so no reopen can fail after the rename.
    pub fn rewrite(&mut self, snapshot: LogRecord) -> Result<()> {
        let lsn = self.next_lsn;
        let frame = LogEntry::new(lsn, snapshot).serialize()?;
        let tmp = self.compact_path();

        let written = (|| -> Result<File> {
            match fs::remove_file(&tmp) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
            let mut out = OpenOptions::new()
                .create_new(true)
                .read(true)
                .append(true)
                .open(&tmp)?;
            out.write_all(&frame)?;
            out.sync_all()?;
            fs::rename(&tmp, &self.path)?;
            Ok(out)
        })();
        let file = match written {
            Ok(file) => file,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };

        self.file = file;
        self.size = frame.len() as u64;
        self.base_size = self.size;
        self.next_lsn += 1;
        self.unsynced = 0;

        // Makes the rename itself durable
        sync_parent(&self.path)
    }

    /// Whether the log has grown enough to compact under `policy`
    pub fn needs_compaction(&self, policy: &CompactionPolicy) -> bool {
        policy.is_due(self.size, self.base_size)
    }

    fn compact_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".compact");
        PathBuf::from(name)
    }

    /// Get the next LSN
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// LSN of the last record written (0 if none)
    pub fn last_lsn(&self) -> u64 {
        self.next_lsn - 1
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn base_size(&self) -> u64 {
        self.base_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.sync_policy
    }

    pub fn set_sync_policy(&mut self, policy: SyncPolicy) {
        self.sync_policy = policy;
    }
}

/// Fsync the directory holding `path`
#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
impl LogWriter {
    /// Writer over a read-only handle; every append fails
    pub(crate) fn read_only(path: &Path) -> Result<Self> {
        let mut writer = Self::open(path, SyncPolicy::EveryCommit)?;
        writer.file = File::open(path)?;
        Ok(writer)
    }
}
