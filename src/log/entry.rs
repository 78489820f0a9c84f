//! Log entry definitions
//!
//! Defines the records the durability log holds and their framing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{EmberError, Result};
use crate::items::{Item, ItemStore};

/// Frame header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest record body accepted on read (1 GB)
pub const MAX_RECORD_SIZE: u32 = 1 << 30;

/// A single framed record in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// What the record carries
    pub record: LogRecord,
}

/// Record payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    /// Full committed state; replaces everything before it
    Snapshot {
        /// Unix millis the snapshot was taken at
        taken_at: u64,
        items: Vec<SnapshotItem>,
    },

    /// Final effect of one committed transaction, one mutation per key
    Commit { mutations: Vec<Mutation> },
}

/// One live item inside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub key: String,
    pub value: Bytes,
    /// Remaining TTL (millis) as of `taken_at`
    pub ttl_ms: Option<u64>,
}

/// Mutations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Set a key to a value, with an absolute expiry
    Set {
        key: String,
        value: Bytes,
        expires_at: Option<u64>,
    },

    /// Delete a key
    Delete { key: String },
}

impl LogRecord {
    /// Snapshot of every item still live at `now`
    pub fn snapshot(store: &ItemStore, now: u64) -> Self {
        let items = store
            .iter()
            .filter(|(_, item)| !item.is_expired(now))
            .map(|(key, item)| SnapshotItem {
                key: key.to_string(),
                value: item.value.clone(),
                ttl_ms: item.expires_at.map(|at| at.saturating_sub(now)),
            })
            .collect();
        LogRecord::Snapshot {
            taken_at: now,
            items,
        }
    }

    /// Replay this record into `store` through normal item maintenance.
    /// Items whose deadline is already past `now` are not restored.
    pub fn apply(&self, store: &mut ItemStore, now: u64) {
        match self {
            LogRecord::Snapshot { taken_at, items } => {
                store.clear();
                for item in items {
                    let expires_at = item.ttl_ms.map(|ttl| taken_at.saturating_add(ttl));
                    let restored = Item::new(item.value.clone(), expires_at);
                    if !restored.is_expired(now) {
                        store.set(&item.key, restored);
                    }
                }
            }
            LogRecord::Commit { mutations } => {
                for mutation in mutations {
                    match mutation {
                        Mutation::Set {
                            key,
                            value,
                            expires_at,
                        } => {
                            let item = Item::new(value.clone(), *expires_at);
                            if item.is_expired(now) {
                                store.delete(key);
                            } else {
                                store.set(key, item);
                            }
                        }
                        Mutation::Delete { key } => {
                            store.delete(key);
                        }
                    }
                }
            }
        }
    }

    /// Number of items or mutations carried
    pub fn len(&self) -> usize {
        match self {
            LogRecord::Snapshot { items, .. } => items.len(),
            LogRecord::Commit { mutations } => mutations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogEntry {
    pub fn new(lsn: u64, record: LogRecord) -> Self {
        Self { lsn, record }
    }

    /// Frame as `[lsn][crc][len][bincode body]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(&self.record)
            .map_err(|e| EmberError::Serialization(e.to_string()))?;
        let len = u32::try_from(data.len())
            .ok()
            .filter(|len| *len <= MAX_RECORD_SIZE)
            .ok_or_else(|| {
                EmberError::Serialization(format!("record of {} bytes is too large", data.len()))
            })?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
        frame.extend_from_slice(&self.lsn.to_le_bytes());
        frame.extend_from_slice(&checksum(self.lsn, len, &data).to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&data);
        Ok(frame)
    }

    /// Decode exactly one complete frame
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(EmberError::CorruptLog(format!(
                "frame of {} bytes is shorter than its header",
                bytes.len()
            )));
        }
        let header = FrameHeader::parse(&bytes[..HEADER_SIZE]);
        let body = &bytes[HEADER_SIZE..];
        if body.len() != header.len as usize {
            return Err(EmberError::CorruptLog(format!(
                "frame declares {} body bytes, found {}",
                header.len,
                body.len()
            )));
        }
        header.decode(body)
    }
}

/// Parsed frame header
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl FrameHeader {
    pub fn parse(header: &[u8]) -> Self {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&header[0..8]);
        crc.copy_from_slice(&header[8..12]);
        len.copy_from_slice(&header[12..16]);
        Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        }
    }

    /// Verify the checksum and decode the body
    pub fn decode(&self, body: &[u8]) -> Result<LogEntry> {
        let actual = checksum(self.lsn, self.len, body);
        if actual != self.crc {
            return Err(EmberError::CorruptLog(format!(
                "checksum mismatch at lsn {}: expected {:08x}, got {:08x}",
                self.lsn, self.crc, actual
            )));
        }
        let record = bincode::deserialize(body).map_err(|e| {
            EmberError::CorruptLog(format!("undecodable record at lsn {}: {}", self.lsn, e))
        })?;
        Ok(LogEntry::new(self.lsn, record))
    }
}

/// CRC32 over LSN, length and body
fn checksum(lsn: u64, len: u32, body: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(&len.to_le_bytes());
    hasher.update(body);
    hasher.finalize()
}
