//! Store Module
//!
//! The host-facing handle that ties the item store, the transaction
//! protocol, the durability log and the expiration sweeper together.
//!
//! ## Responsibilities
//! - Open a store in memory or over a log file, replaying the log
//! - Hand out read-only and writable transactions
//! - Declare and drop indexes
//! - Save/load snapshots and compact the log
//! - Run the background sweeper until close

use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, StorageMode};
use crate::error::{EmberError, Result};
use crate::expiry::{self, now_millis, SweepStats, Sweeper};
use crate::index::IndexKind;
use crate::items::ItemStore;
use crate::log::{LogEntry, LogRecord, LogRecovery, LogWriter, Mutation, RecoveryResult};
use crate::txn::Tx;

/// State shared between the store handle, its transactions and the sweeper
///
/// ## Lock order
/// `state` before `log`, always. Compaction holds an upgradable read on
/// `state` (readers continue, writers wait) while it rewrites the log.
pub(crate) struct Shared {
    /// Items, indexes and TTLs behind the readers-writer lock
    pub(crate) state: RwLock<ItemStore>,

    /// Durability log, `None` for in-memory stores
    pub(crate) log: Mutex<Option<LogWriter>>,

    /// Runtime-replaceable configuration
    pub(crate) config: RwLock<Config>,

    /// Failed hook attempts per expired key
    pub(crate) retries: Mutex<HashMap<String, u32>>,
}

impl Shared {
    /// Append the record of a committed transaction (no-op in memory)
    pub(crate) fn append_commit(&self, mutations: Vec<Mutation>) -> Result<()> {
        let mut log = self.log.lock();
        match log.as_mut() {
            Some(writer) => writer.append(LogRecord::Commit { mutations }).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Rewrite the log as one snapshot of the committed state
    pub(crate) fn compact(&self) -> Result<()> {
        let state = self.state.upgradable_read();
        let mut log = self.log.lock();
        let Some(writer) = log.as_mut() else {
            return Ok(());
        };

        let before = writer.size();
        writer.rewrite(LogRecord::snapshot(&state, now_millis()))?;
        tracing::debug!(before, after = writer.size(), items = state.len(), "log compacted");
        Ok(())
    }

    /// Compact if the log outgrew the configured thresholds
    pub(crate) fn maybe_compact(&self) -> Result<()> {
        let policy = self.config.read().compaction;
        let due = self
            .log
            .lock()
            .as_ref()
            .is_some_and(|writer| writer.needs_compaction(&policy));
        if due {
            self.compact()?;
        }
        Ok(())
    }

    /// One background pass: sweep, periodic fsync, compaction check
    pub(crate) fn tick(&self, stop: &AtomicBool) {
        match expiry::sweep(self, stop) {
            Ok(stats) if stats.expired > 0 || stats.hook_failures > 0 => {
                tracing::debug!(?stats, "expiration sweep");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "expiration sweep failed"),
        }

        if let Some(writer) = self.log.lock().as_mut() {
            if let Err(e) = writer.sync_if_due() {
                tracing::error!(error = %e, "log sync failed");
            }
        }

        if let Err(e) = self.maybe_compact() {
            tracing::error!(error = %e, "log compaction failed");
        }
    }
}

/// An open store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// `Store` is `Sync`; share it by reference or `Arc` across threads.
/// - `view` / `begin(false)`: shared lock, many at once
/// - `update` / `begin(true)`: exclusive lock, excludes every other
///   transaction, including the sweeper's
pub struct Store {
    shared: Arc<Shared>,

    /// Background sweeper; stopped on close or drop
    sweeper: Option<Sweeper>,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// For file storage:
    /// 1. Create the parent directory if needed
    /// 2. Replay the log (snapshot, then commits)
    /// 3. Drop a torn trailing record
    /// 4. Start the sweeper
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let mut items = ItemStore::new();
        let log = match &config.storage {
            StorageMode::InMemory => None,
            StorageMode::File(path) => Some(Self::open_log(path, &config, &mut items)?),
        };

        let shared = Arc::new(Shared {
            state: RwLock::new(items),
            log: Mutex::new(log),
            config: RwLock::new(config),
            retries: Mutex::new(HashMap::new()),
        });
        let sweeper = Sweeper::start(Arc::clone(&shared))?;

        Ok(Self {
            shared,
            sweeper: Some(sweeper),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config; `":memory:"` opens an in-memory store
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::builder().path(path).build())
    }

    /// Open an in-memory store with default config
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Config::default())
    }

    fn open_log(path: &Path, config: &Config, items: &mut ItemStore) -> Result<LogWriter> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let recovery = if path.exists() {
            let file = BufReader::new(File::open(path)?);
            LogRecovery::replay(file, items, now_millis())?
        } else {
            RecoveryResult::default()
        };

        if recovery.entries_recovered > 0 {
            tracing::info!(
                path = %path.display(),
                records = recovery.entries_recovered,
                snapshots = recovery.snapshots,
                last_lsn = recovery.last_lsn,
                items = items.len(),
                "log replayed"
            );
        }

        let mut writer = LogWriter::open(path, config.sync_policy)?;
        if recovery.was_truncated {
            tracing::warn!(
                path = %path.display(),
                valid_len = recovery.valid_len,
                discarded = writer.size().saturating_sub(recovery.valid_len),
                "discarding partial record at end of log"
            );
            writer.truncate_to(recovery.valid_len)?;
        }
        writer.resume(recovery.last_lsn);
        Ok(writer)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Begin a transaction. Blocks until the lock is available.
    pub fn begin(&self, writable: bool) -> Tx<'_> {
        if writable {
            Tx::write(&self.shared, self.shared.state.write())
        } else {
            Tx::read(&self.shared)
        }
    }

    /// Run `f` in a read-only transaction
    pub fn view<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Tx<'_>) -> Result<R>,
    {
        let tx = self.begin(false);
        let result = f(&tx);
        tx.rollback();
        result
    }

    /// Run `f` in a writable transaction; commit on `Ok`, roll back on `Err`
    pub fn update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Tx<'_>) -> Result<R>,
    {
        let mut tx = self.begin(true);
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                tx.rollback();
                Err(e)
            }
        }
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    /// Declare an index over keys matching `pattern` and build it from the
    /// current items. Indexes are not persisted; declare them after every open.
    pub fn create_index(&self, name: &str, pattern: &str, kind: IndexKind) -> Result<()> {
        self.shared.state.write().create_index(name, pattern, kind)
    }

    /// Remove an index
    pub fn drop_index(&self, name: &str) -> Result<()> {
        self.shared.state.write().drop_index(name)
    }

    /// Declared index names, in order
    pub fn indexes(&self) -> Vec<String> {
        self.shared
            .state
            .read()
            .indexes()
            .names()
            .map(str::to_string)
            .collect()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Write one snapshot record of the committed state to `writer`
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        let state = self.shared.state.read();
        let lsn = self.shared.log.lock().as_ref().map_or(0, LogWriter::last_lsn);
        let frame = LogEntry::new(lsn, LogRecord::snapshot(&state, now_millis())).serialize()?;
        writer.write_all(&frame)?;
        writer.flush()?;
        Ok(())
    }

    /// Rebuild from a saved snapshot (or a whole log stream).
    ///
    /// Only valid on an empty store. Declared indexes are filled as items
    /// arrive. A persistent store writes the loaded state to its log.
    pub fn load<R: Read>(&self, reader: R) -> Result<RecoveryResult> {
        let mut state = self.shared.state.write();
        if !state.is_empty() {
            return Err(EmberError::TransactionConflict(
                "load requires an empty store".to_string(),
            ));
        }

        let result = match LogRecovery::replay(BufReader::new(reader), &mut state, now_millis()) {
            Ok(result) => result,
            Err(e) => {
                state.clear();
                return Err(e);
            }
        };
        if result.was_truncated {
            tracing::warn!(
                records = result.entries_recovered,
                "snapshot ended with a partial record"
            );
        }

        let mut log = self.shared.log.lock();
        if let Some(writer) = log.as_mut() {
            if let Err(e) = writer.rewrite(LogRecord::snapshot(&state, now_millis())) {
                state.clear();
                return Err(e);
            }
        }

        tracing::info!(items = state.len(), "snapshot loaded");
        Ok(result)
    }

    /// Rewrite the log as a single snapshot now
    pub fn compact(&self) -> Result<()> {
        self.shared.compact()
    }

    /// Run one expiration pass synchronously
    pub fn sweep_expired(&self) -> Result<SweepStats> {
        expiry::sweep(&self.shared, &AtomicBool::new(false))
    }

    /// Size of the log file in bytes (0 in memory)
    pub fn log_size(&self) -> u64 {
        self.shared.log.lock().as_ref().map_or(0, LogWriter::size)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Current configuration
    pub fn read_config(&self) -> Config {
        self.shared.config.read().clone()
    }

    /// Replace the configuration. The storage mode cannot change.
    pub fn set_config(&self, config: Config) -> Result<()> {
        config.validate()?;
        let mut current = self.shared.config.write();
        if config.storage != current.storage {
            return Err(EmberError::Config(
                "storage mode cannot change on an open store".to_string(),
            ));
        }
        if let Some(writer) = self.shared.log.lock().as_mut() {
            writer.set_sync_policy(config.sync_policy);
        }
        *current = config;
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the store gracefully
    ///
    /// Stops the sweeper and syncs the log. In-memory data is discarded.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        // Joins the sweeper thread
        drop(self.sweeper.take());

        if let Some(writer) = self.shared.log.lock().as_mut() {
            writer.sync()?;
        }
        Ok(())
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "failed to close store cleanly");
        }
    }
}
