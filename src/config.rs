//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults. A store's config can be
//! read and replaced at runtime through `Store::read_config` and
//! `Store::set_config`; only the storage mode is fixed once opened.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{EmberError, Result};
use crate::txn::Tx;

/// Path marker that selects a purely in-memory store
pub const MEMORY_MARKER: &str = ":memory:";

/// Called by the sweeper for every expired item, inside the writable
/// transaction that removed it. Returning an error rolls that transaction
/// back and keeps the item for a later retry.
pub type ExpireHook = Arc<dyn Fn(&str, &Bytes, &mut Tx<'_>) -> Result<()> + Send + Sync>;

/// Main configuration for an EmberKV instance
#[derive(Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Where committed state lives
    pub storage: StorageMode,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Sync policy: how often to fsync the log
    pub sync_policy: SyncPolicy,

    /// When the log is rewritten as a single snapshot
    pub compaction: CompactionPolicy,

    // -------------------------------------------------------------------------
    // Expiration Configuration
    // -------------------------------------------------------------------------
    /// Pause between background sweep passes
    pub sweep_interval: Duration,

    /// How long a sweep waits for the writer slot before yielding the pass
    pub sweep_yield: Duration,

    /// What to do when the expiration hook keeps failing
    pub expiry_retry: RetryPolicy,

    /// Optional expiration hook
    pub on_expired: Option<ExpireHook>,
}

/// Where a store keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// No log; state is lost on close
    InMemory,

    /// Append-only log file at the given path
    File(PathBuf),
}

impl StorageMode {
    /// `":memory:"` selects in-memory operation, anything else is a log path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str() == MEMORY_MARKER {
            StorageMode::InMemory
        } else {
            StorageMode::File(path.to_path_buf())
        }
    }

    /// Log path, if persistent
    pub fn path(&self) -> Option<&Path> {
        match self {
            StorageMode::InMemory => None,
            StorageMode::File(path) => Some(path),
        }
    }
}

/// Log sync policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fsync on every commit (safest, slowest); "committed" implies "on disk"
    EveryCommit,

    /// fsync after N commits (balanced durability/performance)
    EveryNCommits { count: usize },

    /// fsync from the background thread about once per second
    EverySecond,

    /// Leave flushing to the OS
    Never,
}

/// Automatic log compaction thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    /// Never compact automatically (`Store::compact` still works)
    pub disabled: bool,

    /// Log size (bytes) below which no compaction happens
    pub min_size: u64,

    /// Growth over the post-compaction size, in percent, that triggers a rewrite
    pub growth_percentage: u64,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            disabled: false,
            min_size: 32 * 1024 * 1024, // 32 MB
            growth_percentage: 100,
        }
    }
}

impl CompactionPolicy {
    /// Whether a log of `current` bytes, `base` bytes after the last rewrite,
    /// is due for compaction
    pub fn is_due(&self, current: u64, base: u64) -> bool {
        if self.disabled || current < self.min_size {
            return false;
        }
        current > base.saturating_mul(100 + self.growth_percentage) / 100
    }
}

/// Retry policy for failing expiration hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Keep the item and retry on every pass until the hook succeeds
    Forever,

    /// After `attempts` failed passes, remove the item without the hook
    Limit { attempts: u32 },
}

impl RetryPolicy {
    /// Whether `failures` failed attempts exhaust this policy
    pub fn exhausted(&self, failures: u32) -> bool {
        match self {
            RetryPolicy::Forever => false,
            RetryPolicy::Limit { attempts } => failures >= *attempts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageMode::InMemory,
            sync_policy: SyncPolicy::EverySecond,
            compaction: CompactionPolicy::default(),
            sweep_interval: Duration::from_secs(1),
            sweep_yield: Duration::from_millis(10),
            expiry_retry: RetryPolicy::Limit { attempts: 5 },
            on_expired: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("storage", &self.storage)
            .field("sync_policy", &self.sync_policy)
            .field("compaction", &self.compaction)
            .field("sweep_interval", &self.sweep_interval)
            .field("sweep_yield", &self.sweep_yield)
            .field("expiry_retry", &self.expiry_retry)
            .field("on_expired", &self.on_expired.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(EmberError::Config("sweep_interval must be non-zero".to_string()));
        }
        if let SyncPolicy::EveryNCommits { count: 0 } = self.sync_policy {
            return Err(EmberError::Config(
                "EveryNCommits requires a count of at least 1".to_string(),
            ));
        }
        if let RetryPolicy::Limit { attempts: 0 } = self.expiry_retry {
            return Err(EmberError::Config(
                "retry limit must allow at least one attempt".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Persist to a log file at `path` (`":memory:"` keeps the store in memory)
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.storage = StorageMode::from_path(path);
        self
    }

    /// Keep everything in memory
    pub fn in_memory(mut self) -> Self {
        self.config.storage = StorageMode::InMemory;
        self
    }

    /// Set the log sync policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Set the compaction thresholds
    pub fn compaction(mut self, policy: CompactionPolicy) -> Self {
        self.config.compaction = policy;
        self
    }

    /// Set the pause between sweep passes
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Set how long a sweep waits for the writer slot
    pub fn sweep_yield(mut self, wait: Duration) -> Self {
        self.config.sweep_yield = wait;
        self
    }

    /// Set the hook retry policy
    pub fn expiry_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.expiry_retry = policy;
        self
    }

    /// Install an expiration hook
    pub fn on_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &Bytes, &mut Tx<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.config.on_expired = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
