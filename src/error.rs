//! Error types for EmberKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for EmberKV operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    /// Absent key, logically expired key, or unknown index.
    /// Expected control flow, never swallowed.
    #[error("not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("index already exists: {0:?}")]
    DuplicateIndex(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid comparator: {0}")]
    InvalidComparator(String),

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    // -------------------------------------------------------------------------
    // Durability Log Errors
    // -------------------------------------------------------------------------
    #[error("log I/O error: {0}")]
    LogIo(#[from] std::io::Error),

    #[error("corrupt log: {0}")]
    CorruptLog(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Expiration Errors
    // -------------------------------------------------------------------------
    /// Reported by an `on_expired` hook to keep the item for a later retry
    #[error("expiration hook failed: {0}")]
    Hook(String),
}

impl EmberError {
    /// True for [`EmberError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, EmberError::NotFound)
    }
}
