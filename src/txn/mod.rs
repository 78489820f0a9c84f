//! Transaction Module
//!
//! Read-only and writable transactions over one store.
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
//!
//! - **Read-only** transactions hold a shared lock on the item store; any
//!   number may run together.
//! - **Writable** transactions hold the exclusive lock; no reader or other
//!   writer runs while one is active. The expiration sweep takes the same
//!   lock.
//!
//! A writable transaction applies its writes in place under the exclusive
//! lock, remembering each touched key's prior item. Commit logs the final
//! mutation per key; rollback (or dropping the transaction) puts the prior
//! items back.

mod tx;

use std::time::Duration;

pub use tx::Tx;

/// Options for [`Tx::set`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Lifetime of the item; `None` clears any existing TTL
    pub ttl: Option<Duration>,
}

impl SetOptions {
    /// Expire the item `ttl` from now
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}
