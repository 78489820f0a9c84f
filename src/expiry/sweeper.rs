//! Background expiration sweep

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::Result;
use crate::store::Shared;
use crate::txn::Tx;

use super::now_millis;

/// What one sweep pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Items removed
    pub expired: usize,

    /// Hook calls that failed (their items were kept)
    pub hook_failures: usize,

    /// Items removed without the hook after retries ran out
    pub abandoned: usize,

    /// The pass gave up the writer slot to other transactions
    pub yielded: bool,

    /// The pass stopped early for shutdown
    pub interrupted: bool,
}

/// Remove every item whose deadline has passed.
///
/// Each item goes through its own writable transaction so that a failing
/// hook only rolls back that item. The pass stops as soon as the writer slot
/// stays busy for longer than `sweep_yield`; remaining items wait for the
/// next pass (reads already treat them as absent).
pub(crate) fn sweep(shared: &Shared, stop: &AtomicBool) -> Result<SweepStats> {
    let now = now_millis();
    let due: Vec<String> = shared
        .state
        .read()
        .expiry()
        .expired(now)
        .map(str::to_string)
        .collect();

    let mut stats = SweepStats::default();
    if due.is_empty() {
        return Ok(stats);
    }

    let (hook, retry, wait) = {
        let config = shared.config.read();
        (config.on_expired.clone(), config.expiry_retry, config.sweep_yield)
    };

    for key in due {
        if stop.load(Ordering::Relaxed) {
            stats.interrupted = true;
            break;
        }
        let Some(guard) = shared.state.try_write_for(wait) else {
            stats.yielded = true;
            break;
        };

        let mut tx = Tx::write(shared, guard);
        let Some(item) = tx.remove_expired(&key, now)? else {
            // Rewritten or deleted since the scan
            shared.retries.lock().remove(&key);
            continue;
        };

        let failures = shared.retries.lock().get(&key).copied().unwrap_or(0);
        match hook.as_ref() {
            Some(hook) if !retry.exhausted(failures) => {
                if let Err(e) = hook(&key, &item.value, &mut tx) {
                    tx.rollback();
                    stats.hook_failures += 1;
                    let attempts = {
                        let mut retries = shared.retries.lock();
                        let attempts = retries.entry(key.clone()).or_insert(0);
                        *attempts += 1;
                        *attempts
                    };
                    tracing::warn!(
                        key = %key,
                        attempts,
                        error = %e,
                        "expiration hook failed, keeping item"
                    );
                    continue;
                }
            }
            Some(_) => {
                tracing::warn!(
                    key = %key,
                    failures,
                    "expiration hook retries exhausted, removing item"
                );
                stats.abandoned += 1;
            }
            None => {}
        }

        tx.commit()?;
        shared.retries.lock().remove(&key);
        stats.expired += 1;
    }

    Ok(stats)
}

/// Handle to the background thread that runs [`sweep`] periodically.
/// Dropping it stops and joins the thread.
pub(crate) struct Sweeper {
    stop: Arc<AtomicBool>,
    wake: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub(crate) fn start(shared: Arc<Shared>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let (wake, signal) = channel::bounded(1);

        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("emberkv-sweeper".to_string())
            .spawn(move || run(&shared, &thread_stop, &signal))?;

        Ok(Self {
            stop,
            wake,
            handle: Some(handle),
        })
    }
}

fn run(shared: &Shared, stop: &AtomicBool, signal: &Receiver<()>) {
    tracing::debug!("sweeper started");
    loop {
        let interval = shared.config.read().sweep_interval;
        match signal.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }
        shared.tick(stop);
    }
    tracing::debug!("sweeper stopped");
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.wake.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("sweeper thread panicked");
            }
        }
    }
}
