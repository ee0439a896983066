//! Pagination chain state
//!
//! Tracks whether a chain is in flight, the resumable cursor, and the API
//! error count of the current chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Cursor and retry bookkeeping shared across the steps of a chain
#[derive(Debug, Default)]
struct ChainProgress {
    /// Opaque cursor forwarded verbatim; empty means start from the top
    cursor: String,

    /// API-level errors seen by the current chain
    retry_count: u32,
}

/// Run state owned by one engine instance
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
    progress: Mutex<ChainProgress>,
}

/// Proof that the caller owns the single-flight slot
///
/// Dropping the guard clears `running`, so every exit path of a chain
/// releases the slot exactly once.
#[derive(Debug)]
pub struct RunGuard<'a> {
    state: &'a RunState,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the single-flight slot
    ///
    /// Returns `None` if a chain is already running; in that case nothing
    /// else about the state is touched.
    pub fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { state: self })
    }

    /// Returns true while a chain holds the single-flight slot
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current cursor
    pub fn cursor(&self) -> String {
        self.progress().cursor.clone()
    }

    /// Replaces the cursor
    pub fn set_cursor(&self, cursor: impl Into<String>) {
        self.progress().cursor = cursor.into();
    }

    /// Rewinds to the top of the list
    pub fn reset_cursor(&self) {
        self.progress().cursor.clear();
    }

    pub fn retry_count(&self) -> u32 {
        self.progress().retry_count
    }

    /// Records one API error and returns the new count
    pub fn record_retry(&self) -> u32 {
        let mut progress = self.progress();
        progress.retry_count += 1;
        progress.retry_count
    }

    pub fn reset_retries(&self) {
        self.progress().retry_count = 0;
    }

    fn progress(&self) -> MutexGuard<'_, ChainProgress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}
