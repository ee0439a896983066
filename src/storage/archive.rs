//! Archive consumer: persists every delivered bookmark
//!
//! Two modes:
//! - catch-up: archive new items and stop the chain at the first one that
//!   is already archived
//! - remove: archive every item, then queue it for removal upstream; the
//!   chain only stops once an id has failed removal too many times
//!
//! A failed removal releases the id so the next delivery queues it again.

use crate::storage::{RunStatus, SqliteStorage, Storage, StorageResult};
use crate::sync::{BookmarkConsumer, BookmarkEntry, SyncEngine};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Failed removals after which an id is no longer queued
pub const MAX_REMOVAL_FAILURES: u32 = 3;

pub struct ArchiveConsumer {
    storage: Mutex<SqliteStorage>,
    run_id: i64,
    remove: bool,
    removals: Mutex<Option<mpsc::UnboundedSender<String>>>,
    queued: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, u32>>,
    archived: AtomicU64,
}

impl ArchiveConsumer {
    /// Archives new items and stops each chain once it reaches known ones
    pub fn catch_up(storage: SqliteStorage, run_id: i64) -> Self {
        Self {
            storage: Mutex::new(storage),
            run_id,
            remove: false,
            removals: Mutex::new(None),
            queued: Mutex::new(HashSet::new()),
            failures: Mutex::new(HashMap::new()),
            archived: AtomicU64::new(0),
        }
    }

    /// Archives every item and hands its id to the returned receiver for
    /// removal upstream
    pub fn removing(
        storage: SqliteStorage,
        run_id: i64,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut consumer = Self::catch_up(storage, run_id);
        consumer.remove = true;
        consumer.removals = Mutex::new(Some(tx));
        (consumer, rx)
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Bookmarks newly archived by this consumer
    pub fn archived(&self) -> u64 {
        self.archived.load(Ordering::Relaxed)
    }

    /// Returns true while an id sits in the removal queue
    pub fn is_queued(&self, id: &str) -> bool {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Failed removal attempts recorded for an id
    pub fn removal_failures(&self, id: &str) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Stops queueing removals; the receiver drains and then closes
    pub fn close_removals(&self) {
        self.removals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Stamps a bookmark as removed upstream
    pub fn mark_removed(&self, id: &str) -> StorageResult<()> {
        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .mark_removed(id)
    }

    /// Records the final status of this consumer's run
    pub fn finish_run(&self, status: RunStatus) -> StorageResult<()> {
        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish_run(self.run_id, status)
    }

    /// Deletes queued bookmarks upstream until the queue closes
    pub async fn process_removals(
        &self,
        engine: &SyncEngine,
        mut rx: mpsc::UnboundedReceiver<String>,
    ) {
        while let Some(id) = rx.recv().await {
            match engine.delete_item(&id).await {
                Ok(ack) => {
                    tracing::info!("Removed bookmark {} ({})", id, ack);
                    if let Err(e) = self.mark_removed(&id) {
                        tracing::error!("Could not mark {} as removed: {}", id, e);
                    }
                }
                Err(e) => {
                    let failures = self.removal_failed(&id);
                    tracing::error!(
                        "Could not remove bookmark {} (attempt {}/{}): {}",
                        id,
                        failures,
                        MAX_REMOVAL_FAILURES,
                        e
                    );
                }
            }
        }
    }

    /// Releases a failed id from the queue and counts the failure
    fn removal_failed(&self, id: &str) -> u32 {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn queue_removal(&self, tx: &mpsc::UnboundedSender<String>, id: &str) {
        let mut queued = self.queued.lock().unwrap_or_else(PoisonError::into_inner);
        if !queued.insert(id.to_string()) {
            return;
        }
        if tx.send(id.to_string()).is_err() {
            tracing::warn!("Removal queue closed; {} stays bookmarked", id);
        }
    }
}

impl BookmarkConsumer for ArchiveConsumer {
    fn on_item(&self, entry: &BookmarkEntry) -> bool {
        let recorded = self
            .storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_bookmark(entry, self.run_id);

        let is_new = match recorded {
            Ok(is_new) => is_new,
            Err(e) => {
                tracing::error!("Could not archive {}: {}", entry.id(), e);
                return false;
            }
        };

        if is_new {
            self.archived.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                "Archived {} by @{}",
                entry.id(),
                entry.author.legacy.screen_name
            );
        }

        if !self.remove {
            if !is_new {
                tracing::debug!("Reached archived bookmark {}; caught up", entry.id());
            }
            return is_new;
        }

        if self.removal_failures(entry.id()) >= MAX_REMOVAL_FAILURES {
            tracing::warn!(
                "Giving up on removing {} after {} failures; stopping chain",
                entry.id(),
                MAX_REMOVAL_FAILURES
            );
            return false;
        }

        let removals = self.removals.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = removals.as_ref() {
            self.queue_removal(tx, entry.id());
        }
        true
    }
}
