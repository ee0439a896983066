//! Storage traits and error types
//!
//! This module defines the trait interface for archive backends and
//! associated error types.

use crate::storage::{BookmarkRecord, RunRecord, RunStatus};
use crate::sync::BookmarkEntry;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for archive backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new sync run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Counts all runs ever recorded
    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Bookmark Archive =====

    /// Archives a delivered bookmark
    ///
    /// Returns `true` if the bookmark was new, `false` if it was already
    /// archived (the existing row is left untouched).
    fn record_bookmark(&mut self, entry: &BookmarkEntry, run_id: i64) -> StorageResult<bool>;

    /// Returns whether a bookmark id is archived
    fn has_bookmark(&self, id: &str) -> StorageResult<bool>;

    /// Gets an archived bookmark by id
    fn get_bookmark(&self, id: &str) -> StorageResult<Option<BookmarkRecord>>;

    /// Stamps the time a bookmark was removed upstream
    fn mark_removed(&mut self, id: &str) -> StorageResult<()>;

    // ===== Statistics =====

    fn count_bookmarks(&self) -> StorageResult<u64>;

    fn count_removed(&self) -> StorageResult<u64>;

    fn count_authors(&self) -> StorageResult<u64>;

    /// Most-bookmarked authors, descending
    fn top_authors(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}
