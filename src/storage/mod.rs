//! Storage module for the bookmark archive
//!
//! This module handles all database operations for the archive, including:
//! - SQLite database initialization and schema management
//! - Run tracking (one row per process invocation)
//! - Bookmark persistence and removal stamps
//! - The archive consumer used by the command-line tool

mod archive;
mod schema;
mod sqlite;
mod traits;

pub use archive::{ArchiveConsumer, MAX_REMOVAL_FAILURES};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::SyncError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SyncError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SyncError> {
    SqliteStorage::new(path)
}

/// An archived bookmark
#[derive(Debug, Clone)]
pub struct BookmarkRecord {
    pub id: String,
    pub author_id: String,
    pub author_screen_name: String,
    pub text: String,
    pub created_at: String,
    pub raw_json: String,
    pub first_seen_at: String,
    pub run_id: i64,
    pub removed_at: Option<String>,
}

/// Represents a sync run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
