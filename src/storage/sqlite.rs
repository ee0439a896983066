//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{BookmarkRecord, RunRecord, RunStatus};
use crate::sync::BookmarkEntry;
use crate::SyncError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SyncError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SyncError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM runs")
    }

    // ===== Bookmark Archive =====

    fn record_bookmark(&mut self, entry: &BookmarkEntry, run_id: i64) -> StorageResult<bool> {
        let raw_json = serde_json::to_string(entry)?;
        let now = Utc::now().to_rfc3339();

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO bookmarks
             (id, author_id, author_screen_name, text, created_at, raw_json, first_seen_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id(),
                entry.author.rest_id,
                entry.author.legacy.screen_name,
                entry.tweet.full_text,
                entry.tweet.created_at,
                raw_json,
                now,
                run_id
            ],
        )?;

        Ok(inserted > 0)
    }

    fn has_bookmark(&self, id: &str) -> StorageResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM bookmarks WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get_bookmark(&self, id: &str) -> StorageResult<Option<BookmarkRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, author_id, author_screen_name, text, created_at, raw_json,
                        first_seen_at, run_id, removed_at
                 FROM bookmarks WHERE id = ?1",
                params![id],
                |row| {
                    Ok(BookmarkRecord {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        author_screen_name: row.get(2)?,
                        text: row.get(3)?,
                        created_at: row.get(4)?,
                        raw_json: row.get(5)?,
                        first_seen_at: row.get(6)?,
                        run_id: row.get(7)?,
                        removed_at: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn mark_removed(&mut self, id: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE bookmarks SET removed_at = ?1 WHERE id = ?2 AND removed_at IS NULL",
            params![now, id],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_bookmarks(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM bookmarks")
    }

    fn count_removed(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM bookmarks WHERE removed_at IS NOT NULL")
    }

    fn count_authors(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(DISTINCT author_screen_name) FROM bookmarks")
    }

    fn top_authors(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT author_screen_name, COUNT(*) AS count FROM bookmarks
             GROUP BY author_screen_name ORDER BY count DESC, author_screen_name ASC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let name: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((name, count as u64))
        })?;

        let mut authors = Vec::new();
        for row in rows {
            authors.push(row?);
        }
        Ok(authors)
    }
}
