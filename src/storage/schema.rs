//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the bookmark archive.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track sync runs (one per process invocation)
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Every bookmark ever delivered
CREATE TABLE IF NOT EXISTS bookmarks (
    id TEXT PRIMARY KEY,
    author_id TEXT NOT NULL,
    author_screen_name TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    raw_json TEXT NOT NULL,
    first_seen_at TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    removed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_bookmarks_author ON bookmarks(author_screen_name);
CREATE INDEX IF NOT EXISTS idx_bookmarks_run ON bookmarks(run_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
