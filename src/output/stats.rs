//! Statistics generation from the bookmark archive
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::SyncError;

/// Number of authors listed in the summary
const TOP_AUTHORS: usize = 10;

/// Archive statistics summary
#[derive(Debug, Clone)]
pub struct ArchiveStatistics {
    /// Total number of archived bookmarks
    pub total_bookmarks: u64,

    /// Bookmarks removed upstream after archiving
    pub removed_bookmarks: u64,

    /// Number of distinct authors
    pub unique_authors: u64,

    /// Number of recorded sync runs
    pub total_runs: u64,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Most-bookmarked authors with their counts
    pub top_authors: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(ArchiveStatistics)` - Successfully loaded statistics
/// * `Err(SyncError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<ArchiveStatistics, SyncError> {
    Ok(ArchiveStatistics {
        total_bookmarks: storage.count_bookmarks()?,
        removed_bookmarks: storage.count_removed()?,
        unique_authors: storage.count_authors()?,
        total_runs: storage.count_runs()?,
        latest_run: storage.get_latest_run()?,
        top_authors: storage.top_authors(TOP_AUTHORS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!("  Bookmarks archived: {}", stats.total_bookmarks);
    println!("  Removed upstream: {}", stats.removed_bookmarks);
    println!("  Unique authors: {}", stats.unique_authors);
    println!("  Sync runs: {}", stats.total_runs);
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Started: {}", run.started_at);
        println!(
            "  Finished: {}",
            run.finished_at.as_deref().unwrap_or("(not finished)")
        );
        println!("  Status: {}", run.status.to_db_string());
        println!();
    }

    if !stats.top_authors.is_empty() {
        println!("Top Authors:");
        for (author, count) in &stats.top_authors {
            let percentage = if stats.total_bookmarks > 0 {
                (*count as f64 / stats.total_bookmarks as f64) * 100.0
            } else {
                0.0
            };
            println!("  @{}: {} ({:.1}%)", author, count, percentage);
        }
    }
}
