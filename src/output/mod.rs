//! Output module for archive reports
//!
//! This module handles printing statistics about the archived bookmarks
//! and recorded sync runs.

pub mod stats;

pub use stats::{load_statistics, print_statistics, ArchiveStatistics};
