//! Sync module for following the bookmarks timeline
//!
//! This module contains the core sync logic, including:
//! - Session bootstrap (bundle discovery of the API identifiers)
//! - HTTP plumbing and error classification
//! - The request throttle
//! - The pagination/retry state machine
//! - The periodic scheduler

mod bootstrap;
mod engine;
mod fetcher;
mod query;
mod scheduler;
mod throttle;
mod timeline;

pub use bootstrap::{discover, BundleScraper, DiscoveryStrategy};
pub use engine::{
    next_step, BookmarkConsumer, ChainEnd, ChainReport, EngineSettings, NextStep, SyncEngine,
    MAX_API_RETRIES,
};
pub use fetcher::{build_http_client, Endpoints};
pub use query::{BookmarksQuery, FeatureFlags, QueryVariables};
pub use scheduler::{SyncScheduler, FETCH_INTERVAL};
pub use throttle::Throttle;
pub use timeline::{
    BookmarkEntry, BookmarkResponse, EntryKind, TimelineEntry, TweetLegacy, UserLegacy,
    UserResult,
};
