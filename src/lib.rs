//! Bookmark-Sync: a resumable bookmarks timeline follower
//!
//! This crate bootstraps a browser session against the bookmarks web client,
//! discovers the private API identifiers compiled into its bundle, and walks
//! the paginated bookmarks timeline on a schedule, handing every item to a
//! consumer callback.

pub mod config;
pub mod output;
pub mod state;
pub mod storage;
pub mod sync;

use thiserror::Error;

/// Main error type for Bookmark-Sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Discovery failed: could not locate {0}")]
    DiscoveryFailed(&'static str),

    #[error("API error: {0}")]
    Api(String),

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Engine has no API identifiers; bootstrap first")]
    NotBootstrapped,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Returns true for failures that mean the upstream could not be reached
    /// or refused the request (transport, timeout, non-2xx status)
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::UpstreamStatus { .. } | Self::Timeout { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Bookmark-Sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{Credentials, RunState};
pub use sync::{BookmarkConsumer, ChainEnd, ChainReport, SyncEngine, SyncScheduler};
