use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default base URL of the web client and its private API
pub const DEFAULT_BASE_URL: &str = "https://twitter.com";

/// Main configuration structure for Bookmark-Sync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    pub output: OutputConfig,
}

/// Browser session and cached API identifiers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Raw `Cookie` header value of a logged-in browser session
    pub cookie: String,

    /// Cached bearer token (discovered by bootstrap when empty)
    #[serde(rename = "access-token", default)]
    pub access_token: String,

    /// Cached operation identifier of the bookmarks list query
    #[serde(rename = "list-operation-id", default)]
    pub list_operation_id: String,

    /// Cached operation identifier of the delete-bookmark mutation
    #[serde(rename = "delete-operation-id", default)]
    pub delete_operation_id: String,
}

/// Engine pacing and paging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Minimum time between two outbound API calls (milliseconds)
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Number of items requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Seconds between two scheduled chains
    #[serde(rename = "fetch-interval", default = "default_fetch_interval")]
    pub fetch_interval: u64,
}

/// Upstream endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    /// Scheme and host serving the landing page and the API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite archive of delivered bookmarks
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Flat record exchanged with whoever persists the session
///
/// Serializes back into the `[session]`/`[engine]` keys of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    #[serde(rename = "access-token")]
    pub access_token: String,
    pub cookie: String,
    #[serde(rename = "list-operation-id")]
    pub list_operation_id: String,
    #[serde(rename = "delete-operation-id")]
    pub delete_operation_id: String,
    pub delay: u64,
    pub timeout: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            timeout: default_timeout(),
            page_size: default_page_size(),
            fetch_interval: default_fetch_interval(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl EngineConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval)
    }
}

impl SessionConfig {
    /// Returns true when every API identifier is cached, so a bootstrap can
    /// be skipped for single-item operations
    pub fn has_cached_identifiers(&self) -> bool {
        !self.access_token.is_empty()
            && !self.list_operation_id.is_empty()
            && !self.delete_operation_id.is_empty()
    }
}

impl Config {
    /// Builds the flat exchange record from this configuration
    pub fn session_record(&self) -> SessionRecord {
        SessionRecord {
            access_token: self.session.access_token.clone(),
            cookie: self.session.cookie.clone(),
            list_operation_id: self.session.list_operation_id.clone(),
            delete_operation_id: self.session.delete_operation_id.clone(),
            delay: self.engine.delay,
            timeout: self.engine.timeout,
        }
    }
}

fn default_delay() -> u64 {
    30_000
}

fn default_timeout() -> u64 {
    10_000
}

fn default_page_size() -> u32 {
    20
}

fn default_fetch_interval() -> u64 {
    60
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
