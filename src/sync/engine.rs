//! Sync engine - pagination chain and single-item operations
//!
//! A chain walks the bookmarks timeline page by page. Each step builds the
//! list query from the stored cursor, waits for its throttle turn, issues the
//! request and classifies the outcome:
//!
//! | Outcome | Action |
//! |---------|--------|
//! | Transport error / non-2xx / timeout | Log, end chain |
//! | Malformed body | Log, end chain |
//! | Body carries API errors | Retry immediately, end after 10 retries |
//! | Clean page | Deliver items, then continue or end (see [`next_step`]) |
//!
//! At most one chain runs per engine; a second `run_chain` while one is in
//! flight returns `None` without touching any state.

use crate::config::Config;
use crate::state::{ApiIdentifiers, Credentials, RunState};
use crate::sync::bootstrap::{discover, BundleScraper, DiscoveryStrategy};
use crate::sync::fetcher::{
    authorize, build_http_client, read_bytes, read_text, send, Endpoints,
};
use crate::sync::query::BookmarksQuery;
use crate::sync::throttle::Throttle;
use crate::sync::timeline::{
    BookmarkEntry, BookmarkResponse, DeleteBookmarkResponse, EntryKind,
};
use crate::SyncError;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// API errors tolerated within one chain before it gives up
pub const MAX_API_RETRIES: u32 = 10;

/// Receives every item a chain discovers
///
/// Returning `false` stops the current chain immediately; no further entries
/// are delivered and no further page is fetched.
pub trait BookmarkConsumer: Send + Sync {
    fn on_item(&self, entry: &BookmarkEntry) -> bool;
}

impl<F> BookmarkConsumer for F
where
    F: Fn(&BookmarkEntry) -> bool + Send + Sync,
{
    fn on_item(&self, entry: &BookmarkEntry) -> bool {
        self(entry)
    }
}

/// Engine construction parameters
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Items requested per page
    pub page_size: u32,

    /// Minimum interval between API calls
    pub min_interval: Duration,

    /// Per-request timeout
    pub timeout: Duration,

    /// Scheme and host of the web client and API
    pub base_url: String,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.engine.page_size,
            min_interval: config.engine.delay(),
            timeout: config.engine.timeout(),
            base_url: config.endpoints.base_url.clone(),
        }
    }
}

/// Why a chain stopped
#[derive(Debug)]
pub enum ChainEnd {
    /// No further page to fetch
    Exhausted,

    /// The consumer asked to stop
    ConsumerStopped,

    /// API errors exceeded [`MAX_API_RETRIES`]
    RetriesExhausted { errors: Vec<String> },

    /// A non-retryable failure ended the chain
    Failed(SyncError),
}

/// Summary of a finished chain
#[derive(Debug)]
pub struct ChainReport {
    /// Requests issued, including retries
    pub attempts: u32,

    /// Pages processed without API errors
    pub pages: u32,

    /// Consumer invocations
    pub delivered: u64,

    /// Item entries that no longer resolve upstream
    pub empty: u64,

    /// Stored cursor when the chain ended
    pub cursor: String,

    pub end: ChainEnd,
}

/// What to do after a clean page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Store this cursor and fetch again
    Advance(String),

    /// Fetch the same window again
    Repeat,

    /// The chain is done
    Exhausted,
}

/// Decides how a chain continues after a clean page
///
/// With `resume`, the chain keeps going while pages come back full, but the
/// stored cursor only moves past a page whose items were all empty; any page
/// that delivered something is fetched again from the same cursor. Without
/// `resume`, the chain follows the bottom cursor until there is none.
///
/// In both modes a bottom cursor equal to the one just used ends the chain,
/// since fetching it again cannot make progress.
pub fn next_step(
    resume: bool,
    page_size: u32,
    items_seen: u32,
    empty: u32,
    current_cursor: &str,
    bottom_cursor: &str,
) -> NextStep {
    let can_advance = !bottom_cursor.is_empty() && bottom_cursor != current_cursor;

    if resume {
        if items_seen < page_size {
            NextStep::Exhausted
        } else if items_seen != empty {
            NextStep::Repeat
        } else if can_advance {
            NextStep::Advance(bottom_cursor.to_string())
        } else {
            NextStep::Exhausted
        }
    } else if can_advance {
        NextStep::Advance(bottom_cursor.to_string())
    } else {
        NextStep::Exhausted
    }
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    variables: DeleteVariables<'a>,
    #[serde(rename = "queryId")]
    query_id: &'a str,
}

#[derive(Serialize)]
struct DeleteVariables<'a> {
    tweet_id: &'a str,
}

/// One engine per session: credentials, throttle and chain state
pub struct SyncEngine {
    client: Client,
    endpoints: Endpoints,
    page_size: u32,
    credentials: RwLock<Credentials>,
    run_state: RunState,
    throttle: Throttle,
    strategy: Box<dyn DiscoveryStrategy>,
}

impl SyncEngine {
    /// Creates an engine for a session cookie
    ///
    /// The engine has no API identifiers until [`SyncEngine::bootstrap`] or
    /// [`SyncEngine::apply_identifiers`] runs.
    pub fn new(settings: EngineSettings, session_cookie: &str) -> Result<Self, SyncError> {
        let credentials = Credentials::new(session_cookie);
        if credentials.csrf_token().is_empty() {
            tracing::warn!("Session cookie has no ct0 pair; requests will carry an empty CSRF token");
        }

        Ok(Self {
            client: build_http_client(settings.timeout)?,
            endpoints: Endpoints::new(&settings.base_url)?,
            page_size: settings.page_size,
            credentials: RwLock::new(credentials),
            run_state: RunState::new(),
            throttle: Throttle::new(settings.min_interval),
            strategy: Box::new(BundleScraper),
        })
    }

    /// Creates an engine from configuration, installing cached identifiers
    /// when all of them are present
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let engine = Self::new(EngineSettings::from_config(config), &config.session.cookie)?;
        if config.session.has_cached_identifiers() {
            engine.apply_identifiers(&ApiIdentifiers {
                bearer_token: config.session.access_token.clone(),
                list_operation_id: config.session.list_operation_id.clone(),
                delete_operation_id: config.session.delete_operation_id.clone(),
            });
        }
        Ok(engine)
    }

    /// Replaces the discovery rules
    pub fn with_strategy(mut self, strategy: Box<dyn DiscoveryStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    // ===== Credentials =====

    /// Replaces bearer token and cookie, re-deriving the CSRF token
    ///
    /// Returns whether the new cookie carried a `ct0` pair.
    pub fn set_credentials(&self, bearer_token: &str, session_cookie: &str) -> bool {
        self.credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_credentials(bearer_token, session_cookie)
    }

    /// Installs known identifiers without a bootstrap
    pub fn apply_identifiers(&self, identifiers: &ApiIdentifiers) {
        self.credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply_identifiers(identifiers);
    }

    /// Snapshot of the current credentials
    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Discovers fresh identifiers and installs them
    ///
    /// Run again whenever calls start failing because the upstream client
    /// was redeployed.
    pub async fn bootstrap(&self) -> Result<ApiIdentifiers, SyncError> {
        let cookie = self.credentials().session_cookie().to_string();
        let identifiers =
            discover(&self.client, &self.endpoints, &cookie, self.strategy.as_ref()).await?;
        self.apply_identifiers(&identifiers);
        Ok(identifiers)
    }

    // ===== Run state =====

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    pub fn cursor(&self) -> String {
        self.run_state.cursor()
    }

    pub fn reset_cursor(&self) {
        self.run_state.reset_cursor();
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    // ===== Pagination chain =====

    /// Runs one pagination chain to completion
    ///
    /// `resume` keeps the stored cursor across chains; otherwise the chain
    /// starts from the top of the list. Returns `None` if another chain is
    /// already running.
    pub async fn run_chain(
        &self,
        resume: bool,
        consumer: &dyn BookmarkConsumer,
    ) -> Option<ChainReport> {
        let Some(_guard) = self.run_state.try_begin() else {
            tracing::debug!("Chain already running, skipping");
            return None;
        };

        self.run_state.reset_retries();
        if !resume {
            self.run_state.reset_cursor();
        }

        let mut report = ChainReport {
            attempts: 0,
            pages: 0,
            delivered: 0,
            empty: 0,
            cursor: String::new(),
            end: ChainEnd::Exhausted,
        };
        let mut errors = Vec::new();

        let end = loop {
            let cursor = self.run_state.cursor();
            report.attempts += 1;

            let page = match self.fetch_page(&cursor).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        cursor = %cursor,
                        attempt = report.attempts,
                        "Bookmarks request failed: {}",
                        e
                    );
                    break ChainEnd::Failed(e);
                }
            };

            if let Some(message) = page.first_error() {
                tracing::warn!(
                    cursor = %cursor,
                    attempt = report.attempts,
                    "API error at cursor \"{}\": {}",
                    cursor,
                    message
                );
                errors.push(message.to_string());

                if self.run_state.record_retry() > MAX_API_RETRIES {
                    tracing::error!(
                        cursor = %cursor,
                        attempt = report.attempts,
                        "API failed too many times: {}",
                        message
                    );
                    break ChainEnd::RetriesExhausted { errors };
                }
                continue;
            }

            report.pages += 1;
            self.run_state.reset_retries();

            let mut items_seen = 0u32;
            let mut empty = 0u32;
            let mut bottom_cursor = String::new();
            let mut stopped = false;

            for entry in page.entries() {
                match entry.classify() {
                    EntryKind::Item(item) => {
                        items_seen += 1;
                        report.delivered += 1;
                        if !consumer.on_item(&item) {
                            stopped = true;
                            break;
                        }
                    }
                    EntryKind::EmptyItem { rest_id } => {
                        tracing::info!(
                            "Empty item {:?}; probably deleted upstream",
                            rest_id
                        );
                        items_seen += 1;
                        empty += 1;
                        report.empty += 1;
                    }
                    EntryKind::BottomCursor(value) => bottom_cursor = value,
                    EntryKind::Other => {}
                }
            }

            if stopped {
                tracing::debug!(cursor = %cursor, "Consumer stopped the chain");
                break ChainEnd::ConsumerStopped;
            }

            match next_step(
                resume,
                self.page_size,
                items_seen,
                empty,
                &cursor,
                &bottom_cursor,
            ) {
                NextStep::Advance(next) => {
                    tracing::debug!(cursor = %next, "Advancing cursor");
                    self.run_state.set_cursor(next);
                }
                NextStep::Repeat => {
                    tracing::debug!(cursor = %cursor, "Page delivered items, fetching same window again");
                }
                NextStep::Exhausted => break ChainEnd::Exhausted,
            }
        };

        report.end = end;
        report.cursor = self.run_state.cursor();
        tracing::info!(
            cursor = %report.cursor,
            pages = report.pages,
            delivered = report.delivered,
            "Chain finished: {:?}",
            ChainEndKind::from(&report.end)
        );
        Some(report)
    }

    async fn fetch_page(&self, cursor: &str) -> Result<BookmarkResponse, SyncError> {
        let credentials = self.credentials();
        if !credentials.has_identifiers() {
            return Err(SyncError::NotBootstrapped);
        }

        let mut url = self.endpoints.list(credentials.list_operation_id())?;
        BookmarksQuery::new(self.page_size, cursor).apply_to(&mut url)?;
        let url_str = url.to_string();

        self.throttle.wait_turn().await;
        tracing::trace!("GET {}", url_str);
        let response = send(authorize(self.client.get(url), &credentials), &url_str).await?;
        let body = read_text(response, &url_str).await?;
        Ok(serde_json::from_str(&body)?)
    }

    // ===== Single-item operations =====

    /// Removes one bookmark and returns the server's acknowledgement
    pub async fn delete_item(&self, item_id: &str) -> Result<String, SyncError> {
        let credentials = self.credentials();
        let operation_id = credentials.delete_operation_id();
        if operation_id.is_empty() {
            return Err(SyncError::NotBootstrapped);
        }

        let url = self.endpoints.delete(operation_id)?;
        let url_str = url.to_string();
        let body = serde_json::to_vec(&DeleteRequest {
            variables: DeleteVariables { tweet_id: item_id },
            query_id: operation_id,
        })?;

        let request = authorize(self.client.post(url), &credentials)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        self.throttle.wait_turn().await;
        let response = send(request, &url_str).await?;
        let text = read_text(response, &url_str).await?;

        let ack: DeleteBookmarkResponse = serde_json::from_str(&text)?;
        if let Some(error) = ack.errors.first() {
            return Err(SyncError::Api(error.message.clone()));
        }

        let ack = ack.data.map(|d| d.tweet_bookmark_delete).unwrap_or_default();
        tracing::debug!("Deleted bookmark {}: {}", item_id, ack);
        Ok(ack)
    }

    /// Fetches the conversation document around one item
    pub async fn tweet_detail(&self, item_id: &str) -> Result<serde_json::Value, SyncError> {
        self.throttle.wait_turn().await;

        let credentials = self.credentials();
        let url = self.endpoints.conversation(item_id)?;
        let url_str = url.to_string();

        let response = send(authorize(self.client.get(url), &credentials), &url_str).await?;
        let text = read_text(response, &url_str).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Authenticated GET of an arbitrary URL (media, etc.)
    ///
    /// Not throttled: these requests target content hosts, not the API.
    pub async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, SyncError> {
        let credentials = self.credentials();
        let response = send(authorize(self.client.get(url), &credentials), url).await?;
        read_bytes(response, url).await
    }

    /// Fetches `url` and writes the body to `path`
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<(), SyncError> {
        let body = self.fetch_raw(url).await.map_err(|e| {
            tracing::error!("Could not download {}: {}", url, e);
            e
        })?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }
}

/// Field-less view of [`ChainEnd`] for log lines
#[derive(Debug)]
enum ChainEndKind {
    Exhausted,
    ConsumerStopped,
    RetriesExhausted,
    Failed,
}

impl From<&ChainEnd> for ChainEndKind {
    fn from(end: &ChainEnd) -> Self {
        match end {
            ChainEnd::Exhausted => Self::Exhausted,
            ChainEnd::ConsumerStopped => Self::ConsumerStopped,
            ChainEnd::RetriesExhausted { .. } => Self::RetriesExhausted,
            ChainEnd::Failed(_) => Self::Failed,
        }
    }
}
