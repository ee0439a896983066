//! HTTP plumbing for the sync engine
//!
//! This module handles:
//! - Building the HTTP client with the configured timeout
//! - Resolving the fixed endpoint paths against the configured base URL
//! - Attaching the session headers to authenticated calls
//! - Classifying transport failures and non-2xx statuses into `SyncError`

use crate::state::Credentials;
use crate::SyncError;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

/// User agent presented to the web client endpoints
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

const LANDING_PATH: &str = "/i/bookmarks";
const GRAPHQL_PATH: &str = "/i/api/graphql";
const CONVERSATION_PATH: &str = "/i/api/2/timeline/conversation";

/// Builds an HTTP client with proper configuration
///
/// `timeout` bounds every request; a request exceeding it surfaces as
/// [`SyncError::Timeout`].
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Endpoint URLs derived from the configured base URL
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
        })
    }

    /// Bookmarks landing page that references the client bundle
    pub fn landing(&self) -> Result<Url, url::ParseError> {
        self.base.join(LANDING_PATH)
    }

    /// List query endpoint, without query string
    pub fn list(&self, operation_id: &str) -> Result<Url, url::ParseError> {
        self.base
            .join(&format!("{}/{}/Bookmarks", GRAPHQL_PATH, operation_id))
    }

    /// Delete mutation endpoint
    pub fn delete(&self, operation_id: &str) -> Result<Url, url::ParseError> {
        self.base
            .join(&format!("{}/{}/DeleteBookmark", GRAPHQL_PATH, operation_id))
    }

    /// Conversation detail endpoint with its fixed flag set appended
    pub fn conversation(&self, item_id: &str) -> Result<Url, url::ParseError> {
        let mut url = self
            .base
            .join(&format!("{}/{}.json", CONVERSATION_PATH, item_id))?;
        url.query_pairs_mut().extend_pairs(CONVERSATION_FLAGS);
        Ok(url)
    }
}

/// Query flags the web client sends with a conversation request
const CONVERSATION_FLAGS: &[(&str, &str)] = &[
    ("include_profile_interstitial_type", "1"),
    ("include_blocking", "1"),
    ("include_blocked_by", "1"),
    ("include_followed_by", "1"),
    ("include_want_retweets", "1"),
    ("include_mute_edge", "1"),
    ("include_can_dm", "1"),
    ("include_can_media_tag", "1"),
    ("include_ext_has_nft_avatar", "1"),
    ("skip_status", "1"),
    ("cards_platform", "Web-12"),
    ("include_cards", "1"),
    ("include_ext_alt_text", "true"),
    ("include_quote_count", "true"),
    ("include_reply_count", "1"),
    ("tweet_mode", "extended"),
    ("include_entities", "true"),
    ("include_user_entities", "true"),
    ("include_ext_media_color", "true"),
    ("include_ext_media_availability", "true"),
    ("include_ext_sensitive_media_warning", "true"),
    ("send_error_codes", "true"),
    ("simple_quoted_tweet", "true"),
    ("include_tweet_replies", "true"),
    (
        "ext",
        "mediaStats,highlightedLabel,hasNftAvatar,voiceInfo,superFollowMetadata",
    ),
];

/// Attaches `Cookie`, bearer `authorization` and `x-csrf-token`
pub fn authorize(builder: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    builder
        .header(reqwest::header::COOKIE, credentials.session_cookie())
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", credentials.bearer_token()),
        )
        .header("x-csrf-token", credentials.csrf_token())
}

/// Sends a request and requires a 2xx status
///
/// # Error Classification
///
/// | Condition | Error |
/// |-----------|-------|
/// | Request timed out | `Timeout` |
/// | Connect/DNS/TLS/other transport failure | `Transport` |
/// | Non-2xx status | `UpstreamStatus` |
pub async fn send(builder: RequestBuilder, url: &str) -> Result<Response, SyncError> {
    let response = builder
        .send()
        .await
        .map_err(|e| classify_transport_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::UpstreamStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// Reads a response body as text
pub async fn read_text(response: Response, url: &str) -> Result<String, SyncError> {
    response
        .text()
        .await
        .map_err(|e| classify_transport_error(url, e))
}

/// Reads a response body as raw bytes
pub async fn read_bytes(response: Response, url: &str) -> Result<Vec<u8>, SyncError> {
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| classify_transport_error(url, e))
}

/// Maps a reqwest failure onto the transport side of the error taxonomy
pub fn classify_transport_error(url: &str, error: reqwest::Error) -> SyncError {
    if error.is_timeout() {
        SyncError::Timeout {
            url: url.to_string(),
        }
    } else {
        SyncError::Transport {
            url: url.to_string(),
            source: error,
        }
    }
}
