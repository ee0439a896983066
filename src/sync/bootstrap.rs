//! Session bootstrap: discovers the bearer token and operation ids
//!
//! The private API's identifiers are compiled into the web client's main
//! bundle and change whenever it is redeployed. Discovery is two requests:
//! the bookmarks landing page (to find the versioned bundle URL) and the
//! bundle itself (to scan for the identifiers).
//!
//! The matching rules live behind [`DiscoveryStrategy`] so they can be
//! swapped when the upstream bundle format changes.

use crate::state::ApiIdentifiers;
use crate::sync::fetcher::{read_text, send, Endpoints};
use crate::SyncError;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Versioned main bundle, served from any host
static BUNDLE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://[A-Za-z0-9.\-]+(?::[0-9]+)?/responsive-web/client-web(?:-legacy)?/main\.[0-9a-zA-Z]+\.js",
    )
    .unwrap()
});

/// Bearer tokens start with fifteen `A`s
static BEARER_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AAAAAAAAAAAAAAA[a-zA-Z0-9\-_%]+").unwrap());

static LIST_OPERATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([a-zA-Z0-9\-_]+)",operationName:"Bookmarks""#).unwrap()
});

static DELETE_OPERATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([a-zA-Z0-9\-_]+)",operationName:"DeleteBookmark""#).unwrap()
});

/// Rules for finding the bundle and pulling identifiers out of it
pub trait DiscoveryStrategy: Send + Sync + std::fmt::Debug {
    /// Finds the versioned bundle URL in the landing page body
    fn locate_bundle(&self, landing_page: &str) -> Option<String>;

    /// Extracts the bearer token and operation ids from the bundle source
    fn extract_identifiers(&self, bundle: &str) -> Result<ApiIdentifiers, SyncError>;
}

/// Default strategy: HTML script/link scan with a raw-text fallback, then
/// regex extraction over the bundle
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleScraper;

impl DiscoveryStrategy for BundleScraper {
    fn locate_bundle(&self, landing_page: &str) -> Option<String> {
        bundle_from_markup(landing_page).or_else(|| {
            BUNDLE_URL_REGEX
                .find(landing_page)
                .map(|m| m.as_str().to_string())
        })
    }

    fn extract_identifiers(&self, bundle: &str) -> Result<ApiIdentifiers, SyncError> {
        let bearer_token = BEARER_TOKEN_REGEX
            .find(bundle)
            .map(|m| m.as_str().to_string())
            .ok_or(SyncError::DiscoveryFailed("access token"))?;

        let list_operation_id = first_capture(&LIST_OPERATION_REGEX, bundle)
            .ok_or(SyncError::DiscoveryFailed("list operation"))?;

        let delete_operation_id = first_capture(&DELETE_OPERATION_REGEX, bundle)
            .ok_or(SyncError::DiscoveryFailed("delete operation"))?;

        Ok(ApiIdentifiers {
            bearer_token,
            list_operation_id,
            delete_operation_id,
        })
    }
}

/// Looks for the bundle among `<script src>` and `<link href>` attributes
fn bundle_from_markup(landing_page: &str) -> Option<String> {
    let document = Html::parse_document(landing_page);
    let selector = Selector::parse("script[src], link[href]").ok()?;

    document.select(&selector).find_map(|element| {
        let value = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("href"))?;
        BUNDLE_URL_REGEX
            .find(value)
            .filter(|m| m.start() == 0 && m.end() == value.len())
            .map(|m| m.as_str().to_string())
    })
}

fn first_capture(regex: &Regex, haystack: &str) -> Option<String> {
    regex
        .captures(haystack)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Runs the two-step discovery against the landing page and bundle
///
/// # Errors
///
/// * `Transport` / `Timeout` / `UpstreamStatus` - either request failed
/// * `DiscoveryFailed("main bundle")` - no bundle URL on the landing page
/// * `DiscoveryFailed(..)` - a required identifier is missing from the bundle
pub async fn discover(
    client: &Client,
    endpoints: &Endpoints,
    session_cookie: &str,
    strategy: &dyn DiscoveryStrategy,
) -> Result<ApiIdentifiers, SyncError> {
    let landing = endpoints.landing()?;
    let landing_url = landing.to_string();

    tracing::debug!("Fetching landing page {}", landing_url);
    let response = send(
        client
            .get(landing)
            .header(reqwest::header::COOKIE, session_cookie),
        &landing_url,
    )
    .await?;
    let page = read_text(response, &landing_url).await?;

    let bundle_url = strategy
        .locate_bundle(&page)
        .ok_or(SyncError::DiscoveryFailed("main bundle"))?;

    tracing::debug!("Fetching client bundle {}", bundle_url);
    let response = send(client.get(&bundle_url), &bundle_url).await?;
    let bundle = read_text(response, &bundle_url).await?;

    let identifiers = strategy.extract_identifiers(&bundle)?;
    tracing::info!(
        "Discovered list operation {} and delete operation {}",
        identifiers.list_operation_id,
        identifiers.delete_operation_id
    );
    Ok(identifiers)
}
