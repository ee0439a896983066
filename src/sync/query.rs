//! Bookmarks list query parameters
//!
//! The list endpoint takes two JSON documents, `variables` and `features`,
//! each URL-escaped into the query string.

use serde::{Deserialize, Serialize};
use url::Url;

/// Pagination and display options of the list query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariables {
    pub count: u32,
    pub cursor: String,
    pub include_promoted_content: bool,
    pub with_super_follows_user_fields: bool,
    pub with_downvote_perspective: bool,
    pub with_reactions_metadata: bool,
    pub with_reactions_perspective: bool,
    pub with_super_follows_tweet_fields: bool,
}

/// Feature flags the web client sends with every list query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub dont_mention_me_view_api_enabled: bool,
    pub interactive_text_enabled: bool,
    pub responsive_web_uc_gql_enabled: bool,
    pub vibe_api_enabled: bool,
    pub responsive_web_edit_tweet_api_enabled: bool,
    pub standardized_nudges_misinfo: bool,
    pub tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled: bool,
    pub responsive_web_enhance_cards_enabled: bool,
    pub graphql_timeline_v2_bookmark_timeline: bool,
    pub responsive_web_twitter_blue_verified_badge_is_enabled: bool,
    pub verified_phone_label_enabled: bool,
    pub responsive_web_graphql_timeline_navigation_enabled: bool,
    pub unified_cards_ad_metadata_container_dynamic_card_content_query_enabled: bool,
    pub tweetypie_unmention_optimization_enabled: bool,
    pub graphql_is_translatable_rweb_tweet_is_translatable_enabled: bool,
    pub responsive_web_text_conversations_enabled: bool,
}

/// A complete list query: variables plus feature flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarksQuery {
    pub variables: QueryVariables,
    pub features: FeatureFlags,
}

impl QueryVariables {
    /// Variables for a page of `count` items starting at `cursor`
    pub fn new(count: u32, cursor: impl Into<String>) -> Self {
        Self {
            count,
            cursor: cursor.into(),
            include_promoted_content: true,
            with_super_follows_user_fields: true,
            with_downvote_perspective: false,
            with_reactions_metadata: false,
            with_reactions_perspective: false,
            with_super_follows_tweet_fields: true,
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            dont_mention_me_view_api_enabled: true,
            interactive_text_enabled: true,
            responsive_web_uc_gql_enabled: true,
            vibe_api_enabled: true,
            responsive_web_edit_tweet_api_enabled: false,
            standardized_nudges_misinfo: true,
            tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled: false,
            responsive_web_enhance_cards_enabled: false,
            graphql_timeline_v2_bookmark_timeline: false,
            responsive_web_twitter_blue_verified_badge_is_enabled: true,
            verified_phone_label_enabled: false,
            responsive_web_graphql_timeline_navigation_enabled: true,
            unified_cards_ad_metadata_container_dynamic_card_content_query_enabled: true,
            tweetypie_unmention_optimization_enabled: true,
            graphql_is_translatable_rweb_tweet_is_translatable_enabled: true,
            responsive_web_text_conversations_enabled: false,
        }
    }
}

impl BookmarksQuery {
    pub fn new(count: u32, cursor: impl Into<String>) -> Self {
        Self {
            variables: QueryVariables::new(count, cursor),
            features: FeatureFlags::default(),
        }
    }

    /// Appends `variables` and `features` to `endpoint` as URL-escaped JSON
    pub fn apply_to(&self, endpoint: &mut Url) -> Result<(), serde_json::Error> {
        let variables = serde_json::to_string(&self.variables)?;
        let features = serde_json::to_string(&self.features)?;

        endpoint
            .query_pairs_mut()
            .append_pair("variables", &variables)
            .append_pair("features", &features);
        Ok(())
    }

    /// Recovers a query from a URL built by [`BookmarksQuery::apply_to`]
    ///
    /// Returns `Ok(None)` if either parameter is missing.
    pub fn from_url(url: &Url) -> Result<Option<Self>, serde_json::Error> {
        let mut variables = None;
        let mut features = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "variables" => variables = Some(serde_json::from_str(&value)?),
                "features" => features = Some(serde_json::from_str(&value)?),
                _ => {}
            }
        }

        Ok(variables
            .zip(features)
            .map(|(variables, features)| Self {
                variables,
                features,
            }))
    }
}
