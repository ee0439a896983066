//! Wire types for the bookmarks timeline and delete mutation
//!
//! Only the fields the engine steers by are typed; item and author payloads
//! keep every other upstream field in an opaque `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ITEM_ENTRY: &str = "TimelineTimelineItem";
const CURSOR_ENTRY: &str = "TimelineTimelineCursor";
const BOTTOM_CURSOR: &str = "Bottom";

/// Parsed body of a list query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookmarkResponse {
    #[serde(default)]
    pub data: Option<BookmarkData>,

    #[serde(default)]
    pub errors: Vec<ApiErrorMessage>,
}

/// Server-side error object carried alongside (or instead of) data
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorMessage {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub code: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookmarkData {
    #[serde(default, alias = "bookmark_timeline_v2")]
    pub bookmark_timeline: Option<BookmarkTimeline>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookmarkTimeline {
    #[serde(default)]
    pub timeline: Option<Timeline>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instruction {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub entries: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "entryId", default)]
    pub entry_id: String,

    #[serde(default)]
    pub content: EntryContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryContent {
    #[serde(rename = "entryType", default)]
    pub entry_type: String,

    #[serde(rename = "cursorType", default)]
    pub cursor_type: String,

    #[serde(default)]
    pub value: String,

    #[serde(rename = "itemContent", default)]
    pub item_content: Option<ItemContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemContent {
    #[serde(default)]
    pub tweet_results: Option<TweetResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetResults {
    #[serde(default)]
    pub result: Option<TweetResult>,
}

/// A tweet result, either direct or wrapped one level deeper under `tweet`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetResult {
    #[serde(default)]
    pub rest_id: String,

    #[serde(default)]
    pub core: Option<TweetCore>,

    #[serde(default)]
    pub legacy: Option<TweetLegacy>,

    #[serde(default)]
    pub tweet: Option<Box<TweetResult>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetCore {
    #[serde(default)]
    pub user_results: Option<UserResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserResults {
    #[serde(default)]
    pub result: Option<UserResult>,
}

/// Author of a bookmarked item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserResult {
    #[serde(default)]
    pub rest_id: String,

    #[serde(default)]
    pub legacy: UserLegacy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLegacy {
    #[serde(default)]
    pub screen_name: String,

    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The bookmarked item itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetLegacy {
    #[serde(default)]
    pub id_str: String,

    #[serde(default)]
    pub full_text: String,

    #[serde(default)]
    pub created_at: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One item handed to the consumer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookmarkEntry {
    pub author: UserResult,
    pub tweet: TweetLegacy,
}

impl BookmarkEntry {
    /// Upstream id of the bookmarked item
    pub fn id(&self) -> &str {
        &self.tweet.id_str
    }
}

/// What a timeline entry means to the pagination engine
#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    /// A resolvable item to deliver
    Item(BookmarkEntry),

    /// An item entry whose content no longer resolves upstream
    EmptyItem { rest_id: String },

    /// Position marker for the next page
    BottomCursor(String),

    /// Top cursors and anything else the engine does not act on
    Other,
}

impl BookmarkResponse {
    /// All entries of all instructions, in document order
    pub fn entries(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.data
            .iter()
            .filter_map(|data| data.bookmark_timeline.as_ref())
            .filter_map(|timeline| timeline.timeline.as_ref())
            .flat_map(|timeline| timeline.instructions.iter())
            .flat_map(|instruction| instruction.entries.iter())
    }

    /// Message of the first API error, if any
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }
}

impl TweetResult {
    fn item(&self) -> Option<(&TweetLegacy, Option<&UserResult>)> {
        let legacy = self.legacy.as_ref().filter(|l| !l.id_str.is_empty())?;
        let author = self
            .core
            .as_ref()
            .and_then(|core| core.user_results.as_ref())
            .and_then(|users| users.result.as_ref());
        Some((legacy, author))
    }
}

impl TimelineEntry {
    /// Classifies this entry for the pagination engine
    pub fn classify(&self) -> EntryKind {
        match self.content.entry_type.as_str() {
            ITEM_ENTRY => self.classify_item(),
            CURSOR_ENTRY if self.content.cursor_type == BOTTOM_CURSOR => {
                EntryKind::BottomCursor(self.content.value.clone())
            }
            _ => EntryKind::Other,
        }
    }

    fn classify_item(&self) -> EntryKind {
        let result = self
            .content
            .item_content
            .as_ref()
            .and_then(|content| content.tweet_results.as_ref())
            .and_then(|results| results.result.as_ref());

        let Some(result) = result else {
            return EntryKind::EmptyItem {
                rest_id: String::new(),
            };
        };

        // Items with visibility results nest the real tweet one level deeper
        let resolved = result
            .item()
            .or_else(|| result.tweet.as_deref().and_then(TweetResult::item));

        match resolved {
            Some((tweet, author)) => EntryKind::Item(BookmarkEntry {
                author: author.cloned().unwrap_or_default(),
                tweet: tweet.clone(),
            }),
            None => EntryKind::EmptyItem {
                rest_id: result.rest_id.clone(),
            },
        }
    }
}

/// Parsed body of the delete mutation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteBookmarkResponse {
    #[serde(default)]
    pub data: Option<DeleteBookmarkData>,

    #[serde(default)]
    pub errors: Vec<ApiErrorMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteBookmarkData {
    #[serde(default)]
    pub tweet_bookmark_delete: String,
}
