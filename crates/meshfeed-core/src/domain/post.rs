use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Upstream search page for the archive tag, offered when the feed cannot load.
pub const SEARCH_FALLBACK_URL: &str = "https://bsky.app/search?q=%23meshArchive";

const WEB_BASE_URL: &str = "https://bsky.app";

/// Canonical post shape returned to feed consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub uri: String,
    pub id: String,
    pub author: Author,
    #[serde(default)]
    pub body: PostBody,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

impl MediaItem {
    /// Preferred URL for inline display: thumbnail first, then full size.
    pub fn display_url(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .or(self.full_url.as_deref())
    }
}

impl Author {
    /// Display name when present and non-empty, otherwise `@handle`.
    pub fn label(&self) -> String {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_owned(),
            _ => format!("@{}", self.handle),
        }
    }
}

impl Post {
    /// Checks the identity invariants every served post must hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.uri.trim().is_empty() {
            return Err(ValidationError::EmptyUri);
        }
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.author.handle.trim().is_empty() {
            return Err(ValidationError::EmptyHandle);
        }
        Ok(())
    }

    /// Timestamp shown to readers: the record's creation time, else the index time.
    pub fn display_timestamp(&self) -> Option<&str> {
        self.body
            .created_at
            .as_deref()
            .or(self.indexed_at.as_deref())
    }

    /// Permalink on the upstream web client.
    ///
    /// The record key is the last path segment of the `at://` uri.
    pub fn web_url(&self) -> String {
        let handle = self.author.handle.trim();
        if handle.is_empty() {
            return String::from(WEB_BASE_URL);
        }

        match self.uri.rsplit('/').next().filter(|rkey| !rkey.is_empty()) {
            Some(rkey) => format!("{WEB_BASE_URL}/profile/{handle}/post/{rkey}"),
            None => format!("{WEB_BASE_URL}/profile/{handle}"),
        }
    }
}
