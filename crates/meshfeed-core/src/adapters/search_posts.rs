use serde_json::Value;

use crate::http_client::HttpRequest;
use crate::normalizer::{normalize_batch, RawShape};
use crate::provider::{array_field, cursor_field, FeedProvider};
use crate::{Page, PageQuery};

/// `app.bsky.feed.searchPosts` lexicon endpoint.
///
/// Parameters: `q`, `limit`, `cursor`. Response: `{ posts: [view], cursor? }`.
#[derive(Debug, Clone)]
pub struct SearchPostsAdapter {
    endpoint: String,
    query: String,
    requires_auth: bool,
}

impl SearchPostsAdapter {
    pub fn public(endpoint: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            query: query.into(),
            requires_auth: false,
        }
    }

    pub fn authenticated(endpoint: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            requires_auth: true,
            ..Self::public(endpoint, query)
        }
    }
}

impl FeedProvider for SearchPostsAdapter {
    fn id(&self) -> &str {
        &self.endpoint
    }

    fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    fn build_request(&self, query: &PageQuery) -> HttpRequest {
        let mut url = format!(
            "{}?q={}&limit={}",
            self.endpoint,
            urlencoding::encode(&self.query),
            query.limit
        );
        if let Some(cursor) = &query.cursor {
            url.push_str("&cursor=");
            url.push_str(&urlencoding::encode(cursor));
        }
        HttpRequest::get(url)
    }

    fn parse_page(&self, body: &Value) -> Page {
        let posts = normalize_batch(array_field(body, "posts"), RawShape::View);
        Page::new(posts, cursor_field(body))
    }
}
