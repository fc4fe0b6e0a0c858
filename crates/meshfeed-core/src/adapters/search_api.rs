use serde_json::Value;

use crate::http_client::HttpRequest;
use crate::normalizer::{normalize_batch, RawShape};
use crate::provider::{array_field, cursor_field, FeedProvider};
use crate::{Page, PageQuery};

/// Search service with its own parameter names.
///
/// Parameters: `q`, `sort=latest`, `count`, `cursor`. Response:
/// `{ hits: [hit], cursor? }` where each hit wraps a post view.
#[derive(Debug, Clone)]
pub struct SearchApiAdapter {
    endpoint: String,
    query: String,
}

impl SearchApiAdapter {
    pub fn new(endpoint: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            query: query.into(),
        }
    }
}

impl FeedProvider for SearchApiAdapter {
    fn id(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, query: &PageQuery) -> HttpRequest {
        let mut url = format!(
            "{}?q={}&sort=latest&count={}",
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
        let posts = normalize_batch(array_field(body, "hits"), RawShape::Hit);
        Page::new(posts, cursor_field(body))
    }
}
