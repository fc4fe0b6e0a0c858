//! Provider contract.
//!
//! A [`FeedProvider`] owns everything upstream-specific: endpoint, query
//! parameter names, cursor parameter, sort order and response layout. The
//! aggregator only builds, dispatches and parses through this trait.
//!
//! Providers that report [`FeedProvider::requires_auth`] get a bearer
//! credential attached by the aggregator; they never manage sessions.

use serde_json::Value;

use crate::http_client::HttpRequest;
use crate::{Page, PageQuery};

/// One upstream search API adapted to the canonical [`Page`] contract.
pub trait FeedProvider: Send + Sync {
    /// Stable identity used in logs and failure details.
    fn id(&self) -> &str;

    fn requires_auth(&self) -> bool {
        false
    }

    /// Request descriptor for one page. Authentication is applied by the caller.
    fn build_request(&self, query: &PageQuery) -> HttpRequest;

    /// Turns an already-decoded success body into a page.
    fn parse_page(&self, body: &Value) -> Page;

    /// Decodes a raw success body. A body that is not JSON is an error; a JSON
    /// body of the wrong shape is an empty page.
    fn parse_response(&self, raw: &str) -> Result<Page, serde_json::Error> {
        let body = serde_json::from_str::<Value>(raw)?;
        Ok(self.parse_page(&body))
    }
}

/// Reads a string `cursor` field; any other type means no further pages.
pub(crate) fn cursor_field(body: &Value) -> Option<String> {
    body.get("cursor")
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Reads an array field; absent or non-array yields an empty slice.
pub(crate) fn array_field<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
