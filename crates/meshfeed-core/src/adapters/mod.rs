mod search_api;
mod search_posts;

use std::sync::Arc;

pub use search_api::SearchApiAdapter;
pub use search_posts::SearchPostsAdapter;

use crate::provider::FeedProvider;

/// Tag every default provider searches for.
pub const DEFAULT_QUERY: &str = "#meshArchive";

/// Authenticated lexicon endpoint on the entryway PDS.
pub const ENTRYWAY_SEARCH_POSTS: &str = "https://bsky.social/xrpc/app.bsky.feed.searchPosts";

/// Public, unauthenticated AppView endpoint.
pub const PUBLIC_SEARCH_POSTS: &str = "https://public.api.bsky.app/xrpc/app.bsky.feed.searchPosts";

/// Legacy search service.
pub const SEARCH_API_POSTS: &str = "https://search.bsky.social/api/v1/search/posts";

/// Default provider list in priority order.
pub fn default_providers(query: &str) -> Vec<Arc<dyn FeedProvider>> {
    vec![
        Arc::new(SearchPostsAdapter::authenticated(ENTRYWAY_SEARCH_POSTS, query)),
        Arc::new(SearchPostsAdapter::public(PUBLIC_SEARCH_POSTS, query)),
        Arc::new(SearchApiAdapter::new(SEARCH_API_POSTS, query)),
    ]
}
