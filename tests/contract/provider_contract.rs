use std::sync::Arc;

use meshfeed_core::adapters::{ENTRYWAY_SEARCH_POSTS, PUBLIC_SEARCH_POSTS, SEARCH_API_POSTS};
use meshfeed_core::{
    default_providers, FeedProvider, HttpMethod, PageQuery, PageSize, SearchApiAdapter,
    SearchPostsAdapter, DEFAULT_QUERY,
};
use serde_json::{json, Map, Value};

#[derive(Clone)]
struct ProviderCase {
    name: &'static str,
    provider: Arc<dyn FeedProvider>,
    list_field: &'static str,
    limit_param: &'static str,
    wrap: fn(Value) -> Value,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            name: "authenticated searchPosts",
            provider: Arc::new(SearchPostsAdapter::authenticated(ENTRYWAY_SEARCH_POSTS, DEFAULT_QUERY)),
            list_field: "posts",
            limit_param: "limit",
            wrap: |view| view,
        },
        ProviderCase {
            name: "public searchPosts",
            provider: Arc::new(SearchPostsAdapter::public(PUBLIC_SEARCH_POSTS, DEFAULT_QUERY)),
            list_field: "posts",
            limit_param: "limit",
            wrap: |view| view,
        },
        ProviderCase {
            name: "search api",
            provider: Arc::new(SearchApiAdapter::new(SEARCH_API_POSTS, DEFAULT_QUERY)),
            list_field: "hits",
            limit_param: "count",
            wrap: |view| json!({ "post": view }),
        },
    ]
}

fn view(rkey: &str) -> Value {
    json!({
        "uri": format!("at://did:plc:maker/app.bsky.feed.post/{rkey}"),
        "cid": format!("cid-{rkey}"),
        "author": { "did": "did:plc:maker", "handle": "maker.bsky.social", "displayName": "Maker" },
        "record": { "text": format!("sketch {rkey}"), "createdAt": "2024-05-01T10:00:00Z" },
        "embed": {
            "$type": "app.bsky.embed.images#view",
            "images": [
                { "thumb": "https://cdn.test/t.jpg", "fullsize": "https://cdn.test/f.jpg", "alt": "glitch" },
                { "alt": "no urls" }
            ]
        },
        "indexedAt": "2024-05-01T10:00:05Z"
    })
}

fn body(case: &ProviderCase, items: Vec<Value>, cursor: Option<&str>) -> String {
    let items = items.into_iter().map(case.wrap).collect::<Vec<_>>();
    let mut body = Map::new();
    body.insert(case.list_field.to_owned(), Value::Array(items));
    if let Some(cursor) = cursor {
        body.insert(String::from("cursor"), json!(cursor));
    }
    Value::Object(body).to_string()
}

#[test]
fn requests_are_json_gets_carrying_query_limit_and_cursor() {
    let query = PageQuery::new(PageSize::clamped(12), Some(String::from("next page")));

    for case in provider_cases() {
        let request = case.provider.build_request(&query);

        assert_eq!(request.method, HttpMethod::Get, "provider '{}': method", case.name);
        assert!(
            request.url.starts_with(case.provider.id()),
            "provider '{}': url {} should start with its endpoint",
            case.name,
            request.url
        );
        assert!(request.url.contains("q=%23meshArchive"), "provider '{}': query", case.name);
        assert!(
            request.url.contains(&format!("{}=12", case.limit_param)),
            "provider '{}': limit parameter",
            case.name
        );
        assert!(request.url.contains("cursor=next%20page"), "provider '{}': cursor", case.name);
        assert_eq!(request.header("accept"), Some("application/json"));
        assert!(
            request.header("user-agent").is_some_and(|agent| agent.contains("MeshArchiveBot")),
            "provider '{}': user agent",
            case.name
        );
        assert_eq!(request.header("authorization"), None, "providers never attach auth themselves");
    }
}

#[test]
fn success_bodies_map_to_canonical_posts_in_provider_order() {
    for case in provider_cases() {
        let page = case
            .provider
            .parse_response(&body(&case, vec![view("b"), view("a")], Some("c1")))
            .unwrap_or_else(|error| panic!("provider '{}' parse failed: {error}", case.name));

        assert_eq!(page.cursor.as_deref(), Some("c1"), "provider '{}': cursor", case.name);
        let ids = page.posts.iter().map(|post| post.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["cid-b", "cid-a"], "provider '{}': order", case.name);

        let post = &page.posts[0];
        assert_eq!(post.author.handle, "maker.bsky.social");
        assert_eq!(post.author.display_name.as_deref(), Some("Maker"));
        assert_eq!(post.body.text.as_deref(), Some("sketch b"));
        assert_eq!(post.display_timestamp(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(post.media.len(), 1, "provider '{}': images without urls are dropped", case.name);
        assert_eq!(post.media[0].alt_text.as_deref(), Some("glitch"));
        assert_eq!(post.web_url(), "https://bsky.app/profile/maker.bsky.social/post/b");
    }
}

#[test]
fn malformed_entries_never_increase_page_length() {
    let malformed = vec![
        json!("not an object"),
        json!({ "cid": "c", "author": { "handle": "h" }, "record": {} }),
        json!({ "uri": "at://x/y/z", "author": { "handle": "h" }, "record": {} }),
        json!({ "uri": "at://x/y/z", "cid": "c", "record": {} }),
        json!({ "uri": "at://x/y/z", "cid": "c", "author": {}, "record": {} }),
        json!({ "uri": "at://x/y/z", "cid": "c", "author": { "handle": "h" } }),
        json!({ "uri": "at://x/y/z", "cid": "c", "author": { "handle": "h" }, "record": "text" }),
    ];

    for case in provider_cases() {
        let mut items = malformed.clone();
        items.push(view("ok"));

        let page = case
            .provider
            .parse_response(&body(&case, items, None))
            .expect("json body parses");

        assert_eq!(page.posts.len(), 1, "provider '{}': only the valid entry survives", case.name);
        assert!(!page.has_more(), "provider '{}': no cursor means final page", case.name);
    }
}

#[test]
fn non_json_bodies_are_errors_and_wrong_shapes_are_empty_pages() {
    for case in provider_cases() {
        assert!(
            case.provider.parse_response("<!doctype html>").is_err(),
            "provider '{}': html body",
            case.name
        );

        let page = case
            .provider
            .parse_response(r#"{"unexpected": true}"#)
            .expect("json body parses");
        assert!(page.posts.is_empty());
        assert_eq!(page.cursor, None);
    }
}

#[test]
fn default_registry_puts_the_authenticated_provider_first() {
    let providers = default_providers(DEFAULT_QUERY);

    let auth = providers.iter().map(|p| p.requires_auth()).collect::<Vec<_>>();
    assert_eq!(auth, vec![true, false, false]);
}
