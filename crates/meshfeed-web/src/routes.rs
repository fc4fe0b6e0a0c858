//! HTTP routes.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /api/archive?cursor=&limit=` | One aggregated page, `{ cursor, posts }` |
//! | `GET /healthz` | Liveness probe |

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, Request};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use meshfeed_core::{FeedAggregator, PageQuery, PageSize, ARCHIVE_PATH};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<FeedAggregator>,
}

/// Raw query parameters; `limit` is parsed leniently.
#[derive(Debug, Default)]
pub struct ArchiveParams {
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

impl ArchiveParams {
    /// Picks the first `cursor` and `limit` out of the decoded pairs.
    ///
    /// Repeated keys keep their first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "cursor" if params.cursor.is_none() => params.cursor = Some(value),
                "limit" if params.limit.is_none() => params.limit = Some(value),
                _ => {}
            }
        }
        params
    }

    pub fn page_query(self) -> PageQuery {
        PageQuery::new(PageSize::from_query(self.limit.as_deref()), self.cursor)
    }
}

/// Routes without middleware.
pub fn router(aggregator: Arc<FeedAggregator>) -> Router {
    Router::new()
        .route(ARCHIVE_PATH, get(archive))
        .route("/healthz", get(healthz))
        .with_state(AppState { aggregator })
}

/// Routes wrapped in request tracing; every request gets its own id.
pub fn app(aggregator: Arc<FeedAggregator>) -> Router {
    router(aggregator).layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %request.method(),
            uri = %request.uri(),
        )
    }))
}

async fn archive(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ArchiveParams::from_pairs(pairs).page_query();
    let routed = state.aggregator.fetch_page(&query).await?;

    tracing::info!(
        provider = %routed.provider,
        attempts = routed.attempts,
        failed_providers = routed.failures.len(),
        posts = routed.page.posts.len(),
        latency_ms = routed.latency_ms,
        "archive page served"
    );

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(routed.page)))
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use meshfeed_core::{HttpResponse, ScriptedHttpClient, SearchPostsAdapter};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const PUBLIC: &str = "https://public.test/search";
    const LEGACY: &str = "https://legacy.test/search";

    fn app_with(http: Arc<ScriptedHttpClient>) -> Router {
        let aggregator = meshfeed_core::AggregatorBuilder::new()
            .with_providers(vec![
                Arc::new(SearchPostsAdapter::public(PUBLIC, "#tag")),
                Arc::new(SearchPostsAdapter::public(LEGACY, "#tag")),
            ])
            .with_http_client(http)
            .build();
        router(Arc::new(aggregator))
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let cache_control = response
            .headers()
            .get(header::CACHE_CONTROL)
            .map(|value| value.to_str().unwrap().to_owned());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, cache_control, body)
    }

    fn posts(count: usize) -> Value {
        Value::Array(
            (0..count)
                .map(|index| {
                    json!({
                        "uri": format!("at://did:plc:x/app.bsky.feed.post/{index}"),
                        "cid": format!("cid-{index}"),
                        "author": { "handle": "maker.test" },
                        "record": { "text": "sketch" }
                    })
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn archive_returns_page_marked_no_store() {
        let http = Arc::new(ScriptedHttpClient::new().with_response(
            PUBLIC,
            HttpResponse::ok_json(json!({ "posts": posts(2), "cursor": "c1" }).to_string()),
        ));

        let (status, cache_control, body) = send(app_with(http), "/api/archive").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert_eq!(body["cursor"], "c1");
        assert_eq!(body["posts"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["posts"][0]["author"]["handle"], "maker.test");
    }

    #[tokio::test]
    async fn final_page_serializes_null_cursor() {
        let http = Arc::new(ScriptedHttpClient::new().with_response(
            PUBLIC,
            HttpResponse::ok_json(json!({ "posts": [] }).to_string()),
        ));

        let (_, _, body) = send(app_with(http), "/api/archive?cursor=c9").await;

        assert_eq!(body, json!({ "cursor": null, "posts": [] }));
    }

    #[tokio::test]
    async fn limit_and_cursor_are_forwarded_after_clamping() {
        let http = Arc::new(ScriptedHttpClient::new().with_response(
            PUBLIC,
            HttpResponse::ok_json(json!({ "posts": [] }).to_string()),
        ));

        send(app_with(http.clone()), "/api/archive?limit=99&cursor=abc").await;
        send(app_with(http.clone()), "/api/archive?limit=nope").await;

        let urls = http.requests().into_iter().map(|r| r.url).collect::<Vec<_>>();
        assert!(urls[0].ends_with("limit=50&cursor=abc"));
        assert!(urls[1].ends_with("limit=30"));
    }

    #[tokio::test]
    async fn repeated_parameters_keep_their_first_value() {
        let http = Arc::new(ScriptedHttpClient::new().with_response(
            PUBLIC,
            HttpResponse::ok_json(json!({ "posts": [] }).to_string()),
        ));

        let (status, _, body) = send(app_with(http.clone()), "/api/archive?limit=10&limit=20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "cursor": null, "posts": [] }));

        let (status, _, _) = send(app_with(http.clone()), "/api/archive?cursor=a&cursor=b&limit=5").await;
        assert_eq!(status, StatusCode::OK);

        let urls = http.requests().into_iter().map(|r| r.url).collect::<Vec<_>>();
        assert!(urls[0].ends_with("limit=10"));
        assert!(urls[1].ends_with("limit=5&cursor=a"));
    }

    #[test]
    fn params_ignore_unknown_keys() {
        let params = ArchiveParams::from_pairs(vec![
            (String::from("q"), String::from("#other")),
            (String::from("limit"), String::from("7")),
        ]);

        assert_eq!(params.cursor, None);
        assert_eq!(params.limit.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn exhausted_providers_mirror_last_status() {
        let http = Arc::new(
            ScriptedHttpClient::new()
                .with_response(PUBLIC, HttpResponse::new(500, "boom"))
                .with_response(LEGACY, HttpResponse::new(503, "down")),
        );

        let (status, cache_control, body) = send(app_with(http), "/api/archive").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(cache_control, None);
        assert_eq!(body["error"], "Failed to retrieve archive posts");
        assert_eq!(
            body["details"],
            format!("provider={PUBLIC}; status=500; body=boom | provider={LEGACY}; status=503; body=down")
        );
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let app = app_with(Arc::new(ScriptedHttpClient::new()));
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
