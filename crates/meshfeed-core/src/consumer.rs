//! Paginated feed consumer.
//!
//! [`FeedConsumer`] is the client-side state machine over `{idle, loading,
//! halted}`. It accumulates posts across pages, allows one request in flight
//! and latches automatic pagination off after an automatic failure until a
//! manual retry succeeds.
//!
//! Loading is split into [`FeedConsumer::begin`] and
//! [`FeedConsumer::complete`] so a UI loop can dispatch the fetch itself.
//! [`FeedConsumer::load_more`] runs both halves against a [`PageFetcher`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::http_client::{HttpClient, HttpRequest};
use crate::routing::FeedAggregator;
use crate::{Page, PageQuery, PageSize, Post, UpstreamError};

/// Path of the feed query endpoint served by the web surface.
pub const ARCHIVE_PATH: &str = "/api/archive";

/// What asked for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// First display of the feed. Honoured once.
    Mount,
    /// The reader is close to the end of the rendered list.
    Proximity,
    /// Explicit retry action.
    ManualRetry,
}

impl Trigger {
    pub const fn is_automatic(self) -> bool {
        !matches!(self, Self::ManualRetry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerPhase {
    Idle,
    Loading,
    Halted,
}

/// Failure reported by a [`PageFetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed with {0}")]
    Status(u16),

    #[error("{0}")]
    Transport(String),

    #[error("invalid feed response: {0}")]
    Decode(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Page, FetchError>> + Send + 'a>>;

/// Source of pages for a [`FeedConsumer`].
pub trait PageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, query: PageQuery) -> FetchFuture<'a>;
}

/// A started load. Hand it back to [`FeedConsumer::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub request_id: u64,
    pub trigger: Trigger,
    pub limit: PageSize,
    pub cursor: Option<String>,
}

impl PendingLoad {
    pub fn query(&self) -> PageQuery {
        PageQuery::new(self.limit, self.cursor.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FeedConsumer {
    limit: PageSize,
    posts: Vec<Post>,
    cursor: Option<String>,
    has_more: bool,
    initialized: bool,
    mounted: bool,
    in_flight: Option<u64>,
    last_request_id: u64,
    last_error: Option<String>,
    auto_fetch_halted: bool,
}

impl Default for FeedConsumer {
    fn default() -> Self {
        Self::new(PageSize::DEFAULT)
    }
}

impl FeedConsumer {
    pub fn new(limit: PageSize) -> Self {
        Self {
            limit,
            posts: Vec::new(),
            cursor: None,
            has_more: true,
            initialized: false,
            mounted: false,
            in_flight: None,
            last_request_id: 0,
            last_error: None,
            auto_fetch_halted: false,
        }
    }

    /// Starts a load for `trigger`, or returns `None` when the trigger is a no-op.
    ///
    /// No-ops: a load is already in flight, the feed has ended, a second
    /// mount, or an automatic trigger while halted.
    pub fn begin(&mut self, trigger: Trigger) -> Option<PendingLoad> {
        if let Some(request_id) = self.in_flight {
            tracing::trace!(?trigger, request_id, "load in flight; trigger ignored");
            return None;
        }
        if self.initialized && !self.has_more {
            tracing::trace!(?trigger, "feed exhausted; trigger ignored");
            return None;
        }
        if trigger == Trigger::Mount {
            if self.mounted {
                return None;
            }
            self.mounted = true;
        }
        if trigger.is_automatic() && self.auto_fetch_halted {
            tracing::debug!(?trigger, "automatic fetch halted; trigger ignored");
            return None;
        }

        self.last_request_id += 1;
        self.in_flight = Some(self.last_request_id);
        self.last_error = None;

        Some(PendingLoad {
            request_id: self.last_request_id,
            trigger,
            limit: self.limit,
            cursor: self.cursor.clone(),
        })
    }

    /// Applies the outcome of `load`. Returns `false` when the load was
    /// superseded and its outcome discarded.
    pub fn complete(&mut self, load: PendingLoad, outcome: Result<Page, FetchError>) -> bool {
        if self.in_flight != Some(load.request_id) {
            tracing::debug!(request_id = load.request_id, "stale load completion discarded");
            return false;
        }

        self.in_flight = None;
        self.initialized = true;

        match outcome {
            Ok(page) => {
                tracing::debug!(
                    request_id = load.request_id,
                    posts = page.posts.len(),
                    has_more = page.has_more(),
                    "page appended"
                );
                self.posts.extend(page.posts);
                self.has_more = page.cursor.is_some();
                self.cursor = page.cursor;
                if !load.trigger.is_automatic() {
                    self.auto_fetch_halted = false;
                }
            }
            Err(error) => {
                tracing::warn!(request_id = load.request_id, %error, "page load failed");
                self.last_error = Some(error.to_string());
                if load.trigger.is_automatic() {
                    self.auto_fetch_halted = true;
                }
            }
        }
        true
    }

    /// Gives up on the load in flight so a new trigger can start.
    ///
    /// A late completion for the abandoned request is discarded.
    pub fn abandon(&mut self) -> Option<u64> {
        self.in_flight.take()
    }

    /// Runs [`begin`](Self::begin), the fetch and [`complete`](Self::complete).
    ///
    /// Returns whether a fetch was issued and its outcome applied.
    pub async fn load_more<F>(&mut self, trigger: Trigger, fetcher: &F) -> bool
    where
        F: PageFetcher + ?Sized,
    {
        let Some(load) = self.begin(trigger) else {
            return false;
        };
        let outcome = fetcher.fetch(load.query()).await;
        self.complete(load, outcome)
    }

    pub fn phase(&self) -> ConsumerPhase {
        if self.in_flight.is_some() {
            ConsumerPhase::Loading
        } else if self.auto_fetch_halted {
            ConsumerPhase::Halted
        } else {
            ConsumerPhase::Idle
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// At least one load finished and upstream reported no further pages.
    pub fn is_exhausted(&self) -> bool {
        self.initialized && !self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn auto_fetch_halted(&self) -> bool {
        self.auto_fetch_halted
    }
}

/// Fetches pages from a running web surface over HTTP.
pub struct HttpPageFetcher {
    base_url: String,
    http_client: Arc<dyn HttpClient>,
}

impl HttpPageFetcher {
    pub fn new(base_url: impl Into<String>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client,
        }
    }

    fn url_for(&self, query: &PageQuery) -> String {
        let mut url = format!(
            "{}{}?limit={}",
            self.base_url.trim_end_matches('/'),
            ARCHIVE_PATH,
            query.limit
        );
        if let Some(cursor) = &query.cursor {
            url.push_str("&cursor=");
            url.push_str(&urlencoding::encode(cursor));
        }
        url
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch<'a>(&'a self, query: PageQuery) -> FetchFuture<'a> {
        Box::pin(async move {
            let response = self
                .http_client
                .execute(HttpRequest::get(self.url_for(&query)))
                .await
                .map_err(|e| FetchError::Transport(e.message().to_owned()))?;

            if !response.is_success() {
                return Err(FetchError::Status(response.status));
            }

            let wire = serde_json::from_str::<WirePage>(&response.body)
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            Ok(wire.into_page())
        })
    }
}

impl PageFetcher for FeedAggregator {
    fn fetch<'a>(&'a self, query: PageQuery) -> FetchFuture<'a> {
        Box::pin(async move {
            let routed = self.fetch_page(&query).await?;
            Ok(routed.page)
        })
    }
}

/// Feed query response as received; posts are rechecked before use.
#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    cursor: Value,
    #[serde(default)]
    posts: Value,
}

impl WirePage {
    fn into_page(self) -> Page {
        let cursor = self.cursor.as_str().map(str::to_owned);
        let posts = match self.posts {
            Value::Array(items) => items.into_iter().filter_map(revalidate).collect(),
            _ => Vec::new(),
        };
        Page::new(posts, cursor)
    }
}

fn revalidate(raw: Value) -> Option<Post> {
    let post = serde_json::from_value::<Post>(raw).ok()?;
    post.validate().ok()?;
    Some(post)
}
