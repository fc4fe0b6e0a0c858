//! # Meshfeed Core
//!
//! Aggregation, normalization and paginated consumption of a tag-filtered
//! social feed.
//!
//! ## Overview
//!
//! - **Canonical domain models** for posts, authors, media and pages
//! - **Normalizer** turning arbitrary upstream payloads into posts
//! - **Provider trait** with one adapter per upstream search API
//! - **Session manager** caching the bearer credential for authenticated providers
//! - **Aggregator** trying providers in priority order until one succeeds
//! - **Feed consumer** state machine with halt-on-failure backpressure
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (searchPosts lexicon, search API) |
//! | [`consumer`] | Paginated feed consumer and page fetchers |
//! | [`domain`] | Domain models (Post, Page, PageSize) |
//! | [`error`] | Error taxonomy and failure details |
//! | [`http_client`] | HTTP client abstraction |
//! | [`normalizer`] | Raw payload to [`Post`] conversion |
//! | [`provider`] | Provider contract |
//! | [`routing`] | Aggregator and its builder |
//! | [`session`] | Credentials and session cache |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meshfeed_core::{AggregatorBuilder, PageQuery, PageSize};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let aggregator = AggregatorBuilder::new().with_env_credentials().build();
//!
//!     let routed = aggregator.fetch_page(&PageQuery::first(PageSize::DEFAULT)).await?;
//!     for post in &routed.page.posts {
//!         println!("{} {}", post.author.label(), post.web_url());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Feed Consumer  │────▶│  Page Fetcher    │
//! └─────────────────┘     └────────┬─────────┘
//!                                  │
//!                                  ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Session Manager │◀────│  Aggregator      │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ HTTP Client     │◀────│ Feed Provider    │
//! │ (reqwest/test)  │     │ + Normalizer     │
//! └─────────────────┘     └──────────────────┘
//! ```

pub mod adapters;
pub mod consumer;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod normalizer;
pub mod provider;
pub mod routing;
pub mod session;

pub use adapters::{default_providers, SearchApiAdapter, SearchPostsAdapter, DEFAULT_QUERY};
pub use consumer::{
    ConsumerPhase, FeedConsumer, FetchError, FetchFuture, HttpPageFetcher, PageFetcher,
    PendingLoad, Trigger, ARCHIVE_PATH,
};
pub use domain::{
    parse_timestamp, relative_time, Author, MediaItem, Page, PageQuery, PageSize, Post, PostBody,
    SEARCH_FALLBACK_URL,
};
pub use error::{FeedError, ProviderFailure, UpstreamError, ValidationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use normalizer::{normalize, normalize_batch, Normalized, RawShape, RejectReason};
pub use provider::FeedProvider;
pub use routing::{AggregatorBuilder, FeedAggregator, RouteResult, RouteSuccess};
pub use session::{Credentials, Session, SessionManager};
