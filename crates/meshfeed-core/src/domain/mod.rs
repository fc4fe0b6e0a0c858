//! # Domain Models
//!
//! Canonical content types served by the aggregator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Post`] | One normalized unit of content |
//! | [`Author`] | Post author identity |
//! | [`PostBody`] | Text and creation time |
//! | [`MediaItem`] | One attached image, in display order |
//! | [`Page`] | Ordered posts plus continuation cursor |
//! | [`PageSize`] | Page size clamped to `1..=50` |
//! | [`PageQuery`] | Page size and optional cursor for one fetch |
//!
//! Posts are kept in the order a provider returned them. Nothing in this
//! module reorders or deduplicates.

mod page;
mod post;
mod timestamp;

pub use page::{Page, PageQuery, PageSize};
pub use post::{Author, MediaItem, Post, PostBody, SEARCH_FALLBACK_URL};
pub use timestamp::{parse_timestamp, relative_time};
