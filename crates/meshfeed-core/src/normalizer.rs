//! Defensive coercion of upstream payloads into [`Post`].
//!
//! Nothing about the upstream schema is trusted: every field is checked for
//! presence and type before use. A payload that fails is reported as
//! [`Normalized::Rejected`] and dropped from its page by
//! [`normalize_batch`]; rejection never fails the batch.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{Author, MediaItem, Post, PostBody, ValidationError};

/// The one embed kind whose media is extracted. Post views from the AppView
/// carry the same kind with a `#view` suffix.
const IMAGES_EMBED: &str = "app.bsky.embed.images";
const IMAGES_EMBED_VIEW: &str = "app.bsky.embed.images#view";

/// Which raw layout a payload uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawShape {
    /// Post fields at the top level.
    View,
    /// Search hit exposing the view under `post` or `value`.
    Hit,
}

/// Why a payload did not become a post.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("payload is not an object")]
    NotAnObject,
    #[error("missing or non-string 'uri'")]
    MissingUri,
    #[error("missing or non-string 'cid'")]
    MissingId,
    #[error("missing or non-object 'author'")]
    MissingAuthor,
    #[error("missing or non-string 'author.handle'")]
    MissingHandle,
    #[error("missing or non-object 'record'")]
    MissingRecord,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Outcome of normalizing one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Valid(Post),
    Rejected(RejectReason),
}

impl Normalized {
    pub fn into_post(self) -> Option<Post> {
        match self {
            Self::Valid(post) => Some(post),
            Self::Rejected(_) => None,
        }
    }

    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Normalizes a payload of the given shape.
pub fn normalize(raw: &Value, shape: RawShape) -> Normalized {
    let view = match shape {
        RawShape::View => raw,
        RawShape::Hit => unwrap_hit(raw),
    };

    match normalize_view(view) {
        Ok(post) => Normalized::Valid(post),
        Err(reason) => Normalized::Rejected(reason),
    }
}

/// Normalizes every element, keeping valid posts in their original order.
pub fn normalize_batch<'a, I>(raw: I, shape: RawShape) -> Vec<Post>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut rejected = 0_usize;
    let posts = raw
        .into_iter()
        .filter_map(|value| match normalize(value, shape) {
            Normalized::Valid(post) => Some(post),
            Normalized::Rejected(reason) => {
                rejected += 1;
                tracing::trace!(%reason, "dropping malformed post");
                None
            }
        })
        .collect::<Vec<_>>();

    if rejected > 0 {
        tracing::debug!(rejected, kept = posts.len(), "dropped malformed posts from batch");
    }

    posts
}

fn unwrap_hit(hit: &Value) -> &Value {
    let Some(object) = hit.as_object() else {
        return hit;
    };

    present(object, "post")
        .or_else(|| present(object, "value"))
        .unwrap_or(hit)
}

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

fn normalize_view(raw: &Value) -> Result<Post, RejectReason> {
    let data = raw.as_object().ok_or(RejectReason::NotAnObject)?;

    let uri = string_field(data, "uri").ok_or(RejectReason::MissingUri)?;
    let id = string_field(data, "cid").ok_or(RejectReason::MissingId)?;

    let author = data
        .get("author")
        .and_then(Value::as_object)
        .ok_or(RejectReason::MissingAuthor)?;
    let handle = string_field(author, "handle").ok_or(RejectReason::MissingHandle)?;

    let record = data
        .get("record")
        .and_then(Value::as_object)
        .ok_or(RejectReason::MissingRecord)?;

    let post = Post {
        uri: uri.to_owned(),
        id: id.to_owned(),
        author: Author {
            handle: handle.to_owned(),
            display_name: string_field(author, "displayName").map(str::to_owned),
            avatar_url: string_field(author, "avatar").map(str::to_owned),
        },
        body: PostBody {
            text: string_field(record, "text").map(str::to_owned),
            created_at: string_field(record, "createdAt").map(str::to_owned),
        },
        media: extract_media(data.get("embed")),
        indexed_at: string_field(data, "indexedAt").map(str::to_owned),
    };

    post.validate()?;
    Ok(post)
}

fn extract_media(embed: Option<&Value>) -> Vec<MediaItem> {
    let Some(embed) = embed.and_then(Value::as_object) else {
        return Vec::new();
    };

    let is_images = matches!(
        string_field(embed, "$type"),
        Some(IMAGES_EMBED) | Some(IMAGES_EMBED_VIEW)
    );
    if !is_images {
        return Vec::new();
    }

    let Some(images) = embed.get("images").and_then(Value::as_array) else {
        return Vec::new();
    };

    images
        .iter()
        .filter_map(Value::as_object)
        .map(|image| MediaItem {
            thumbnail_url: string_field(image, "thumb").map(str::to_owned),
            full_url: string_field(image, "fullsize").map(str::to_owned),
            alt_text: string_field(image, "alt").map(str::to_owned),
        })
        .filter(|item| item.thumbnail_url.is_some() || item.full_url.is_some())
        .collect()
}

fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}
