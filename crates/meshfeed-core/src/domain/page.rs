use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::Post;

/// One response unit: posts in provider order plus an opaque continuation cursor.
///
/// `cursor == None` means the provider has no further pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub cursor: Option<String>,
    #[serde(default)]
    pub posts: Vec<Post>,
}

impl Page {
    pub fn new(posts: Vec<Post>, cursor: Option<String>) -> Self {
        Self { cursor, posts }
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }
}

/// Page size requested from upstream, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageSize(u8);

impl PageSize {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 50;
    pub const DEFAULT: Self = Self(30);

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u8)
    }

    /// Parses a raw `limit` query value.
    ///
    /// Reads the leading integer (`"12abc"` is 12) and clamps it. Missing or
    /// non-numeric input yields [`PageSize::DEFAULT`].
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.and_then(leading_integer)
            .map(Self::clamped)
            .unwrap_or(Self::DEFAULT)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for PageSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters of a single page fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: PageSize,
    pub cursor: Option<String>,
}

impl PageQuery {
    pub fn new(limit: PageSize, cursor: Option<String>) -> Self {
        // An empty cursor is the same as no cursor.
        let cursor = cursor.filter(|value| !value.is_empty());
        Self { limit, cursor }
    }

    pub fn first(limit: PageSize) -> Self {
        Self::new(limit, None)
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digit_count = digits.bytes().take_while(u8::is_ascii_digit).count();
    if digit_count == 0 {
        return None;
    }

    // Overlong digit runs saturate instead of failing; the caller clamps anyway.
    let magnitude = digits[..digit_count].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
