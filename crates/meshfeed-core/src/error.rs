use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Maximum number of characters of an upstream body kept in failure details.
pub const BODY_PREFIX_CHARS: usize = 200;

/// Separator between provider entries in [`UpstreamError::details`].
pub const DETAILS_DELIMITER: &str = " | ";

/// Status reported when no provider produced an HTTP status at all.
pub const TRANSPORT_FAILURE_STATUS: u16 = 502;

/// Invariant violations on canonical domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("post uri cannot be empty")]
    EmptyUri,
    #[error("post id cannot be empty")]
    EmptyId,
    #[error("author handle cannot be empty")]
    EmptyHandle,
}

/// Top-level error type for feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Credential inputs are missing. Not retried.
    #[error("{0}")]
    Configuration(String),

    /// Upstream rejected the login call.
    #[error("session creation failed ({status}): {details}")]
    Auth { status: u16, details: String },

    /// No usable response was received.
    #[error("{0}")]
    Transport(String),

    /// Every provider was exhausted.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl FeedError {
    /// Whether an authenticated provider should drop its session and try again.
    pub const fn invalidates_session(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Transport(_))
    }
}

/// One recorded provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub status: u16,
    pub body: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }
}

impl Display for ProviderFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "provider={}; status={}; body={}",
            self.provider,
            self.status,
            truncate(&self.body, BODY_PREFIX_CHARS)
        )
    }
}

/// Aggregate failure after every provider has been tried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct UpstreamError {
    failures: Vec<ProviderFailure>,
}

impl Display for UpstreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "all providers failed: {}", self.details())
    }
}

impl UpstreamError {
    pub fn new(failures: Vec<ProviderFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    /// Status of the last recorded failure, or 502 when nothing was recorded.
    pub fn status(&self) -> u16 {
        self.failures
            .last()
            .map(|failure| failure.status)
            .unwrap_or(TRANSPORT_FAILURE_STATUS)
    }

    /// Every failure rendered in provider order, joined by [`DETAILS_DELIMITER`].
    pub fn details(&self) -> String {
        self.failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(DETAILS_DELIMITER)
    }
}

/// Cuts `value` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}…", &value[..byte_index]),
        None => value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_join_failures_in_order() {
        let error = UpstreamError::new(vec![
            ProviderFailure::new("A", 502, "bad gateway"),
            ProviderFailure::new("B", 500, "boom"),
            ProviderFailure::new("C", 503, "down"),
        ]);

        assert_eq!(
            error.details(),
            "provider=A; status=502; body=bad gateway | provider=B; status=500; body=boom | provider=C; status=503; body=down"
        );
        assert_eq!(error.status(), 503);
    }

    #[test]
    fn empty_failure_list_reports_bad_gateway() {
        assert_eq!(UpstreamError::default().status(), 502);
        assert_eq!(UpstreamError::default().details(), "");
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundaries() {
        let body = "é".repeat(250);
        let rendered = ProviderFailure::new("A", 500, body).to_string();
        let kept = rendered.trim_start_matches("provider=A; status=500; body=");

        assert_eq!(kept.chars().count(), BODY_PREFIX_CHARS + 1);
        assert!(kept.ends_with('…'));
    }

    #[test]
    fn short_bodies_are_kept_verbatim() {
        assert_eq!(truncate("short", 200), "short");
        assert_eq!(truncate(&"x".repeat(200), 200), "x".repeat(200));
    }

    #[test]
    fn only_auth_and_transport_errors_invalidate_sessions() {
        assert!(FeedError::Transport(String::from("reset")).invalidates_session());
        assert!(FeedError::Auth {
            status: 401,
            details: String::new()
        }
        .invalidates_session());
        assert!(!FeedError::Configuration(String::from("missing")).invalidates_session());
    }
}
