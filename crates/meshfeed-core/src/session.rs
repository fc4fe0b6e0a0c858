//! Bearer session cache for authenticated providers.
//!
//! Exactly one session is held process-wide. The slot sits behind an async
//! mutex that stays locked across the login call, so `ensure_session` and
//! `invalidate` are serialized and a refresh cannot be clobbered halfway.

use std::env;
use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::domain::parse_timestamp;
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::FeedError;

/// Login endpoint on the entryway PDS.
pub const DEFAULT_LOGIN_ENDPOINT: &str = "https://bsky.social/xrpc/com.atproto.server.createSession";

/// Lifetime assumed when the login response carries no expiry.
pub const DEFAULT_FALLBACK_TTL: Duration = Duration::minutes(30);

const IDENTIFIER_VARS: [&str; 2] = ["MESHFEED_BLUESKY_IDENTIFIER", "BLUESKY_IDENTIFIER"];
const SECRET_VARS: [&str; 2] = ["MESHFEED_BLUESKY_APP_PASSWORD", "BLUESKY_APP_PASSWORD"];

/// Account identity and app password used to log in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Reads credentials from the environment.
    ///
    /// | Value | Primary | Fallback |
    /// |-------|---------|----------|
    /// | identifier | `MESHFEED_BLUESKY_IDENTIFIER` | `BLUESKY_IDENTIFIER` |
    /// | app password | `MESHFEED_BLUESKY_APP_PASSWORD` | `BLUESKY_APP_PASSWORD` |
    ///
    /// Returns `None` unless both values are present and non-empty.
    pub fn from_env() -> Option<Self> {
        let identifier = first_env(&IDENTIFIER_VARS)?;
        let secret = first_env(&SECRET_VARS)?;
        Some(Self::new(identifier, secret))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
}

/// Cached bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub subject_id: String,
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Valid strictly before the expiry instant; there is no early-refresh margin.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("subject_id", &self.subject_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessJwt", alias = "accessToken")]
    access_jwt: String,
    #[serde(rename = "did", alias = "subjectId")]
    did: String,
    #[serde(rename = "expiresAt", default)]
    expires_at: Option<String>,
}

/// Obtains, caches and invalidates the shared session.
pub struct SessionManager {
    credentials: Option<Credentials>,
    login_endpoint: String,
    fallback_ttl: Duration,
    timeout_ms: u64,
    slot: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            login_endpoint: String::from(DEFAULT_LOGIN_ENDPOINT),
            fallback_ttl: DEFAULT_FALLBACK_TTL,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            slot: Mutex::new(None),
        }
    }

    pub fn with_login_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.login_endpoint = endpoint.into();
        self
    }

    pub fn with_fallback_ttl(mut self, ttl: Duration) -> Self {
        self.fallback_ttl = ttl;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Returns the cached session while valid, otherwise logs in.
    ///
    /// Fails with [`FeedError::Configuration`] when no credentials are set and
    /// with [`FeedError::Auth`] when the login call is rejected; a rejected
    /// login leaves the slot empty.
    pub async fn ensure_session(&self, http: &dyn HttpClient) -> Result<Session, FeedError> {
        let Some(credentials) = &self.credentials else {
            return Err(FeedError::Configuration(format!(
                "Missing {} or {} environment variables",
                IDENTIFIER_VARS[1], SECRET_VARS[1]
            )));
        };

        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.as_ref() {
            if session.is_valid_at(OffsetDateTime::now_utc()) {
                tracing::trace!("reusing cached session");
                return Ok(session.clone());
            }
            tracing::debug!("cached session expired");
        }

        match self.login(credentials, http).await {
            Ok(session) => {
                tracing::info!(
                    subject = %session.subject_id,
                    expires_at = %session.expires_at,
                    "session created"
                );
                *slot = Some(session.clone());
                Ok(session)
            }
            Err(error) => {
                tracing::warn!(%error, "session creation failed");
                *slot = None;
                Err(error)
            }
        }
    }

    /// Clears the cached session. Idempotent.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            tracing::debug!("session invalidated");
        }
    }

    pub async fn cached(&self) -> Option<Session> {
        self.slot.lock().await.clone()
    }

    async fn login(&self, credentials: &Credentials, http: &dyn HttpClient) -> Result<Session, FeedError> {
        let payload = serde_json::to_string(&LoginRequest {
            identifier: &credentials.identifier,
            password: &credentials.secret,
        })
        .map_err(|e| FeedError::Transport(format!("failed to encode login request: {e}")))?;

        let request = HttpRequest::post_json(&self.login_endpoint, payload).with_timeout_ms(self.timeout_ms);
        let response = http
            .execute(request)
            .await
            .map_err(|e| FeedError::Transport(format!("login transport error: {}", e.message())))?;

        if !response.is_success() {
            return Err(FeedError::Auth {
                status: response.status,
                details: response.body,
            });
        }

        let login: LoginResponse = serde_json::from_str(&response.body)
            .map_err(|e| FeedError::Transport(format!("invalid session response: {e}")))?;

        let now = OffsetDateTime::now_utc();
        let expires_at = login
            .expires_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now + self.fallback_ttl);

        Ok(Session {
            token: login.access_jwt,
            subject_id: login.did,
            expires_at,
        })
    }
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("credentials", &self.credentials)
            .field("login_endpoint", &self.login_endpoint)
            .field("fallback_ttl", &self.fallback_ttl)
            .finish_non_exhaustive()
    }
}
