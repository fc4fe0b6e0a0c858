use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Instant;

use time::Duration;

use crate::adapters::{default_providers, DEFAULT_QUERY};
use crate::error::{ProviderFailure, TRANSPORT_FAILURE_STATUS};
use crate::http_client::{HttpAuth, HttpClient, HttpResponse, ReqwestHttpClient, DEFAULT_TIMEOUT_MS};
use crate::provider::FeedProvider;
use crate::session::{Credentials, SessionManager, DEFAULT_FALLBACK_TTL, DEFAULT_LOGIN_ENDPOINT};
use crate::{FeedError, Page, PageQuery, UpstreamError};

/// Attempts allowed per provider that needs a session.
pub const AUTH_PROVIDER_ATTEMPTS: u32 = 2;

/// Successful aggregated fetch.
#[derive(Debug, Clone)]
pub struct RouteSuccess {
    pub page: Page,
    pub provider: String,
    /// Attempts spent on the winning provider.
    pub attempts: u32,
    /// Failures recorded on higher-priority providers before the winner.
    pub failures: Vec<ProviderFailure>,
    pub latency_ms: u64,
}

pub type RouteResult = Result<RouteSuccess, UpstreamError>;

enum AttemptError {
    /// Upstream answered with a non-success status.
    Status(HttpResponse),
    /// No usable response: transport, session, or undecodable body.
    Failed(FeedError),
}

/// Ordered provider registry and the sequential failover loop.
///
/// Providers are tried in registration order. The first provider that
/// answers successfully wins, even with an empty page. Providers that need a
/// session get one immediate retry after invalidating it; there is no backoff.
pub struct FeedAggregator {
    providers: Vec<Arc<dyn FeedProvider>>,
    http_client: Arc<dyn HttpClient>,
    session: Arc<SessionManager>,
    timeout_ms: u64,
}

impl FeedAggregator {
    pub fn new(
        providers: Vec<Arc<dyn FeedProvider>>,
        http_client: Arc<dyn HttpClient>,
        session: Arc<SessionManager>,
    ) -> Self {
        Self {
            providers,
            http_client,
            session,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|provider| provider.id()).collect()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Fetches one page, failing only after every provider is exhausted.
    pub async fn fetch_page(&self, query: &PageQuery) -> RouteResult {
        let started = Instant::now();
        let mut failures = Vec::new();

        for provider in &self.providers {
            let requires_auth = provider.requires_auth();
            let max_attempts = if requires_auth { AUTH_PROVIDER_ATTEMPTS } else { 1 };
            let mut attempt = 0;

            while attempt < max_attempts {
                attempt += 1;
                let can_retry = requires_auth && attempt < max_attempts;

                match self.attempt(provider.as_ref(), query).await {
                    Ok(page) => {
                        if !failures.is_empty() {
                            tracing::info!(
                                provider = provider.id(),
                                failed = failures.len(),
                                "provider fallback succeeded"
                            );
                        }
                        tracing::debug!(
                            provider = provider.id(),
                            attempt,
                            posts = page.posts.len(),
                            has_more = page.has_more(),
                            "page fetched"
                        );
                        return Ok(RouteSuccess {
                            page,
                            provider: provider.id().to_owned(),
                            attempts: attempt,
                            failures,
                            latency_ms: elapsed_ms(started),
                        });
                    }
                    Err(AttemptError::Status(response)) => {
                        if can_retry && is_credential_status(response.status) {
                            tracing::warn!(
                                provider = provider.id(),
                                status = response.status,
                                "credential rejected; invalidating session and retrying"
                            );
                            self.session.invalidate().await;
                            continue;
                        }

                        tracing::warn!(provider = provider.id(), status = response.status, "provider failed");
                        failures.push(ProviderFailure::new(provider.id(), response.status, response.body));
                        break;
                    }
                    Err(AttemptError::Failed(error)) => {
                        if can_retry && error.invalidates_session() {
                            tracing::warn!(
                                provider = provider.id(),
                                %error,
                                "no usable response; invalidating session and retrying"
                            );
                            self.session.invalidate().await;
                            continue;
                        }

                        tracing::warn!(provider = provider.id(), %error, "provider failed");
                        failures.push(ProviderFailure::new(
                            provider.id(),
                            TRANSPORT_FAILURE_STATUS,
                            error.to_string(),
                        ));
                        break;
                    }
                }
            }
        }

        let error = UpstreamError::new(failures);
        tracing::error!(
            status = error.status(),
            latency_ms = elapsed_ms(started),
            "all providers exhausted"
        );
        Err(error)
    }

    async fn attempt(&self, provider: &dyn FeedProvider, query: &PageQuery) -> Result<Page, AttemptError> {
        let mut request = provider.build_request(query).with_timeout_ms(self.timeout_ms);

        if provider.requires_auth() {
            let session = self
                .session
                .ensure_session(self.http_client.as_ref())
                .await
                .map_err(AttemptError::Failed)?;
            request = request.with_auth(&HttpAuth::BearerToken(session.token));
        }

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AttemptError::Failed(FeedError::Transport(e.message().to_owned())))?;

        if !response.is_success() {
            return Err(AttemptError::Status(response));
        }

        provider.parse_response(&response.body).map_err(|e| {
            AttemptError::Failed(FeedError::Transport(format!("invalid response body: {e}")))
        })
    }
}

impl Debug for FeedAggregator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedAggregator")
            .field("providers", &self.provider_ids())
            .field("session", &self.session)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`FeedAggregator`].
///
/// Without overrides it registers the default providers searching for
/// `#meshArchive`, uses a reqwest transport, and carries no credentials.
///
/// ```rust,ignore
/// use meshfeed_core::AggregatorBuilder;
///
/// let aggregator = AggregatorBuilder::new()
///     .with_env_credentials()
///     .build();
/// ```
#[derive(Default)]
pub struct AggregatorBuilder {
    query: Option<String>,
    credentials: Option<Credentials>,
    login_endpoint: Option<String>,
    fallback_ttl: Option<Duration>,
    timeout_ms: Option<u64>,
    providers: Option<Vec<Arc<dyn FeedProvider>>>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl AggregatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads credentials from the environment (see [`Credentials::from_env`]).
    pub fn with_env_credentials(mut self) -> Self {
        self.credentials = Credentials::from_env();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Search query for the default providers. Ignored when providers are set explicitly.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Replaces the provider list. Order is priority order.
    pub fn with_providers(mut self, providers: Vec<Arc<dyn FeedProvider>>) -> Self {
        self.providers = Some(providers);
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_login_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.login_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_fallback_ttl(mut self, ttl: Duration) -> Self {
        self.fallback_ttl = Some(ttl);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn build(self) -> FeedAggregator {
        let query = self.query.unwrap_or_else(|| String::from(DEFAULT_QUERY));
        let providers = self.providers.unwrap_or_else(|| default_providers(&query));
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let timeout_ms = self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);

        if self.credentials.is_none() && providers.iter().any(|provider| provider.requires_auth()) {
            tracing::warn!("no credentials configured; authenticated providers will be skipped");
        }

        let session = SessionManager::new(self.credentials)
            .with_login_endpoint(
                self.login_endpoint
                    .unwrap_or_else(|| String::from(DEFAULT_LOGIN_ENDPOINT)),
            )
            .with_fallback_ttl(self.fallback_ttl.unwrap_or(DEFAULT_FALLBACK_TTL))
            .with_timeout_ms(timeout_ms);

        FeedAggregator {
            providers,
            http_client,
            session: Arc::new(session),
            timeout_ms,
        }
    }
}

/// Statuses that point at a stale or rejected credential.
fn is_credential_status(status: u16) -> bool {
    matches!(status, 401 | 403 | 404)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
