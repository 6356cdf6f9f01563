//! AppNexus REST API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_tracing::TracingMiddleware;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthManager, AuthStrategy, CredentialsProvider, TokenCache};
use crate::config::{ClientConfig, millis};
use crate::error::{ApiError, AppNexusError};
use crate::rate_limit::{Delay, ThrottleCoordinator};
use crate::rest::endpoints::fields;
use crate::rest::response::{FatalityPolicy, classify, parse_envelope};
use crate::types::{AuthToken, ClientIdentity, TrafficClass, Values};

/// The AppNexus REST API client.
///
/// Every call is authenticated with a token from the shared [`TokenCache`],
/// reports its quota telemetry to the shared [`ThrottleCoordinator`], and is
/// checked for error envelopes before values are returned.
///
/// # Example
///
/// ```rust,no_run
/// use appnexus_api_client::rest::AppNexusClient;
/// use appnexus_api_client::auth::StaticCredentials;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let credentials = Arc::new(StaticCredentials::new("api_user", "password"));
///     let client = AppNexusClient::builder()
///         .credentials(credentials)
///         .build()?;
///
///     let advertiser = client.get("/advertiser?id=1234").await?;
///     println!("Advertiser: {:?}", advertiser);
///
///     Ok(())
/// }
/// ```
///
/// Clients that should share sessions and quota tracking are built with the
/// same cache and coordinator:
///
/// ```rust,no_run
/// use appnexus_api_client::rest::AppNexusClient;
/// use appnexus_api_client::auth::{StaticCredentials, TokenCache};
/// use appnexus_api_client::rate_limit::ThrottleCoordinator;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = Arc::new(TokenCache::new());
/// let throttle = Arc::new(ThrottleCoordinator::new());
/// let credentials = Arc::new(StaticCredentials::new("api_user", "password"));
///
/// let reporting = AppNexusClient::builder()
///     .credentials(credentials.clone())
///     .token_cache(tokens.clone())
///     .throttle(throttle.clone())
///     .build()?;
/// let trafficking = AppNexusClient::builder()
///     .credentials(credentials)
///     .token_cache(tokens)
///     .throttle(throttle)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AppNexusClient {
    http_client: ClientWithMiddleware,
    base_url: String,
    auth: AuthManager,
    token_cache: Arc<TokenCache>,
    throttle: Arc<ThrottleCoordinator>,
    delay: Delay,
    page_size: u32,
}

/// One HTTP exchange that survived the transport fatality policy.
#[derive(Debug)]
pub(crate) struct Exchange {
    pub(crate) status: StatusCode,
    pub(crate) raw: String,
    pub(crate) envelope: Option<Values>,
    pub(crate) error: Option<ApiError>,
}

impl AppNexusClient {
    /// Create a new client builder.
    pub fn builder() -> AppNexusClientBuilder {
        AppNexusClientBuilder::new()
    }

    /// The identity this client's tokens are cached under.
    pub fn identity(&self) -> ClientIdentity {
        self.auth.identity()
    }

    /// The shared token cache.
    pub fn token_cache(&self) -> &Arc<TokenCache> {
        &self.token_cache
    }

    /// The shared throttle coordinator.
    pub fn throttle(&self) -> &Arc<ThrottleCoordinator> {
        &self.throttle
    }

    /// Default page size for collection fetches.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn url(&self, uri: &str) -> String {
        if uri.starts_with('/') {
            format!("{}{}", self.base_url, uri)
        } else {
            format!("{}/{}", self.base_url, uri)
        }
    }

    /// Send one request and apply the transport fatality policy.
    ///
    /// Fatal envelope errors come back as `Err` after their side effects ran:
    /// NoAuth refreshes the cached token, `RATE_EXCEEDED` waits for the next
    /// quota period. The request itself is never resent. Non-fatal envelope
    /// errors are returned inside the [`Exchange`] for the caller to judge.
    pub(crate) async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
    ) -> Result<Exchange, AppNexusError> {
        let token = self.token_cache.get_or_authenticate(&self.auth).await?;
        let url = self.url(uri);
        let class = TrafficClass::for_method(&method);

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, token.expose());
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_string(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;
        tracing::debug!(%method, %url, status = status.as_u16(), "AppNexus response");

        let envelope = parse_envelope(&raw);
        self.throttle
            .update_from_debug_info(
                class,
                envelope.as_ref().and_then(|e| e.get(fields::DBG_INFO)),
            )
            .await;

        let error = envelope.as_ref().and_then(|e| classify(e, &raw));
        match &error {
            Some(api_error)
                if api_error.is_rate_limit()
                    || FatalityPolicy::Transport.is_fatal(api_error.kind) =>
            {
                return Err(self.handle_fatal(api_error.clone(), &token).await);
            }
            None if !status.is_success() => {
                tracing::warn!(%method, %url, status = status.as_u16(), body = %raw, "Request failed");
                return Err(AppNexusError::Transport {
                    status: status.as_u16(),
                    body: raw,
                });
            }
            _ => {}
        }

        Ok(Exchange {
            status,
            raw,
            envelope,
            error,
        })
    }

    async fn handle_fatal(&self, api_error: ApiError, token: &AuthToken) -> AppNexusError {
        let identity = self.identity();
        tracing::warn!(%identity, error = %api_error, body = %api_error.raw_response, "Fatal API error");

        if api_error.is_rate_limit() {
            let deadline = self.throttle.next_period_start().await;
            let wait = deadline.saturating_duration_since(tokio::time::Instant::now());
            tracing::warn!(
                %identity,
                wait_ms = wait.as_millis() as u64,
                "Rate limit exceeded; waiting for next quota period"
            );
            if let Err(e) = self.delay.sleep_until(deadline).await {
                return e;
            }
            return AppNexusError::RateLimitExceeded(api_error);
        }

        if api_error.is_no_auth() {
            // The rejected request is not resent; the caller retries with the new token.
            if let Err(e) = self.token_cache.refresh(&self.auth, token).await {
                tracing::error!(%identity, error = %e, "Token refresh after NoAuth failed");
            }
        }

        AppNexusError::Api(api_error)
    }
}

/// Append query parameters to a URI that may already carry some.
pub(crate) fn with_query<Q>(uri: &str, params: &Q) -> Result<String, AppNexusError>
where
    Q: serde::Serialize + ?Sized,
{
    let query_string = serde_urlencoded::to_string(params)
        .map_err(|e| AppNexusError::InvalidRequest(e.to_string()))?;
    Ok(if query_string.is_empty() {
        uri.to_string()
    } else if uri.contains('?') {
        format!("{uri}&{query_string}")
    } else {
        format!("{uri}?{query_string}")
    })
}

impl std::fmt::Debug for AppNexusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppNexusClient")
            .field("base_url", &self.base_url)
            .field("identity", &self.identity())
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Builder for [`AppNexusClient`].
pub struct AppNexusClientBuilder {
    config: ClientConfig,
    strategy: Option<AuthStrategy>,
    token_cache: Option<Arc<TokenCache>>,
    throttle: Option<Arc<ThrottleCoordinator>>,
    delay: Delay,
}

impl AppNexusClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            strategy: None,
            token_cache: None,
            throttle: None,
            delay: Delay::new(),
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Authenticate with a username and password.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.strategy = Some(AuthStrategy::credentials(credentials));
        self
    }

    /// Authenticate with an explicit strategy.
    pub fn auth_strategy(mut self, strategy: AuthStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Share a token cache with other clients.
    pub fn token_cache(mut self, cache: Arc<TokenCache>) -> Self {
        self.token_cache = Some(cache);
        self
    }

    /// Share a throttle coordinator with other clients.
    ///
    /// The coordinator's own buffer applies; [`Self::throttle_buffer`] only
    /// affects a coordinator created by the builder.
    pub fn throttle(mut self, throttle: Arc<ThrottleCoordinator>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set the maximum number of retries for transient failures.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the minimum wait between transport retries.
    pub fn retry_wait(mut self, wait: Duration) -> Self {
        self.config.retry_wait_ms = millis(wait);
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = millis(timeout).max(1);
        self
    }

    /// Set the default page size for collection fetches.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Set the wait applied after an authentication-rate limit error.
    pub fn auth_limit_penalty(mut self, penalty: Duration) -> Self {
        self.config.auth_limit_penalty_ms = millis(penalty);
        self
    }

    /// Set the slack added to each quota period.
    pub fn throttle_buffer(mut self, buffer: Duration) -> Self {
        self.config.throttle_buffer_ms = millis(buffer);
        self
    }

    /// Abort backoff waits when `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.delay = self.delay.with_cancellation(token);
        self
    }

    /// Cap every backoff wait.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.delay = self.delay.with_max_wait(max_wait);
        self
    }

    /// Use a custom delay primitive for backoff waits.
    pub fn delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    /// Build the client.
    ///
    /// Fails if no credentials were configured or the base URL is invalid.
    pub fn build(self) -> Result<AppNexusClient, AppNexusError> {
        let strategy = self.strategy.ok_or(AppNexusError::MissingCredentials)?;
        let base_url = url::Url::parse(&self.config.base_url)?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        // Build default headers.
        let mut headers = HeaderMap::new();
        let user_agent = self
            .config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("appnexus-api-client/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("appnexus-api-client"));
        headers.insert(USER_AGENT, header_value);

        // Build the HTTP client with middleware.
        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.config.timeout())
            .build()?;

        let retry_wait = self.config.retry_wait();
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(retry_wait, retry_wait.saturating_mul(8))
            .build_with_max_retries(self.config.max_retries);

        let http_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let auth = AuthManager::new(
            strategy,
            http_client.clone(),
            format!("{}{}", base_url, self.config.auth_path),
            self.config.auth_limit_penalty(),
            self.delay.clone(),
        );

        let throttle = self
            .throttle
            .unwrap_or_else(|| Arc::new(ThrottleCoordinator::with_buffer(self.config.throttle_buffer())));

        Ok(AppNexusClient {
            http_client,
            base_url,
            auth,
            token_cache: self.token_cache.unwrap_or_default(),
            throttle,
            delay: self.delay,
            page_size: self.config.page_size.max(1),
        })
    }
}

impl Default for AppNexusClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
