//! Token acquisition.
//!
//! [`AuthManager`] obtains a fresh session token from the auth endpoint using
//! the [`AuthStrategy`] chosen when the client was built. It does not cache
//! anything; storing the token is the job of [`super::TokenCache`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use rsa::RsaPrivateKey;
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::auth::signature::{load_private_key, sign_app_request};
use crate::auth::{AppCredentials, CredentialsProvider};
use crate::error::AppNexusError;
use crate::rate_limit::Delay;
use crate::rest::endpoints::fields;
use crate::rest::response::{classify, parse_envelope};
use crate::types::{AuthToken, ClientIdentity};

/// How the client proves its identity to the auth endpoint.
#[derive(Clone)]
pub enum AuthStrategy {
    /// POST a username and password.
    Credential(Arc<dyn CredentialsProvider>),
    /// GET with an RSA-signed `{epoch}|{app_user_id}` payload.
    Signed(SignedAuth),
}

impl AuthStrategy {
    /// Credential-based authentication.
    pub fn credentials(provider: Arc<dyn CredentialsProvider>) -> Self {
        Self::Credential(provider)
    }

    /// Signed-request authentication. Fails if the private key cannot be loaded.
    pub fn signed(credentials: AppCredentials) -> Result<Self, AppNexusError> {
        Ok(Self::Signed(SignedAuth::new(credentials)?))
    }

    /// The token cache key for this strategy.
    pub fn identity(&self) -> ClientIdentity {
        match self {
            Self::Credential(provider) => provider.get_credentials().identity(),
            Self::Signed(signed) => signed.credentials.identity(),
        }
    }
}

impl std::fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credential(provider) => f
                .debug_tuple("Credential")
                .field(provider.get_credentials())
                .finish(),
            Self::Signed(signed) => f.debug_tuple("Signed").field(&signed.credentials).finish(),
        }
    }
}

/// App credentials with the private key already parsed.
#[derive(Clone)]
pub struct SignedAuth {
    credentials: AppCredentials,
    key: Arc<RsaPrivateKey>,
}

impl SignedAuth {
    /// Parse the PEM key held by `credentials`.
    pub fn new(credentials: AppCredentials) -> Result<Self, AppNexusError> {
        let key = load_private_key(credentials.expose_private_key_pem())?;
        Ok(Self {
            credentials,
            key: Arc::new(key),
        })
    }

    /// Query parameters for an auth request signed at `unix_seconds`.
    pub fn query(&self, unix_seconds: i64) -> Result<Vec<(&'static str, String)>, AppNexusError> {
        let signature = sign_app_request(&self.key, unix_seconds, &self.credentials.app_user_id)?;
        Ok(vec![
            ("app_user_id", self.credentials.app_user_id.clone()),
            ("app_id", self.credentials.app_id.clone()),
            ("signature", signature),
        ])
    }
}

/// Obtains session tokens from the auth endpoint.
#[derive(Clone)]
pub struct AuthManager {
    strategy: AuthStrategy,
    http_client: ClientWithMiddleware,
    auth_url: String,
    auth_limit_penalty: Duration,
    delay: Delay,
}

impl AuthManager {
    /// Create a manager that authenticates against `auth_url`.
    pub fn new(
        strategy: AuthStrategy,
        http_client: ClientWithMiddleware,
        auth_url: impl Into<String>,
        auth_limit_penalty: Duration,
        delay: Delay,
    ) -> Self {
        Self {
            strategy,
            http_client,
            auth_url: auth_url.into(),
            auth_limit_penalty,
            delay,
        }
    }

    /// The identity tokens from this manager are cached under.
    pub fn identity(&self) -> ClientIdentity {
        self.strategy.identity()
    }

    /// Request a new token.
    ///
    /// Never returns an empty token. When the account has hit the
    /// authentication rate limit, waits for the penalty window before
    /// returning [`AppNexusError::AuthRateLimitExceeded`].
    pub async fn authenticate(&self) -> Result<AuthToken, AppNexusError> {
        let identity = self.identity();
        tracing::debug!(%identity, "Requesting new auth token");

        let response = match &self.strategy {
            AuthStrategy::Credential(provider) => {
                let creds = provider.get_credentials();
                let body = json!({
                    "auth": {
                        "username": creds.username,
                        "password": creds.expose_password(),
                    }
                });
                self.http_client
                    .post(&self.auth_url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.to_string())
                    .send()
                    .await?
            }
            AuthStrategy::Signed(signed) => {
                let now = OffsetDateTime::now_utc().unix_timestamp();
                let query = serde_urlencoded::to_string(signed.query(now)?)
                    .map_err(|e| AppNexusError::Auth(e.to_string()))?;
                let url = format!("{}?{}", self.auth_url, query);
                self.http_client.get(&url).send().await?
            }
        };

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%identity, status = status.as_u16(), body = %body, "Auth request failed");
            return Err(AppNexusError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        self.token_from_body(&identity, body).await
    }

    async fn token_from_body(
        &self,
        identity: &ClientIdentity,
        body: String,
    ) -> Result<AuthToken, AppNexusError> {
        let Some(envelope) = parse_envelope(&body) else {
            return Err(AppNexusError::ProtocolViolation {
                message: "Auth response is not a response envelope".to_string(),
                raw_response: body,
            });
        };

        if let Some(api_error) = classify(&envelope, &body) {
            tracing::warn!(%identity, error = %api_error, body = %body, "Auth rejected");
            if api_error.is_auth_rate_limit() {
                tracing::error!(
                    %identity,
                    penalty_secs = self.auth_limit_penalty.as_secs(),
                    "Authentication rate limit exceeded; backing off"
                );
                self.delay.sleep(self.auth_limit_penalty).await?;
                return Err(AppNexusError::AuthRateLimitExceeded(api_error));
            }
            return Err(AppNexusError::Api(api_error));
        }

        match envelope.get(fields::TOKEN) {
            Some(Value::String(token)) if !token.is_empty() => Ok(AuthToken::new(token.as_str())),
            _ => Err(AppNexusError::ProtocolViolation {
                message: "Auth response has no token".to_string(),
                raw_response: body,
            }),
        }
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("strategy", &self.strategy)
            .field("auth_url", &self.auth_url)
            .field("auth_limit_penalty", &self.auth_limit_penalty)
            .finish()
    }
}
