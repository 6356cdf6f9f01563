//! Shared token cache.
//!
//! One cache is meant to be shared (via `Arc`) by every client in a process,
//! so that clients using the same credentials reuse a single session. Each
//! "look up, authenticate if needed, store" sequence runs under one lock, so
//! concurrent callers never authenticate the same identity twice.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::auth::AuthManager;
use crate::error::AppNexusError;
use crate::types::{AuthToken, ClientIdentity};

/// Maps client identities to their current session token.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: Mutex<HashMap<ClientIdentity, AuthToken>>,
}

impl TokenCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token for `identity`, if any.
    pub async fn get(&self, identity: &ClientIdentity) -> Option<AuthToken> {
        self.tokens.lock().await.get(identity).cloned()
    }

    /// Store a token, replacing any previous one.
    pub async fn insert(&self, identity: ClientIdentity, token: AuthToken) {
        self.tokens.lock().await.insert(identity, token);
    }

    /// Drop the token for `identity`.
    pub async fn invalidate(&self, identity: &ClientIdentity) -> Option<AuthToken> {
        self.tokens.lock().await.remove(identity)
    }

    /// Number of cached tokens.
    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }

    /// Return the cached token for the manager's identity, authenticating first
    /// if there is none.
    pub async fn get_or_authenticate(&self, auth: &AuthManager) -> Result<AuthToken, AppNexusError> {
        let identity = auth.identity();
        let mut tokens = self.tokens.lock().await;

        if let Some(token) = tokens.get(&identity) {
            return Ok(token.clone());
        }

        let token = auth.authenticate().await?;
        tracing::debug!(%identity, "Cached new auth token");
        tokens.insert(identity, token.clone());
        Ok(token)
    }

    /// Replace a token the server rejected.
    ///
    /// If the cached token already differs from `rejected`, another caller
    /// refreshed it in the meantime and that token is returned as is.
    /// Otherwise the entry is removed and a new token is obtained. On failure
    /// the entry stays empty so the next call authenticates again.
    pub async fn refresh(
        &self,
        auth: &AuthManager,
        rejected: &AuthToken,
    ) -> Result<AuthToken, AppNexusError> {
        let identity = auth.identity();
        let mut tokens = self.tokens.lock().await;

        match tokens.get(&identity) {
            Some(current) if current != rejected => return Ok(current.clone()),
            _ => {
                tokens.remove(&identity);
            }
        }

        let token = auth.authenticate().await?;
        tracing::info!(%identity, "Refreshed auth token");
        tokens.insert(identity, token.clone());
        Ok(token)
    }
}
