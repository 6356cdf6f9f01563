//! Authentication module for the AppNexus API.
//!
//! This module provides:
//! - Credential management with secure secret storage
//! - Two token strategies: username/password and RSA-signed app requests
//! - A shared token cache keyed by client identity

mod credentials;
mod manager;
mod signature;
mod token_cache;

pub use credentials::{
    AppCredentials, Credentials, CredentialsProvider, EnvCredentials, StaticCredentials,
};
pub use manager::{AuthManager, AuthStrategy, SignedAuth};
pub use signature::{load_private_key, sign_app_request, signature_payload};
pub use token_cache::TokenCache;
