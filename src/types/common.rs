//! Common domain types for the AppNexus API.

use std::fmt;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// A JSON object as returned inside the response envelope.
pub type Values = serde_json::Map<String, serde_json::Value>;

/// Identifies the credential set a token belongs to.
///
/// This is the username for credential auth, or the app user id for signed auth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Create a new client identity.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An opaque session token issued by the auth endpoint.
///
/// Tokens are replaced on refresh, never mutated.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Get the token for use in the `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AuthToken {}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

/// Quota bucket a request is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficClass {
    /// GET requests
    Read,
    /// POST, PUT and DELETE requests
    Write,
}

impl TrafficClass {
    /// Classify an HTTP method.
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::GET {
            Self::Read
        } else {
            Self::Write
        }
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficClass::Read => write!(f, "read"),
            TrafficClass::Write => write!(f, "write"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_token_debug_redacted() {
        let token = AuthToken::new("hbapi:12345:abcdef");
        let debug_str = format!("{:?}", token);
        assert!(!debug_str.contains("abcdef"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_traffic_class_for_method() {
        assert_eq!(TrafficClass::for_method(&Method::GET), TrafficClass::Read);
        assert_eq!(TrafficClass::for_method(&Method::POST), TrafficClass::Write);
        assert_eq!(TrafficClass::for_method(&Method::PUT), TrafficClass::Write);
        assert_eq!(TrafficClass::for_method(&Method::DELETE), TrafficClass::Write);
    }

    #[test]
    fn test_client_identity_serde_transparent() {
        let identity = ClientIdentity::new("api_user");
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, "\"api_user\"");
    }
}
