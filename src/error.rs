//! Error types for the AppNexus client library.

use std::fmt;

use thiserror::Error;

/// The main error type for all AppNexus client operations.
#[derive(Error, Debug)]
pub enum AppNexusError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// The server answered with a non-success status and no error envelope
    #[error("HTTP {status}: {body}")]
    Transport {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// AppNexus returned an error envelope
    #[error("AppNexus API error: {0}")]
    Api(ApiError),

    /// The request quota for the current period was exhausted
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(ApiError),

    /// Too many authentication attempts for this account
    #[error("Authentication rate limit exceeded: {0}")]
    AuthRateLimitExceeded(ApiError),

    /// The server answered successfully but broke the wire contract
    #[error("Protocol violation: {message}")]
    ProtocolViolation {
        /// What was missing or malformed
        message: String,
        /// Raw response body
        raw_response: String,
    },

    /// Local authentication failure (key loading, signing)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A request could not be built from the given parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A wait was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing required credentials
    #[error("Missing credentials: username/password or app id and private key required")]
    MissingCredentials,
}

impl AppNexusError {
    /// The classified error envelope, if this error came from one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) | Self::RateLimitExceeded(e) | Self::AuthRateLimitExceeded(e) => Some(e),
            _ => None,
        }
    }

    /// The remote error kind, if this error came from an error envelope.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.api_error().map(|e| e.kind)
    }

    /// The remote error code, if any.
    pub fn code(&self) -> Option<&str> {
        self.api_error().and_then(|e| e.code.as_deref())
    }

    /// The remote error message, if any.
    pub fn message(&self) -> Option<&str> {
        self.api_error().map(|e| e.message.as_str())
    }

    /// The raw response body that produced this error, if one was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Api(e) | Self::RateLimitExceeded(e) | Self::AuthRateLimitExceeded(e) => {
                Some(e.raw_response.as_str())
            }
            Self::Transport { body, .. } => Some(body.as_str()),
            Self::ProtocolViolation { raw_response, .. } => Some(raw_response.as_str()),
            _ => None,
        }
    }

    /// Whether the failure happened below the API envelope (network, status, middleware).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::HttpMiddleware(_) | Self::Transport { .. }
        )
    }
}

/// Error classification used by AppNexus in the `error_id` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unrecognized or missing error id
    Unknown,
    /// Missing, invalid or expired credentials
    NoAuth,
    /// Authenticated but not allowed to perform the action
    UnAuth,
    /// Malformed request
    Syntax,
    /// Server-side fault, including rate limiting
    System,
    /// The request would violate a server-side invariant
    Integrity,
}

impl ErrorKind {
    /// Map an `error_id` string to a kind. Unrecognized ids map to [`ErrorKind::Unknown`].
    pub fn from_error_id(id: &str) -> Self {
        match id.trim().to_ascii_uppercase().as_str() {
            "NOAUTH" => Self::NoAuth,
            "UNAUTH" => Self::UnAuth,
            "SYNTAX" => Self::Syntax,
            "SYSTEM" => Self::System,
            "INTEGRITY" => Self::Integrity,
            _ => Self::Unknown,
        }
    }

    /// The wire identifier for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::NoAuth => "NOAUTH",
            Self::UnAuth => "UNAUTH",
            Self::Syntax => "SYNTAX",
            Self::System => "SYSTEM",
            Self::Integrity => "INTEGRITY",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error envelope returned by the AppNexus API.
///
/// Parsed once per failed response and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Classification from `error_id`
    pub kind: ErrorKind,
    /// Finer-grained code from `error_code` (e.g. `RATE_EXCEEDED`)
    pub code: Option<String>,
    /// Human-readable message from `error`
    pub message: String,
    /// The response body the error was parsed from
    pub raw_response: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl ApiError {
    /// Create a new API error.
    pub fn new(
        kind: ErrorKind,
        code: Option<String>,
        message: impl Into<String>,
        raw_response: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            raw_response: raw_response.into(),
        }
    }

    /// Check if this is a request-rate limit error.
    pub fn is_rate_limit(&self) -> bool {
        self.code.as_deref() == Some(error_codes::RATE_EXCEEDED)
    }

    /// Check if this is an authentication-rate limit error.
    pub fn is_auth_rate_limit(&self) -> bool {
        self.code.as_deref() == Some(error_codes::NOAUTH_EXCEEDED)
    }

    /// Check if the credentials were missing, invalid or expired.
    pub fn is_no_auth(&self) -> bool {
        self.kind == ErrorKind::NoAuth
    }
}

/// Known AppNexus error codes.
pub mod error_codes {
    /// Read or write quota for the current period exhausted.
    pub const RATE_EXCEEDED: &str = "RATE_EXCEEDED";
    /// Too many authentication requests for this account.
    pub const NOAUTH_EXCEEDED: &str = "NOAUTH_EXCEEDED";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_from_id() {
        assert_eq!(ErrorKind::from_error_id("NOAUTH"), ErrorKind::NoAuth);
        assert_eq!(ErrorKind::from_error_id("unauth"), ErrorKind::UnAuth);
        assert_eq!(ErrorKind::from_error_id("INTEGRITY"), ErrorKind::Integrity);
        assert_eq!(ErrorKind::from_error_id("SOMETHING_NEW"), ErrorKind::Unknown);
        assert_eq!(ErrorKind::from_error_id(""), ErrorKind::Unknown);
    }

    #[test]
    fn test_api_error_display() {
        let error = ApiError::new(
            ErrorKind::System,
            Some("RATE_EXCEEDED".into()),
            "You have exceeded your request limit",
            "{}",
        );
        assert_eq!(
            error.to_string(),
            "SYSTEM (RATE_EXCEEDED): You have exceeded your request limit"
        );
        assert!(error.is_rate_limit());
    }

    #[test]
    fn test_accessors_on_transport_error() {
        let error = AppNexusError::Transport {
            status: 502,
            body: "bad gateway".into(),
        };
        assert!(error.is_transport());
        assert_eq!(error.kind(), None);
        assert_eq!(error.raw_response(), Some("bad gateway"));
    }

    #[test]
    fn test_accessors_on_api_error() {
        let error = AppNexusError::Api(ApiError::new(
            ErrorKind::Integrity,
            None,
            "duplicate code",
            "{\"response\":{}}",
        ));
        assert_eq!(error.kind(), Some(ErrorKind::Integrity));
        assert_eq!(error.code(), None);
        assert_eq!(error.message(), Some("duplicate code"));
        assert!(!error.is_transport());
    }
}
