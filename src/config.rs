//! Client configuration.
//!
//! Settings can be built in code, deserialized from any serde source, or read
//! from `APPNEXUS_*` environment variables. Credentials are configured
//! separately through [`crate::auth`].

use std::time::Duration;

use serde::Deserialize;

use crate::error::AppNexusError;
use crate::rest::endpoints::{APPNEXUS_BASE_URL, AUTH};

/// Default number of items requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default wait after the account hits the authentication rate limit.
pub const DEFAULT_AUTH_LIMIT_PENALTY: Duration = Duration::from_secs(300);

/// Default slack added to the next quota period to absorb clock skew.
pub const DEFAULT_THROTTLE_BUFFER: Duration = Duration::from_secs(15);

/// Configuration for [`crate::rest::AppNexusClient`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API
    pub base_url: String,
    /// Path of the authentication endpoint
    pub auth_path: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Transport-level retries for transient failures
    pub max_retries: u32,
    /// Minimum wait between transport retries in milliseconds
    pub retry_wait_ms: u64,
    /// Wait applied after an authentication-rate limit error, in milliseconds
    pub auth_limit_penalty_ms: u64,
    /// Slack added to the next quota period, in milliseconds
    pub throttle_buffer_ms: u64,
    /// Items requested per page by the collection pager
    pub page_size: u32,
    /// Custom user agent
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: APPNEXUS_BASE_URL.to_string(),
            auth_path: AUTH.to_string(),
            timeout_ms: 60_000,
            max_retries: 3,
            retry_wait_ms: 500,
            auth_limit_penalty_ms: millis(DEFAULT_AUTH_LIMIT_PENALTY),
            throttle_buffer_ms: millis(DEFAULT_THROTTLE_BUFFER),
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: None,
        }
    }
}

impl ClientConfig {
    /// Read configuration from `APPNEXUS_*` environment variables.
    ///
    /// Unset variables keep their default value. Variables that are set but
    /// cannot be parsed are reported as [`AppNexusError::Config`].
    pub fn from_env() -> Result<Self, AppNexusError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: env_or("APPNEXUS_BASE_URL", defaults.base_url),
            auth_path: env_or("APPNEXUS_AUTH_PATH", defaults.auth_path),
            timeout_ms: parse_env("APPNEXUS_TIMEOUT_MS", defaults.timeout_ms)?,
            max_retries: parse_env("APPNEXUS_MAX_RETRIES", defaults.max_retries)?,
            retry_wait_ms: parse_env("APPNEXUS_RETRY_WAIT_MS", defaults.retry_wait_ms)?,
            auth_limit_penalty_ms: parse_env(
                "APPNEXUS_AUTH_LIMIT_PENALTY_MS",
                defaults.auth_limit_penalty_ms,
            )?,
            throttle_buffer_ms: parse_env(
                "APPNEXUS_THROTTLE_BUFFER_MS",
                defaults.throttle_buffer_ms,
            )?,
            page_size: parse_env("APPNEXUS_PAGE_SIZE", defaults.page_size)?,
            user_agent: std::env::var("APPNEXUS_USER_AGENT").ok(),
        })
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Minimum wait between transport retries.
    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }

    /// Authentication-rate limit penalty.
    pub fn auth_limit_penalty(&self) -> Duration {
        Duration::from_millis(self.auth_limit_penalty_ms)
    }

    /// Throttle buffer.
    pub fn throttle_buffer(&self) -> Duration {
        Duration::from_millis(self.throttle_buffer_ms)
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn env_or(var: &str, default: String) -> String {
    std::env::var(var).unwrap_or(default)
}

fn parse_env<T>(var: &str, default: T) -> Result<T, AppNexusError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppNexusError::Config(format!("{var}={raw:?}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.appnexus.com");
        assert_eq!(config.auth_path, "/auth");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.auth_limit_penalty(), Duration::from_secs(300));
        assert_eq!(config.throttle_buffer(), Duration::from_secs(15));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"page_size": 25, "max_retries": 0}"#).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_from_env_overrides_defaults() {
        let vars = [
            ("APPNEXUS_BASE_URL", "http://localhost:9000"),
            ("APPNEXUS_TIMEOUT_MS", "2500"),
            ("APPNEXUS_THROTTLE_BUFFER_MS", " 750 "),
            ("APPNEXUS_PAGE_SIZE", "40"),
            ("APPNEXUS_USER_AGENT", "trafficker/1.0"),
        ];
        for (var, value) in vars {
            unsafe { std::env::set_var(var, value) };
        }
        let config = ClientConfig::from_env();
        let bad = {
            unsafe { std::env::set_var("APPNEXUS_MAX_RETRIES", "many") };
            let result = ClientConfig::from_env();
            unsafe { std::env::remove_var("APPNEXUS_MAX_RETRIES") };
            result
        };
        for (var, _) in vars {
            unsafe { std::env::remove_var(var) };
        }

        let config = config.unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.throttle_buffer(), Duration::from_millis(750));
        assert_eq!(config.page_size, 40);
        assert_eq!(config.user_agent.as_deref(), Some("trafficker/1.0"));
        assert_eq!(config.auth_path, "/auth");
        assert_eq!(config.auth_limit_penalty(), DEFAULT_AUTH_LIMIT_PENALTY);

        let err = bad.unwrap_err();
        assert!(matches!(err, AppNexusError::Config(ref msg) if msg.contains("APPNEXUS_MAX_RETRIES")));
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(800)), 800);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_parse_env_reports_bad_value() {
        // Unique name so parallel tests cannot collide.
        let var = "APPNEXUS_TEST_PARSE_ENV_BAD_VALUE";
        unsafe { std::env::set_var(var, "not-a-number") };
        let result: Result<u32, _> = parse_env(var, 7);
        unsafe { std::env::remove_var(var) };
        assert!(matches!(result, Err(AppNexusError::Config(_))));
    }

    #[test]
    fn test_parse_env_unset_uses_default() {
        let result: u32 = parse_env("APPNEXUS_TEST_PARSE_ENV_UNSET", 7).unwrap();
        assert_eq!(result, 7);
    }
}
