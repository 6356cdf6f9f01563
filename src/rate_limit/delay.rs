//! Cancellable waiting.
//!
//! Backoff waits (rate limit, authentication penalty) suspend the calling task
//! with `tokio::time::sleep`. By default a wait always runs to completion; a
//! [`CancellationToken`] or a maximum wait can be layered on top.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use appnexus_api_client::rate_limit::Delay;
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let delay = Delay::new()
//!     .with_cancellation(token.clone())
//!     .with_max_wait(Duration::from_secs(30));
//! assert!(delay.is_cancellable());
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AppNexusError;

/// A wait primitive with optional cancellation and an optional cap.
#[derive(Debug, Clone, Default)]
pub struct Delay {
    cancel: Option<CancellationToken>,
    max_wait: Option<Duration>,
}

impl Delay {
    /// A delay that always waits to completion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Never wait longer than `max_wait`, whatever the requested duration.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Whether a cancellation token is attached.
    pub fn is_cancellable(&self) -> bool {
        self.cancel.is_some()
    }

    /// Wait for `duration`.
    ///
    /// Returns [`AppNexusError::Cancelled`] if the cancellation token fires first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), AppNexusError> {
        self.sleep_until(Instant::now() + duration).await
    }

    /// Wait until `deadline`. Deadlines in the past return immediately.
    pub async fn sleep_until(&self, deadline: Instant) -> Result<(), AppNexusError> {
        let deadline = match self.max_wait {
            Some(max) => deadline.min(Instant::now() + max),
            None => deadline,
        };

        match &self.cancel {
            None => {
                tokio::time::sleep_until(deadline).await;
                Ok(())
            }
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => Ok(()),
                    _ = token.cancelled() => Err(AppNexusError::Cancelled),
                }
            }
        }
    }
}
