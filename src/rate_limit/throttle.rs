//! Shared quota tracking from response telemetry.
//!
//! Every AppNexus response carries a `dbg_info` object reporting how many
//! reads and writes the account has made in the current quota period and what
//! the limits are. The coordinator records those counters per traffic class
//! and derives when the next period starts, which is how long a caller must
//! wait after a `RATE_EXCEEDED` error.
//!
//! # Example
//!
//! ```rust
//! use appnexus_api_client::rate_limit::{ThrottleCoordinator, ThrottleInfo};
//! use appnexus_api_client::types::TrafficClass;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let throttle = ThrottleCoordinator::new();
//! throttle
//!     .update(TrafficClass::Read, ThrottleInfo::new(95, 100, 60))
//!     .await;
//! let snapshot = throttle.snapshot().await;
//! assert_eq!(snapshot.read.requests_remaining(), 5);
//! # }
//! ```

use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::DEFAULT_THROTTLE_BUFFER;
use crate::types::TrafficClass;

/// Upper bound on a server-reported quota window.
const MAX_QUOTA_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Quota counters for one traffic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleInfo {
    /// Requests made in the current period
    pub requests_made: u64,
    /// Requests allowed per period
    pub request_limit: u64,
    /// Length of the period in seconds
    pub request_limit_seconds: u64,
    /// When these counters were observed
    pub last_request_time: Option<Instant>,
}

impl ThrottleInfo {
    /// Counters observed now.
    pub fn new(requests_made: u64, request_limit: u64, request_limit_seconds: u64) -> Self {
        Self {
            requests_made,
            request_limit,
            request_limit_seconds,
            last_request_time: Some(Instant::now()),
        }
    }

    /// Requests left before the limit is hit.
    pub fn requests_remaining(&self) -> u64 {
        self.request_limit.saturating_sub(self.requests_made)
    }

    /// Read the counters for `class` out of a `dbg_info` object.
    ///
    /// Returns `None` unless the request count is present.
    pub fn from_debug_info(class: TrafficClass, dbg_info: &Value) -> Option<Self> {
        let (count, limit, seconds) = match class {
            TrafficClass::Read => ("reads", "read_limit", "read_limit_seconds"),
            TrafficClass::Write => ("writes", "write_limit", "write_limit_seconds"),
        };

        Some(Self::new(
            counter(dbg_info, count)?,
            counter(dbg_info, limit).unwrap_or(0),
            counter(dbg_info, seconds).unwrap_or(0),
        ))
    }
}

// Counters arrive as numbers, but some endpoints stringify them.
fn counter(dbg_info: &Value, field: &str) -> Option<u64> {
    match dbg_info.get(field)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Point-in-time view of the coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleSnapshot {
    /// Read counters
    pub read: ThrottleInfo,
    /// Write counters
    pub write: ThrottleInfo,
    /// Start of the current quota period
    pub period_start: Instant,
    /// Start of the next quota period, buffer included
    pub next_period_start: Instant,
}

#[derive(Debug)]
struct ThrottleState {
    read: ThrottleInfo,
    write: ThrottleInfo,
    period_start: Instant,
}

impl ThrottleState {
    fn info_mut(&mut self, class: TrafficClass) -> &mut ThrottleInfo {
        match class {
            TrafficClass::Read => &mut self.read,
            TrafficClass::Write => &mut self.write,
        }
    }

    fn next_period_start(&self, buffer: Duration) -> Instant {
        let period = self
            .read
            .request_limit_seconds
            .max(self.write.request_limit_seconds);
        let wait = Duration::from_secs(period)
            .min(MAX_QUOTA_PERIOD)
            .saturating_add(buffer);
        self.period_start
            .checked_add(wait)
            .unwrap_or_else(|| self.period_start + MAX_QUOTA_PERIOD)
    }
}

/// Tracks read/write quota shared by every client talking to one account.
///
/// Share one coordinator between clients with `Arc`; all updates and reads go
/// through a single lock.
#[derive(Debug)]
pub struct ThrottleCoordinator {
    state: Mutex<ThrottleState>,
    buffer: Duration,
}

impl ThrottleCoordinator {
    /// Create a coordinator with the default 15 second buffer.
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_THROTTLE_BUFFER)
    }

    /// Create a coordinator with a custom buffer added to every period.
    pub fn with_buffer(buffer: Duration) -> Self {
        Self {
            state: Mutex::new(ThrottleState {
                read: ThrottleInfo::default(),
                write: ThrottleInfo::default(),
                period_start: Instant::now(),
            }),
            buffer,
        }
    }

    /// The buffer added to every period.
    pub fn buffer(&self) -> Duration {
        self.buffer
    }

    /// Record the latest counters for `class`.
    ///
    /// A request count lower than the recorded one means the server started a
    /// new period, so the period start moves to now.
    pub async fn update(&self, class: TrafficClass, info: ThrottleInfo) {
        let mut state = self.state.lock().await;
        let previous = state.info_mut(class).requests_made;

        if info.requests_made < previous {
            let now = info.last_request_time.unwrap_or_else(Instant::now);
            tracing::debug!(
                %class,
                previous,
                current = info.requests_made,
                "New quota period detected"
            );
            state.period_start = now;
        }

        *state.info_mut(class) = info;
    }

    /// Update `class` from a response's `dbg_info` object.
    ///
    /// Returns `false` (and logs) when the telemetry is missing or incomplete.
    pub async fn update_from_debug_info(&self, class: TrafficClass, dbg_info: Option<&Value>) -> bool {
        let Some(info) = dbg_info.and_then(|dbg| ThrottleInfo::from_debug_info(class, dbg)) else {
            tracing::debug!(%class, "Response carried no usable dbg_info; throttle not updated");
            return false;
        };

        self.update(class, info).await;
        true
    }

    /// When the next quota period starts, buffer included.
    pub async fn next_period_start(&self) -> Instant {
        self.state.lock().await.next_period_start(self.buffer)
    }

    /// How long until the next quota period starts.
    pub async fn time_until_next_period(&self) -> Duration {
        self.next_period_start()
            .await
            .saturating_duration_since(Instant::now())
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> ThrottleSnapshot {
        let state = self.state.lock().await;
        ThrottleSnapshot {
            read: state.read,
            write: state.write,
            period_start: state.period_start,
            next_period_start: state.next_period_start(self.buffer),
        }
    }
}

impl Default for ThrottleCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
