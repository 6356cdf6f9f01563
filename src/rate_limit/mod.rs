//! Rate limiting for the AppNexus API.
//!
//! AppNexus counts reads (GET) and writes (POST, PUT, DELETE) separately per
//! account and reports the counters on every response. The server enforces
//! the limits; the client only needs to know how long to back off once a
//! request has been rejected with `RATE_EXCEEDED`.
//!
//! - [`ThrottleCoordinator`] records the counters and computes the start of
//!   the next quota period.
//! - [`Delay`] performs the wait as a cancellable async sleep.

mod delay;
mod throttle;

pub use delay::Delay;
pub use throttle::{ThrottleCoordinator, ThrottleInfo, ThrottleSnapshot};
