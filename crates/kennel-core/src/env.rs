//! Environment abstraction for deterministic testing.
//!
//! Decouples drivers from the system clock. Production uses wall-clock time
//! and tokio timers; tests use tokio's paused clock and fixed timestamps.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Clock and timer source for drivers.
///
/// State machines never call this directly. Drivers read `now()` to stamp
/// provisional messages and use `sleep()` to wait out backoff and UI timers.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    ///
    /// Used for message timestamps, which the backend also orders by, so this
    /// is UTC wall time rather than a monotonic instant.
    fn now(&self) -> DateTime<Utc>;

    /// Sleeps for the specified duration.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
