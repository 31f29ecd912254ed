//! Time source injected into the controller and the orchestrator.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Monotonic and wall-clock time.
///
/// `now` uses tokio's clock so paused-time tests stay deterministic.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
