use std::sync::{Mutex, PoisonError};

use fieldlink_protocol::TransferStatistics;

/// Running transfer history for the lifetime of the process.
///
/// Counters are only ever incremented; a failed job never rolls back a
/// previous success.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    inner: Mutex<TransferStatistics>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one job.
    ///
    /// On success both attempt counters advance, `bytes` is added, the
    /// average is recomputed as `total_bytes_transferred / successful_attempts`
    /// and `speed` becomes the last observed speed. On failure only
    /// `total_attempts` advances.
    pub fn record(&self, bytes: u64, speed: f64, success: bool) {
        let mut s = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        s.total_attempts += 1;
        if !success {
            return;
        }
        s.successful_attempts += 1;
        s.total_bytes_transferred = s.total_bytes_transferred.saturating_add(bytes);
        s.average_speed_bytes_per_sec =
            s.total_bytes_transferred as f64 / s.successful_attempts as f64;
        s.last_speed_bytes_per_sec = speed;
    }

    /// Returns a copy of the current statistics.
    pub fn snapshot(&self) -> TransferStatistics {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
