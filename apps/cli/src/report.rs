//! Progress logging and the end-of-run summary.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use fieldlink_protocol::{TransferProgressSnapshot, TransferStatistics};

/// Minimum gap between two logged progress lines.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Rate-limits progress lines. The first and the final snapshot always pass.
pub struct ProgressThrottle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn should_log(&self, now: Instant, snapshot: &TransferProgressSnapshot) -> bool {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let due = match *last {
            None => true,
            Some(prev) => now.saturating_duration_since(prev) >= self.interval,
        };
        if due || snapshot.overall_percent >= 100.0 {
            *last = Some(now);
            true
        } else {
            false
        }
    }
}

/// Logs one snapshot at `info`.
pub fn log_progress(snapshot: &TransferProgressSnapshot) {
    tracing::info!(
        file = %snapshot.current_file_name,
        percent = %format!("{:.1}", snapshot.overall_percent),
        speed = %format_rate(snapshot.speed_bytes_per_sec),
        eta_s = snapshot.eta_seconds.map(|s| s.round() as u64),
        "progress"
    );
}

/// Human-readable transfer rate.
pub fn format_rate(bytes_per_sec: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    if bytes_per_sec >= MIB {
        format!("{:.1} MiB/s", bytes_per_sec / MIB)
    } else if bytes_per_sec >= KIB {
        format!("{:.1} KiB/s", bytes_per_sec / KIB)
    } else {
        format!("{bytes_per_sec:.0} B/s")
    }
}

/// Statistics as pretty JSON for stdout.
pub fn stats_json(stats: &TransferStatistics) -> String {
    serde_json::to_string_pretty(stats).unwrap_or_else(|_| format!("{stats:?}"))
}
