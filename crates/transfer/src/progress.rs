use std::time::Duration;

use fieldlink_protocol::TransferProgressSnapshot;

/// Inputs for one progress projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressInputs<'a> {
    pub total_bytes: u64,
    pub total_files: usize,
    pub completed_files: usize,
    /// Bytes of fully downloaded files.
    pub transferred_bytes: u64,
    pub current_file_name: &'a str,
    pub current_file_size: u64,
    /// Received fraction of the current file (clamped to 0.0–1.0).
    pub current_file_fraction: f64,
    /// Time since the download phase started.
    pub elapsed: Duration,
}

impl ProgressInputs<'_> {
    /// Bytes accounted for, including the partial current file.
    pub fn progress_bytes(&self) -> f64 {
        let fraction = clamp_fraction(self.current_file_fraction);
        self.transferred_bytes as f64 + fraction * self.current_file_size as f64
    }
}

/// Projects job state into a snapshot.
///
/// - `overall_percent = progress_bytes / total_bytes * 100`
/// - `speed = progress_bytes / elapsed`
/// - `eta = (total_bytes - progress_bytes) / speed`, omitted at zero speed
///
/// A job whose files are all empty reports progress by file count.
pub fn compute_snapshot(inputs: &ProgressInputs<'_>) -> TransferProgressSnapshot {
    let progress_bytes = inputs.progress_bytes();
    let files_completed_fraction = if inputs.total_files == 0 {
        1.0
    } else {
        inputs.completed_files as f64 / inputs.total_files as f64
    };

    let overall_percent = if inputs.total_bytes == 0 {
        files_completed_fraction * 100.0
    } else {
        (progress_bytes / inputs.total_bytes as f64 * 100.0).clamp(0.0, 100.0)
    };

    let elapsed = inputs.elapsed.as_secs_f64();
    let speed_bytes_per_sec = if elapsed > 0.0 {
        progress_bytes / elapsed
    } else {
        0.0
    };

    let eta_seconds = (speed_bytes_per_sec > 0.0).then(|| {
        let remaining = (inputs.total_bytes as f64 - progress_bytes).max(0.0);
        remaining / speed_bytes_per_sec
    });

    TransferProgressSnapshot {
        files_completed_fraction,
        overall_percent,
        speed_bytes_per_sec,
        eta_seconds,
        current_file_name: inputs.current_file_name.to_string(),
    }
}

/// Per-job progress state that keeps the reported percentage monotonic.
///
/// A retried file restarts its own fraction at zero; the tracker holds the
/// high-water mark so the overall bar never moves backwards.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_bytes: u64,
    total_files: usize,
    high_water_percent: f64,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64, total_files: usize) -> Self {
        Self {
            total_bytes,
            total_files,
            high_water_percent: 0.0,
        }
    }

    /// Computes the next snapshot for the current file.
    pub fn update(
        &mut self,
        completed_files: usize,
        transferred_bytes: u64,
        current_file_name: &str,
        current_file_size: u64,
        current_file_fraction: f64,
        elapsed: Duration,
    ) -> TransferProgressSnapshot {
        let mut snapshot = compute_snapshot(&ProgressInputs {
            total_bytes: self.total_bytes,
            total_files: self.total_files,
            completed_files,
            transferred_bytes,
            current_file_name,
            current_file_size,
            current_file_fraction,
            elapsed,
        });
        if snapshot.overall_percent < self.high_water_percent {
            snapshot.overall_percent = self.high_water_percent;
        } else {
            self.high_water_percent = snapshot.overall_percent;
        }
        snapshot
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

fn clamp_fraction(f: f64) -> f64 {
    if f.is_nan() { 0.0 } else { f.clamp(0.0, 1.0) }
}
