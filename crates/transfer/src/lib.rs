//! Transfer primitives: retrying, progress projection, running
//! statistics, and integrity helpers for pulled files.

mod checksum;
mod progress;
mod retry;
mod stats;
mod types;
mod validation;

pub use checksum::{ChecksumError, checksum_bytes, is_sha256_hex, verify_sha256};
pub use progress::{ProgressInputs, ProgressTracker, compute_snapshot};
pub use retry::{RetryError, RetryPolicy};
pub use stats::StatsAccumulator;
pub use types::TransferJob;
pub use validation::validate_remote_name;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("duplicate file name: {0}")]
    DuplicateName(String),
}
