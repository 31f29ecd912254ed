use fieldlink_protocol::RemoteFileDescriptor;
use tokio_util::sync::CancellationToken;

/// One logical pull of every file the sensor lists for a job.
///
/// `total_bytes` is fixed at construction from the listing and saturates
/// at `u64::MAX`.
#[derive(Debug, Clone)]
pub struct TransferJob {
    job_id: String,
    files: Vec<RemoteFileDescriptor>,
    total_bytes: u64,
    cancel: CancellationToken,
}

impl TransferJob {
    /// Creates a job from a validated listing.
    pub fn new(
        job_id: impl Into<String>,
        files: Vec<RemoteFileDescriptor>,
        cancel: CancellationToken,
    ) -> Self {
        let total_bytes = files
            .iter()
            .fold(0u64, |total, f| total.saturating_add(f.size_bytes));
        Self {
            job_id: job_id.into(),
            files,
            total_bytes,
            cancel,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn files(&self) -> &[RemoteFileDescriptor] {
        &self.files
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> RemoteFileDescriptor {
        RemoteFileDescriptor {
            name: name.into(),
            size_bytes: size,
            content_hash: String::new(),
        }
    }

    #[test]
    fn total_bytes_is_sum_of_listing() {
        let job = TransferJob::new(
            "c-1",
            vec![file("a.ubx", 1000), file("b.ubx", 500)],
            CancellationToken::new(),
        );
        assert_eq!(job.total_bytes(), 1500);
        assert_eq!(job.files().len(), 2);
        assert_eq!(job.job_id(), "c-1");
    }

    #[test]
    fn total_bytes_saturates() {
        let job = TransferJob::new(
            "c-1",
            vec![file("a.ubx", u64::MAX), file("b.ubx", 1)],
            CancellationToken::new(),
        );
        assert_eq!(job.total_bytes(), u64::MAX);
    }

    #[test]
    fn empty_job() {
        let job = TransferJob::new("c-1", Vec::new(), CancellationToken::new());
        assert!(job.is_empty());
        assert_eq!(job.total_bytes(), 0);
    }

    #[test]
    fn cancellation_is_shared_with_caller() {
        let token = CancellationToken::new();
        let job = TransferJob::new("c-1", vec![file("a.ubx", 1)], token.clone());
        assert!(!job.is_cancelled());
        token.cancel();
        assert!(job.is_cancelled());
    }
}
