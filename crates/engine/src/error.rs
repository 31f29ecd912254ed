//! Transfer error taxonomy surfaced to the caller.
//!
//! Every internal failure is folded into one of these kinds; raw transport
//! errors only survive as message text.

use fieldlink_connection::{ConnectionError, ProbeError};

use crate::catalog::CatalogError;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotSupported,
    Timeout,
    AssociationFailed,
    ServerUnreachable,
    FileListFailed,
    DownloadFailed,
    Aborted,
}

/// Errors produced by a transfer job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("connectivity not supported: {0}")]
    NotSupported(String),

    #[error("association with {network} timed out after {timeout_ms} ms")]
    Timeout { network: String, timeout_ms: u64 },

    #[error("could not associate with {network}: {message}")]
    AssociationFailed { network: String, message: String },

    #[error("sensor unreachable at {url}: {reason}")]
    ServerUnreachable { url: String, reason: String },

    #[error("file listing for job {job_id} failed: {reason}")]
    FileListFailed { job_id: String, reason: String },

    #[error("download of {file} failed after {attempts} attempt(s): {reason}")]
    DownloadFailed {
        file: String,
        attempts: u32,
        reason: String,
    },

    #[error("transfer aborted")]
    Aborted,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::AssociationFailed { .. } => ErrorKind::AssociationFailed,
            Self::ServerUnreachable { .. } => ErrorKind::ServerUnreachable,
            Self::FileListFailed { .. } => ErrorKind::FileListFailed,
            Self::DownloadFailed { .. } => ErrorKind::DownloadFailed,
            Self::Aborted => ErrorKind::Aborted,
        }
    }

    /// Whether the caller may reasonably start a new job right away.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Timeout
                | ErrorKind::AssociationFailed
                | ErrorKind::ServerUnreachable
                | ErrorKind::FileListFailed
        )
    }

    /// Cancellation is a normal early exit, not a failure to report.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<ConnectionError> for TransferError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::NotSupported(msg) => Self::NotSupported(msg),
            ConnectionError::Timeout {
                network,
                timeout_ms,
            } => Self::Timeout {
                network,
                timeout_ms,
            },
            ConnectionError::AssociationFailed { network, message } => {
                Self::AssociationFailed { network, message }
            }
            ConnectionError::NotConnected => Self::AssociationFailed {
                network: String::new(),
                message: "link lost".into(),
            },
        }
    }
}

impl From<ProbeError> for TransferError {
    fn from(err: ProbeError) -> Self {
        Self::ServerUnreachable {
            url: err.url,
            reason: err.reason,
        }
    }
}

impl From<CatalogError> for TransferError {
    fn from(err: CatalogError) -> Self {
        Self::FileListFailed {
            job_id: err.job_id,
            reason: err.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_by_kind() {
        assert!(!TransferError::NotSupported("x".into()).is_retryable());
        assert!(
            TransferError::Timeout {
                network: "n".into(),
                timeout_ms: 1
            }
            .is_retryable()
        );
        assert!(
            TransferError::ServerUnreachable {
                url: "u".into(),
                reason: "r".into()
            }
            .is_retryable()
        );
        assert!(
            !TransferError::DownloadFailed {
                file: "a.ubx".into(),
                attempts: 2,
                reason: "r".into()
            }
            .is_retryable()
        );
        assert!(!TransferError::Aborted.is_retryable());
        assert!(TransferError::Aborted.is_cancellation());
    }

    #[test]
    fn connection_errors_map_to_kinds() {
        let e: TransferError = ConnectionError::NotSupported("no api".into()).into();
        assert_eq!(e.kind(), ErrorKind::NotSupported);

        let e: TransferError = ConnectionError::Timeout {
            network: "RX".into(),
            timeout_ms: 5,
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::Timeout);

        let e: TransferError = ConnectionError::NotConnected.into();
        assert_eq!(e.kind(), ErrorKind::AssociationFailed);
    }

    #[test]
    fn messages_are_human_readable() {
        let e = TransferError::DownloadFailed {
            file: "b.ubx".into(),
            attempts: 2,
            reason: "HTTP 500".into(),
        };
        assert_eq!(
            e.to_string(),
            "download of b.ubx failed after 2 attempt(s): HTTP 500"
        );
    }
}
