use serde::{Deserialize, Serialize};

/// A file advertised by the sensor for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileDescriptor {
    pub name: String,
    pub size_bytes: u64,
    pub content_hash: String,
}

/// A successfully pulled file, handed to the caller.
///
/// The engine keeps no copy of `data` after handoff.
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub name: String,
    pub size_bytes: u64,
    pub content_hash: String,
    pub job_id: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for DownloadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadedFile")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .field("content_hash", &self.content_hash)
            .field("job_id", &self.job_id)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Aggregate progress of one job at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgressSnapshot {
    /// Completed files divided by listed files (0.0–1.0).
    pub files_completed_fraction: f64,
    /// Overall byte progress (0.0–100.0).
    pub overall_percent: f64,
    pub speed_bytes_per_sec: f64,
    /// `None` while the speed is still zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<f64>,
    pub current_file_name: String,
}

/// Process-lifetime transfer history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatistics {
    pub total_attempts: u64,
    pub successful_attempts: u64,
    pub total_bytes_transferred: u64,
    pub average_speed_bytes_per_sec: f64,
    pub last_speed_bytes_per_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_omits_missing_eta() {
        let snap = TransferProgressSnapshot {
            files_completed_fraction: 0.0,
            overall_percent: 0.0,
            speed_bytes_per_sec: 0.0,
            eta_seconds: None,
            current_file_name: "a.ubx".into(),
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("etaSeconds"));
        assert!(json.contains("\"currentFileName\":\"a.ubx\""));
    }

    #[test]
    fn downloaded_file_debug_hides_payload() {
        let file = DownloadedFile {
            name: "a.ubx".into(),
            size_bytes: 3,
            content_hash: String::new(),
            job_id: "c-1".into(),
            data: vec![1, 2, 3],
        };
        let dbg = format!("{file:?}");
        assert!(dbg.contains("data_len: 3"));
        assert!(!dbg.contains("[1, 2, 3]"));
    }

    #[test]
    fn statistics_default_is_zeroed() {
        let stats = TransferStatistics::default();
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.successful_attempts, 0);
        assert_eq!(stats.total_bytes_transferred, 0);
    }
}
