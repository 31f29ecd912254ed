//! Engine tuning knobs.
//!
//! Every field has a default, so a partial `[engine]` table in the host's
//! configuration file is enough.

use std::time::Duration;

use fieldlink_protocol::constants::{DEFAULT_DOWNLOAD_PATH, DEFAULT_HEALTH_PATH, DEFAULT_LIST_PATH};
use fieldlink_transfer::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wait after association before the first request.
    pub settle_delay_ms: u64,
    pub probe_timeout_ms: u64,
    /// Connect timeout for listing and download requests.
    pub connect_timeout_ms: u64,
    pub list_timeout_ms: u64,
    /// Read timeout for one file download.
    pub download_timeout_ms: u64,
    pub retry_delay_ms: u64,
    /// `1.0` keeps the retry delay fixed.
    pub retry_backoff_factor: f64,
    pub max_retry_delay_ms: u64,
    /// Attempts per file when the caller does not specify any.
    pub default_retry_attempts: u32,
    /// Check SHA-256 listing hashes against downloaded bytes.
    pub verify_hashes: bool,
    pub health_path: String,
    pub list_path: String,
    pub download_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1500,
            probe_timeout_ms: 5000,
            connect_timeout_ms: 5000,
            list_timeout_ms: 10_000,
            download_timeout_ms: 120_000,
            retry_delay_ms: 1000,
            retry_backoff_factor: 1.0,
            max_retry_delay_ms: 10_000,
            default_retry_attempts: 3,
            verify_hashes: false,
            health_path: DEFAULT_HEALTH_PATH.into(),
            list_path: DEFAULT_LIST_PATH.into(),
            download_path: DEFAULT_DOWNLOAD_PATH.into(),
        }
    }
}

impl EngineConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_millis(self.list_timeout_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    /// Retry policy for per-file downloads.
    ///
    /// `attempts` overrides [`default_retry_attempts`](Self::default_retry_attempts).
    pub fn retry_policy(&self, attempts: Option<u32>) -> RetryPolicy {
        let attempts = attempts.unwrap_or(self.default_retry_attempts).max(1);
        let policy = RetryPolicy::fixed(attempts, Duration::from_millis(self.retry_delay_ms));
        if self.retry_backoff_factor > 1.0 {
            policy.with_backoff(
                self.retry_backoff_factor,
                Duration::from_millis(self.max_retry_delay_ms),
            )
        } else {
            policy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_millis(1500));
        assert_eq!(config.default_retry_attempts, 3);
        assert_eq!(config.health_path, "/health");
        assert!(!config.verify_hashes);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"settle_delay_ms": 0, "verify_hashes": true}"#).unwrap();
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert!(config.verify_hashes);
        assert_eq!(config.list_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn retry_policy_uses_override_and_floor() {
        let config = EngineConfig::default();
        assert_eq!(config.retry_policy(None).max_attempts, 3);
        assert_eq!(config.retry_policy(Some(5)).max_attempts, 5);
        assert_eq!(config.retry_policy(Some(0)).max_attempts, 1);
    }

    #[test]
    fn retry_policy_backoff() {
        let config = EngineConfig {
            retry_delay_ms: 100,
            retry_backoff_factor: 2.0,
            max_retry_delay_ms: 300,
            ..Default::default()
        };
        let policy = config.retry_policy(Some(4));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }
}
