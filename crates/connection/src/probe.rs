//! Post-association health check.
//!
//! Joining the access point does not mean the sensor application is
//! serving yet. One bounded GET to the health path must answer 2xx before
//! any listing or download request is issued.

use std::sync::Arc;
use std::time::Duration;

use fieldlink_protocol::constants::{DEFAULT_HEALTH_PATH, endpoint_url};
use tracing::{debug, warn};

use crate::link::{LinkClient, LinkRequest};

/// The sensor did not answer the health check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("server unreachable at {url}: {reason}")]
pub struct ProbeError {
    pub url: String,
    pub reason: String,
}

/// Confirms the sensor application answers.
pub struct ReachabilityProbe {
    link: Arc<dyn LinkClient>,
    health_path: String,
}

impl ReachabilityProbe {
    pub fn new(link: Arc<dyn LinkClient>) -> Self {
        Self {
            link,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    /// Issues one health request bounded by `timeout`.
    pub async fn probe(&self, server_base_url: &str, timeout: Duration) -> Result<(), ProbeError> {
        let url = endpoint_url(server_base_url, &self.health_path);
        let request = LinkRequest::get(&url, timeout, timeout);

        let fail = |reason: String| {
            warn!(url = %url, reason = %reason, "reachability probe failed");
            ProbeError {
                url: url.clone(),
                reason,
            }
        };

        let response = match tokio::time::timeout(timeout, self.link.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(fail(e.to_string())),
            Err(_) => return Err(fail(format!("no answer within {} ms", timeout.as_millis()))),
        };

        if !response.is_success() {
            return Err(fail(format!("HTTP {}", response.status)));
        }

        debug!(url = %url, status = response.status, "sensor reachable");
        Ok(())
    }
}
