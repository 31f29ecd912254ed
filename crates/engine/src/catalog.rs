//! Remote file listing.
//!
//! A body that decodes but violates the schema is treated exactly like a
//! network failure. An empty `files` array is a valid result.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fieldlink_connection::{LinkClient, LinkRequest};
use fieldlink_protocol::constants::{DEFAULT_LIST_PATH, JOB_ID_PARAM, endpoint_url};
use fieldlink_protocol::{RemoteFileDescriptor, parse_listing};
use fieldlink_transfer::{ValidationError, validate_remote_name};
use tracing::{debug, warn};

/// Listing could not be fetched or did not validate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("file listing for job {job_id} failed: {reason}")]
pub struct CatalogError {
    pub job_id: String,
    pub reason: String,
}

/// Fetches and validates the per-job file listing.
pub struct FileCatalog {
    link: Arc<dyn LinkClient>,
    list_path: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl FileCatalog {
    pub fn new(link: Arc<dyn LinkClient>, connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            link,
            list_path: DEFAULT_LIST_PATH.to_string(),
            connect_timeout,
            timeout,
        }
    }

    pub fn with_list_path(mut self, path: impl Into<String>) -> Self {
        self.list_path = path.into();
        self
    }

    /// Lists the files recorded for `job_id`, in the sensor's order.
    pub async fn list_files(
        &self,
        server_base_url: &str,
        job_id: &str,
    ) -> Result<Vec<RemoteFileDescriptor>, CatalogError> {
        let fail = |reason: String| {
            warn!(job = %job_id, reason = %reason, "file listing failed");
            CatalogError {
                job_id: job_id.to_string(),
                reason,
            }
        };

        let request = LinkRequest::get(
            endpoint_url(server_base_url, &self.list_path),
            self.connect_timeout,
            self.timeout,
        )
        .query(JOB_ID_PARAM, job_id);

        let response = match tokio::time::timeout(self.timeout, self.link.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(fail(e.to_string())),
            Err(_) => {
                return Err(fail(format!(
                    "no answer within {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        if !response.is_success() {
            return Err(fail(format!("HTTP {}", response.status)));
        }

        let listing = parse_listing(&response.body).map_err(|e| fail(e.to_string()))?;

        if listing.job_id != job_id {
            return Err(fail(format!(
                "listing is for job {}, expected {job_id}",
                listing.job_id
            )));
        }

        let mut seen = HashSet::with_capacity(listing.files.len());
        for file in &listing.files {
            validate_remote_name(&file.name).map_err(|e| fail(e.to_string()))?;
            if !seen.insert(file.name.as_str()) {
                return Err(fail(
                    ValidationError::DuplicateName(file.name.clone()).to_string(),
                ));
            }
        }

        let Some(total_bytes) = listing.total_bytes() else {
            return Err(fail("listed sizes overflow a 64-bit total".into()));
        };

        debug!(
            job = %job_id,
            files = listing.files.len(),
            total_bytes,
            "listing received"
        );
        Ok(listing
            .files
            .into_iter()
            .map(RemoteFileDescriptor::from)
            .collect())
    }
}
