//! Transfer orchestrator for one SoftAP pull.
//!
//! Joins the sensor network, confirms the sensor answers, lists the job's
//! files and downloads them one at a time. Files are never fetched in
//! parallel: the sensor's embedded server cannot serve concurrent streams.
//!
//! The result is all-or-nothing. Statistics are recorded and the network
//! is left on every exit path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fieldlink_connection::{
    Clock, ConnectionController, ConnectionCredentials, DisconnectReason, LinkClient, LinkError,
    LinkRequest, ReachabilityProbe,
};
use fieldlink_protocol::constants::{NAME_PARAM, endpoint_url};
use fieldlink_protocol::{DownloadedFile, RemoteFileDescriptor, TransferProgressSnapshot};
use fieldlink_transfer::{
    ChecksumError, ProgressTracker, RetryError, StatsAccumulator, TransferJob, is_sha256_hex,
    verify_sha256,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::FileCatalog;
use crate::config::EngineConfig;
use crate::error::TransferError;

/// Receives every progress snapshot of a job.
pub type ProgressCallback = Arc<dyn Fn(TransferProgressSnapshot) + Send + Sync>;

/// Per-call options for [`TransferOrchestrator::transfer_files`].
#[derive(Clone, Default)]
pub struct TransferOptions {
    pub on_progress: Option<ProgressCallback>,
    pub cancel: CancellationToken,
    /// Attempts per file. `None` uses the configured default.
    pub retry_attempts: Option<u32>,
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(TransferProgressSnapshot) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    fn publish(&self, snapshot: TransferProgressSnapshot) {
        if let Some(callback) = &self.on_progress {
            callback(snapshot);
        }
    }
}

impl std::fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("retry_attempts", &self.retry_attempts)
            .finish()
    }
}

/// Why one download attempt failed.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("no answer within {0} ms")]
    Timeout(u64),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    #[error("link lost")]
    NotConnected,
}

#[derive(Debug, Default)]
struct JobOutput {
    files: Vec<DownloadedFile>,
    bytes: u64,
    speed: f64,
}

/// Sequences connect, probe, list, download and teardown for one job.
pub struct TransferOrchestrator {
    controller: Arc<ConnectionController>,
    link: Arc<dyn LinkClient>,
    clock: Arc<dyn Clock>,
    probe: ReachabilityProbe,
    catalog: FileCatalog,
    stats: Arc<StatsAccumulator>,
    config: EngineConfig,
}

impl TransferOrchestrator {
    pub fn new(
        controller: Arc<ConnectionController>,
        link: Arc<dyn LinkClient>,
        clock: Arc<dyn Clock>,
        stats: Arc<StatsAccumulator>,
        config: EngineConfig,
    ) -> Self {
        let probe = ReachabilityProbe::new(link.clone()).with_health_path(&config.health_path);
        let catalog = FileCatalog::new(
            link.clone(),
            config.connect_timeout(),
            config.list_timeout(),
        )
        .with_list_path(&config.list_path);
        Self {
            controller,
            link,
            clock,
            probe,
            catalog,
            stats,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pulls every file the sensor lists for `job_id`.
    ///
    /// Returns the files in listing order. An empty listing yields an empty
    /// vector without any download. Any failure discards files already
    /// pulled in this call.
    pub async fn transfer_files(
        &self,
        credentials: &ConnectionCredentials,
        job_id: &str,
        options: TransferOptions,
    ) -> Result<Vec<DownloadedFile>, TransferError> {
        let transfer_id = Uuid::new_v4();
        let guard = TeardownGuard::new(self.controller.clone());
        info!(
            transfer = %transfer_id,
            job = %job_id,
            network = %credentials.network_name,
            "transfer started"
        );

        let outcome = self.run(credentials, job_id, &options, transfer_id).await;

        let reason = match &outcome {
            Ok(output) => {
                self.stats.record(output.bytes, output.speed, true);
                info!(
                    transfer = %transfer_id,
                    files = output.files.len(),
                    bytes = output.bytes,
                    speed = output.speed,
                    "transfer completed"
                );
                DisconnectReason::JobCompleted
            }
            Err(e) if e.is_cancellation() => {
                self.stats.record(0, 0.0, false);
                info!(transfer = %transfer_id, "transfer cancelled");
                DisconnectReason::JobCancelled
            }
            Err(e) => {
                self.stats.record(0, 0.0, false);
                warn!(transfer = %transfer_id, error = %e, "transfer failed");
                DisconnectReason::JobFailed
            }
        };

        self.controller.disconnect(reason).await;
        guard.disarm();
        outcome.map(|output| output.files)
    }

    async fn run(
        &self,
        credentials: &ConnectionCredentials,
        job_id: &str,
        options: &TransferOptions,
        transfer_id: Uuid,
    ) -> Result<JobOutput, TransferError> {
        let cancel = &options.cancel;
        if cancel.is_cancelled() {
            return Err(TransferError::Aborted);
        }

        let network = self.controller.connect(credentials).await?;
        let network = network.network_name;

        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            debug!(transfer = %transfer_id, settle_ms = settle.as_millis() as u64, "settling");
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransferError::Aborted),
                _ = tokio::time::sleep(settle) => {}
            }
        }

        self.require_link(&network)?;
        self.probe
            .probe(&credentials.server_base_url, self.config.probe_timeout())
            .await?;

        if cancel.is_cancelled() {
            return Err(TransferError::Aborted);
        }
        self.require_link(&network)?;
        let files = self
            .catalog
            .list_files(&credentials.server_base_url, job_id)
            .await?;

        if files.is_empty() {
            info!(transfer = %transfer_id, job = %job_id, "nothing to pull");
            return Ok(JobOutput::default());
        }

        let job = TransferJob::new(job_id, files, cancel.clone());
        info!(
            transfer = %transfer_id,
            files = job.files().len(),
            total_bytes = job.total_bytes(),
            "downloading"
        );
        self.download_all(&job, &credentials.server_base_url, &network, options)
            .await
    }

    async fn download_all(
        &self,
        job: &TransferJob,
        base_url: &str,
        network: &str,
        options: &TransferOptions,
    ) -> Result<JobOutput, TransferError> {
        let policy = self.config.retry_policy(options.retry_attempts);
        let tracker = Mutex::new(ProgressTracker::new(job.total_bytes(), job.files().len()));
        let started = self.clock.now();
        let job_id = job.job_id();

        let mut downloaded = Vec::with_capacity(job.files().len());
        let mut transferred: u64 = 0;

        for (index, file) in job.files().iter().enumerate() {
            if job.is_cancelled() {
                info!(job = %job_id, index, file = %file.name, "cancelled before file");
                return Err(TransferError::Aborted);
            }

            let completed = downloaded.len();
            let done_bytes = transferred;
            let report = |fraction: f64| {
                let elapsed = self.clock.now().saturating_duration_since(started);
                let snapshot = lock(&tracker).update(
                    completed,
                    done_bytes,
                    &file.name,
                    file.size_bytes,
                    fraction,
                    elapsed,
                );
                options.publish(snapshot);
            };
            let report = &report;

            let result = policy
                .execute(
                    job.cancel_token(),
                    |attempt| {
                        debug!(job = %job_id, file = %file.name, attempt, "downloading file");
                        self.download_once(base_url, job_id, file, report)
                    },
                    |err: &AttemptError, attempt: u32| {
                        warn!(
                            job = %job_id,
                            file = %file.name,
                            attempt,
                            error = %err,
                            "download attempt failed"
                        );
                    },
                )
                .await;

            match result {
                Ok(pulled) => {
                    let elapsed = self.clock.now().saturating_duration_since(started);
                    let snapshot = lock(&tracker).update(
                        completed + 1,
                        done_bytes,
                        &file.name,
                        file.size_bytes,
                        1.0,
                        elapsed,
                    );
                    options.publish(snapshot);
                    transferred = transferred.saturating_add(file.size_bytes);
                    downloaded.push(pulled);
                }
                Err(RetryError::Cancelled) => {
                    info!(job = %job_id, index, file = %file.name, "cancelled during retries");
                    return Err(TransferError::Aborted);
                }
                Err(RetryError::Exhausted {
                    last: AttemptError::NotConnected,
                    ..
                }) => {
                    return Err(TransferError::AssociationFailed {
                        network: network.to_string(),
                        message: "link lost".into(),
                    });
                }
                Err(RetryError::Exhausted { attempts, last }) => {
                    return Err(TransferError::DownloadFailed {
                        file: file.name.clone(),
                        attempts,
                        reason: last.to_string(),
                    });
                }
            }
        }

        let elapsed = self.clock.now().saturating_duration_since(started);
        Ok(JobOutput {
            files: downloaded,
            bytes: transferred,
            speed: bytes_per_sec(transferred, elapsed),
        })
    }

    async fn download_once(
        &self,
        base_url: &str,
        job_id: &str,
        file: &RemoteFileDescriptor,
        on_fraction: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<DownloadedFile, AttemptError> {
        if self.controller.ensure_connected().is_err() {
            return Err(AttemptError::NotConnected);
        }

        let timeout = self.config.download_timeout();
        let request = LinkRequest::get(
            endpoint_url(base_url, &self.config.download_path),
            self.config.connect_timeout(),
            timeout,
        )
        .query(NAME_PARAM, &file.name);

        on_fraction(0.0);
        let response = tokio::time::timeout(timeout, self.link.download(request, on_fraction))
            .await
            .map_err(|_| AttemptError::Timeout(timeout.as_millis() as u64))??;

        if !response.is_success() {
            return Err(AttemptError::Status(response.status));
        }

        let received = response.body.len() as u64;
        if received != file.size_bytes {
            warn!(
                file = %file.name,
                listed = file.size_bytes,
                received,
                "size differs from listing"
            );
        }

        if self.config.verify_hashes && is_sha256_hex(&file.content_hash) {
            verify_sha256(&response.body, &file.content_hash)?;
        }

        Ok(DownloadedFile {
            name: file.name.clone(),
            size_bytes: file.size_bytes,
            content_hash: file.content_hash.clone(),
            job_id: job_id.to_string(),
            data: response.body,
        })
    }

    fn require_link(&self, network: &str) -> Result<(), TransferError> {
        self.controller
            .ensure_connected()
            .map(|_| ())
            .map_err(|_| TransferError::AssociationFailed {
                network: network.to_string(),
                message: "link lost".into(),
            })
    }
}

/// Leaves the network if a job future is dropped before its own teardown.
struct TeardownGuard {
    controller: Option<Arc<ConnectionController>>,
}

impl TeardownGuard {
    fn new(controller: Arc<ConnectionController>) -> Self {
        Self {
            controller: Some(controller),
        }
    }

    fn disarm(mut self) {
        self.controller = None;
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Some(controller) = self.controller.take()
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            warn!("transfer dropped mid-flight, disconnecting");
            handle.spawn(async move {
                controller.disconnect(DisconnectReason::JobCancelled).await;
            });
        }
    }
}

fn bytes_per_sec(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { bytes as f64 / secs } else { 0.0 }
}

fn lock(tracker: &Mutex<ProgressTracker>) -> MutexGuard<'_, ProgressTracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}
