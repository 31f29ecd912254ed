//! Public entry point wiring the controller, orchestrator and statistics.

use std::sync::Arc;

use fieldlink_connection::{
    Clock, ConnectedNetwork, ConnectionController, ConnectionCredentials, ConnectionEvent,
    Connectivity, DisconnectReason, LinkClient, Subscription, SystemClock,
};
use fieldlink_protocol::{DownloadedFile, TransferStatistics};
use fieldlink_transfer::StatsAccumulator;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::TransferError;
use crate::orchestrator::{TransferOptions, TransferOrchestrator};

/// One engine per host process.
///
/// Only one job runs at a time. Concurrent [`transfer_files`](Self::transfer_files)
/// calls wait their turn in arrival order.
pub struct SyncEngine {
    controller: Arc<ConnectionController>,
    stats: Arc<StatsAccumulator>,
    orchestrator: TransferOrchestrator,
    job_lock: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        connectivity: Arc<dyn Connectivity>,
        link: Arc<dyn LinkClient>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(connectivity, link, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        connectivity: Arc<dyn Connectivity>,
        link: Arc<dyn LinkClient>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let controller = Arc::new(ConnectionController::new(connectivity, clock.clone()));
        let stats = Arc::new(StatsAccumulator::new());
        let orchestrator =
            TransferOrchestrator::new(controller.clone(), link, clock, stats.clone(), config);
        Self {
            controller,
            stats,
            orchestrator,
            job_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs one pull job. Queues behind any job already running.
    pub async fn transfer_files(
        &self,
        credentials: &ConnectionCredentials,
        job_id: &str,
        options: TransferOptions,
    ) -> Result<Vec<DownloadedFile>, TransferError> {
        let _job = match self.job_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(job = %job_id, "waiting for running job");
                self.job_lock.lock().await
            }
        };
        self.orchestrator
            .transfer_files(credentials, job_id, options)
            .await
    }

    /// Copy of the process-lifetime statistics.
    pub fn stats(&self) -> TransferStatistics {
        self.stats.snapshot()
    }

    pub fn on_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.controller.on_event(listener)
    }

    pub fn current_connection(&self) -> Option<ConnectedNetwork> {
        self.controller.current_connection()
    }

    pub async fn is_available(&self) -> bool {
        self.controller.is_available().await
    }

    pub fn controller(&self) -> &Arc<ConnectionController> {
        &self.controller
    }

    pub fn config(&self) -> &EngineConfig {
        self.orchestrator.config()
    }

    /// Leaves the network if still connected and drops every listener.
    pub async fn cleanup(&self) {
        info!("engine cleanup");
        self.controller.disconnect(DisconnectReason::Cleanup).await;
        self.controller.clear_listeners();
    }
}
