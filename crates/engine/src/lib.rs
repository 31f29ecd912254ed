//! SoftAP file-pull flow.
//!
//! This crate implements the **business logic** for pulling recorded files
//! off a field sensor. It has no UI or radio dependencies: the host
//! application provides a [`Connectivity`](fieldlink_connection::Connectivity)
//! and a [`LinkClient`](fieldlink_connection::LinkClient) implementation.
//!
//! # Pipeline
//!
//! 1. **Connect**: join the sensor's access point, then wait for it to settle
//! 2. **Probe**: confirm the sensor application answers
//! 3. **List**: fetch and validate the job's file listing
//! 4. **Download**: pull each file in order, with retries
//! 5. **Teardown**: record statistics and leave the network

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience.
pub use catalog::{CatalogError, FileCatalog};
pub use config::EngineConfig;
pub use engine::SyncEngine;
pub use error::{ErrorKind, TransferError};
pub use orchestrator::{ProgressCallback, TransferOptions, TransferOrchestrator};
