//! Wire types for the SoftAP file-pull protocol.
//!
//! The sensor serves three endpoints over its access point: a health
//! check, a per-job file listing, and a per-file download. This crate
//! holds the listing format, the endpoint defaults, and the data model
//! shared by the engine crates.

pub mod constants;
pub mod listing;
pub mod types;

// Re-export primary types for convenience.
pub use listing::{FileListing, ListedFile, ListingError, parse_listing};
pub use types::{
    DownloadedFile, RemoteFileDescriptor, TransferProgressSnapshot, TransferStatistics,
};
