//! Platform connectivity collaborator.
//!
//! Implemented by the host application on top of whatever the OS offers
//! (NetworkManager, a mobile WiFi API, ...). Using a trait keeps the
//! controller free of radio details and testable with fakes.

use std::net::IpAddr;

use crate::BoxFuture;

/// Kind of network attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkKind {
    Wifi,
    Ethernet,
    Cellular,
    Other,
}

/// What the platform reports after a successful association.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    pub assigned_address: Option<IpAddr>,
}

/// Errors from the platform collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    /// The runtime cannot join networks at all.
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Failed(String),
}

/// Join/leave networks and report the current attachment.
pub trait Connectivity: Send + Sync {
    /// Joins the network `ssid`.
    fn connect<'a>(
        &'a self,
        ssid: &'a str,
        secret: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NetworkInfo, PlatformError>>;

    /// Leaves the network joined by [`connect`](Self::connect).
    fn disconnect(&self) -> BoxFuture<'_, Result<(), PlatformError>>;

    /// Name of the network the host is attached to, if any.
    fn current_network_name(&self) -> BoxFuture<'_, Option<String>>;

    /// Whether the active attachment is of the given kind.
    fn is_on_network_kind(&self, kind: NetworkKind) -> BoxFuture<'_, bool>;
}
