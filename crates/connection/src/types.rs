//! Public types for the connection controller.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default bound for one association attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Input to one connection attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionCredentials {
    /// SSID of the sensor's access point.
    pub network_name: String,
    pub secret: Option<String>,
    /// Base URL of the sensor application, e.g. `http://192.168.4.1`.
    pub server_base_url: String,
    /// Bound for the association step.
    pub timeout: Duration,
}

impl ConnectionCredentials {
    pub fn new(network_name: impl Into<String>, server_base_url: impl Into<String>) -> Self {
        Self {
            network_name: network_name.into(),
            secret: None,
            server_base_url: server_base_url.into(),
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ConnectionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCredentials")
            .field("network_name", &self.network_name)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("server_base_url", &self.server_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Association state. Exactly one is live per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
}

/// Snapshot of the current association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedNetwork {
    pub network_name: String,
    pub assigned_address: Option<IpAddr>,
    pub connected_at: DateTime<Utc>,
}

/// Why the controller left a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The caller asked for it.
    Requested,
    /// A job finished successfully.
    JobCompleted,
    /// A job failed.
    JobFailed,
    /// A job was cancelled.
    JobCancelled,
    /// A connect to a different network replaced this one.
    Replaced,
    /// The association attempt itself did not succeed.
    AttemptFailed,
    /// Engine cleanup.
    Cleanup,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::JobCompleted => "job completed",
            Self::JobFailed => "job failed",
            Self::JobCancelled => "job cancelled",
            Self::Replaced => "replaced by another network",
            Self::AttemptFailed => "association attempt failed",
            Self::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

/// Lifecycle events delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connecting { network_name: String },
    Connected(ConnectedNetwork),
    Disconnected {
        network_name: String,
        reason: DisconnectReason,
    },
}
