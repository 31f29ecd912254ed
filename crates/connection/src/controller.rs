//! Association state machine.
//!
//! Connect and disconnect are serialized by an operation lock, so exactly
//! one transition runs at a time. A connect to a different network tears
//! the current association down first. State reads never wait on that
//! lock.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::listeners::{ListenerSet, Subscription};
use crate::platform::{Connectivity, NetworkKind, PlatformError};
use crate::types::{
    ConnectedNetwork, ConnectionCredentials, ConnectionEvent, ConnectionState, DisconnectReason,
};

/// Bound for the platform teardown call.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced by [`ConnectionController`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("connectivity not supported on this runtime: {0}")]
    NotSupported(String),

    #[error("association with {network} timed out after {timeout_ms} ms")]
    Timeout { network: String, timeout_ms: u64 },

    #[error("association with {network} failed: {message}")]
    AssociationFailed { network: String, message: String },

    #[error("not connected")]
    NotConnected,
}

struct Inner {
    state: ConnectionState,
    current: Option<ConnectedNetwork>,
}

/// Owns the current association and its lifecycle events.
pub struct ConnectionController {
    connectivity: Arc<dyn Connectivity>,
    clock: Arc<dyn Clock>,
    expected_kind: NetworkKind,
    op_lock: tokio::sync::Mutex<()>,
    inner: RwLock<Inner>,
    listeners: ListenerSet,
}

impl ConnectionController {
    /// Creates an idle controller expecting WiFi attachments.
    pub fn new(connectivity: Arc<dyn Connectivity>, clock: Arc<dyn Clock>) -> Self {
        Self {
            connectivity,
            clock,
            expected_kind: NetworkKind::Wifi,
            op_lock: tokio::sync::Mutex::new(()),
            inner: RwLock::new(Inner {
                state: ConnectionState::Idle,
                current: None,
            }),
            listeners: ListenerSet::default(),
        }
    }

    /// Overrides the attachment kind checked by [`is_available`](Self::is_available).
    pub fn with_expected_kind(mut self, kind: NetworkKind) -> Self {
        self.expected_kind = kind;
        self
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.read().state
    }

    /// Current association, if connected.
    pub fn current_connection(&self) -> Option<ConnectedNetwork> {
        self.read().current.clone()
    }

    /// Returns the current association or [`ConnectionError::NotConnected`].
    ///
    /// Checked before every request to the sensor.
    pub fn ensure_connected(&self) -> Result<ConnectedNetwork, ConnectionError> {
        let inner = self.read();
        match (&inner.state, &inner.current) {
            (ConnectionState::Connected, Some(current)) => Ok(current.clone()),
            _ => Err(ConnectionError::NotConnected),
        }
    }

    /// `true` if the platform reports an attachment of the expected kind.
    pub async fn is_available(&self) -> bool {
        if self.connectivity.current_network_name().await.is_none() {
            return false;
        }
        self.connectivity
            .is_on_network_kind(self.expected_kind)
            .await
    }

    /// Registers a lifecycle listener.
    pub fn on_event<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Removes every lifecycle listener.
    pub fn clear_listeners(&self) {
        self.listeners.clear();
    }

    /// Joins the network described by `credentials`.
    ///
    /// Returns the existing snapshot if already connected to the same
    /// network. The platform call is bounded by `credentials.timeout`; on
    /// any failure the controller is back to [`ConnectionState::Idle`].
    pub async fn connect(
        &self,
        credentials: &ConnectionCredentials,
    ) -> Result<ConnectedNetwork, ConnectionError> {
        let _op = self.op_lock.lock().await;
        let network = credentials.network_name.as_str();

        if let Some(current) = self.current_connection() {
            if current.network_name == network {
                debug!(network = %network, "already connected");
                return Ok(current);
            }
            info!(
                from = %current.network_name,
                to = %network,
                "switching networks"
            );
            self.disconnect_locked(DisconnectReason::Replaced).await;
        }

        self.set_state(ConnectionState::Connecting, None);
        self.listeners.emit(&ConnectionEvent::Connecting {
            network_name: network.to_string(),
        });
        info!(
            network = %network,
            timeout_ms = credentials.timeout.as_millis() as u64,
            "associating"
        );

        let attempt = tokio::time::timeout(
            credentials.timeout,
            self.connectivity.connect(network, credentials.secret.as_deref()),
        )
        .await;

        let info = match attempt {
            Ok(Ok(info)) => info,
            Ok(Err(PlatformError::NotSupported(message))) => {
                warn!(network = %network, error = %message, "connectivity not supported");
                self.abort_attempt(network);
                return Err(ConnectionError::NotSupported(message));
            }
            Ok(Err(PlatformError::Failed(message))) => {
                warn!(network = %network, error = %message, "association failed");
                self.abort_attempt(network);
                return Err(ConnectionError::AssociationFailed {
                    network: network.to_string(),
                    message,
                });
            }
            Err(_) => {
                warn!(network = %network, "association timed out");
                self.abort_attempt(network);
                return Err(ConnectionError::Timeout {
                    network: network.to_string(),
                    timeout_ms: credentials.timeout.as_millis() as u64,
                });
            }
        };

        // Some platforms fall back to a remembered network when the join fails.
        if let Some(actual) = self.connectivity.current_network_name().await
            && actual != network
        {
            warn!(network = %network, actual = %actual, "attached to unexpected network");
            self.abort_attempt(network);
            return Err(ConnectionError::AssociationFailed {
                network: network.to_string(),
                message: format!("platform attached to {actual}"),
            });
        }

        let snapshot = ConnectedNetwork {
            network_name: network.to_string(),
            assigned_address: info.assigned_address,
            connected_at: self.clock.timestamp(),
        };
        self.set_state(ConnectionState::Connected, Some(snapshot.clone()));
        self.listeners.emit(&ConnectionEvent::Connected(snapshot.clone()));
        info!(
            network = %network,
            address = ?snapshot.assigned_address,
            "connected"
        );
        Ok(snapshot)
    }

    /// Leaves the current network. No-op when idle.
    ///
    /// Platform teardown failures are logged, never returned; the snapshot
    /// is cleared either way.
    pub async fn disconnect(&self, reason: DisconnectReason) {
        let _op = self.op_lock.lock().await;
        self.disconnect_locked(reason).await;
    }

    async fn disconnect_locked(&self, reason: DisconnectReason) {
        let network = {
            let inner = self.read();
            if inner.state == ConnectionState::Idle {
                return;
            }
            inner
                .current
                .as_ref()
                .map(|c| c.network_name.clone())
                .unwrap_or_default()
        };

        self.write().state = ConnectionState::Disconnecting;
        debug!(network = %network, reason = %reason, "disconnecting");

        match tokio::time::timeout(DISCONNECT_TIMEOUT, self.connectivity.disconnect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(network = %network, error = %e, "platform teardown failed"),
            Err(_) => warn!(network = %network, "platform teardown timed out"),
        }

        self.set_state(ConnectionState::Idle, None);
        self.listeners.emit(&ConnectionEvent::Disconnected {
            network_name: network.clone(),
            reason,
        });
        info!(network = %network, reason = %reason, "disconnected");
    }

    fn abort_attempt(&self, network: &str) {
        self.set_state(ConnectionState::Idle, None);
        self.listeners.emit(&ConnectionEvent::Disconnected {
            network_name: network.to_string(),
            reason: DisconnectReason::AttemptFailed,
        });
    }

    fn set_state(&self, state: ConnectionState, current: Option<ConnectedNetwork>) {
        let mut inner = self.write();
        debug!(from = ?inner.state, to = ?state, "connection state changed");
        inner.state = state;
        inner.current = current;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
