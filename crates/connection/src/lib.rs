//! Connection layer for pulling files over a sensor-hosted access point.
//!
//! The engine never touches the radio. It drives a platform
//! [`Connectivity`] collaborator to join and leave the sensor's network and
//! issues every request through a [`LinkClient`]. The
//! [`ConnectionController`] serializes association changes and owns the
//! current-connection snapshot; [`ReachabilityProbe`] confirms the sensor
//! application answers before any real work starts.

pub mod clock;
pub mod controller;
mod listeners;
pub mod link;
pub mod platform;
pub mod probe;
pub mod types;

use std::future::Future;
use std::pin::Pin;

pub use clock::{Clock, SystemClock};
pub use controller::{ConnectionController, ConnectionError};
pub use link::{LinkClient, LinkError, LinkRequest, LinkResponse, Method};
pub use listeners::{EventListener, Subscription};
pub use platform::{Connectivity, NetworkInfo, NetworkKind, PlatformError};
pub use probe::{ProbeError, ReachabilityProbe};
pub use types::{
    ConnectedNetwork, ConnectionCredentials, ConnectionEvent, ConnectionState,
    DEFAULT_CONNECT_TIMEOUT, DisconnectReason,
};

/// Boxed future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
