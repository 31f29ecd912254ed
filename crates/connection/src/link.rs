//! Request primitive used for every call to the sensor.
//!
//! The sensor is only reachable while associated, on a private address
//! (`192.168.4.1`-class). Implementations must honour both timeouts.

use std::time::Duration;

use crate::BoxFuture;

/// HTTP-style method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One bounded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl LinkRequest {
    /// Creates a GET request with the given timeouts.
    pub fn get(url: impl Into<String>, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            connect_timeout,
            read_timeout,
        }
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Response to a [`LinkRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl LinkResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LinkError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Issues requests over whatever network the host is currently on.
pub trait LinkClient: Send + Sync {
    /// Sends a request and buffers the whole response.
    fn send(&self, request: LinkRequest) -> BoxFuture<'_, Result<LinkResponse, LinkError>>;

    /// Like [`send`](Self::send), reporting the received fraction of the
    /// body (0.0–1.0) as it arrives.
    ///
    /// The default implementation reports `1.0` once the response is in.
    fn download<'a>(
        &'a self,
        request: LinkRequest,
        on_fraction: &'a (dyn Fn(f64) + Send + Sync),
    ) -> BoxFuture<'a, Result<LinkResponse, LinkError>> {
        Box::pin(async move {
            let response = self.send(request).await?;
            on_fraction(1.0);
            Ok(response)
        })
    }
}
