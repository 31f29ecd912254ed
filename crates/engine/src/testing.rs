//! In-memory sensor and radio used by the engine tests.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fieldlink_connection::{
    BoxFuture, ConnectionCredentials, Connectivity, LinkClient, LinkError, LinkRequest,
    LinkResponse, NetworkInfo, NetworkKind, PlatformError,
};
use fieldlink_transfer::checksum_bytes;

use crate::config::EngineConfig;

pub const SSID: &str = "SENSOR-0042";
pub const BASE_URL: &str = "http://192.168.4.1";

pub fn creds() -> ConnectionCredentials {
    ConnectionCredentials::new(SSID, BASE_URL).with_secret("sensor-pass")
}

/// Config with retry waits short enough for paused-time tests.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        settle_delay_ms: 100,
        retry_delay_ms: 50,
        ..EngineConfig::default()
    }
}

#[derive(Default)]
pub struct FakeWifi {
    pub current: Mutex<Option<String>>,
    pub connect_calls: Mutex<u32>,
    pub disconnect_calls: Mutex<u32>,
    pub fail_connect: Option<PlatformError>,
}

impl FakeWifi {
    pub fn failing(err: PlatformError) -> Arc<Self> {
        Arc::new(Self {
            fail_connect: Some(err),
            ..Self::default()
        })
    }

    pub fn is_attached(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    pub fn disconnects(&self) -> u32 {
        *self.disconnect_calls.lock().unwrap()
    }
}

impl Connectivity for FakeWifi {
    fn connect<'a>(
        &'a self,
        ssid: &'a str,
        _secret: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NetworkInfo, PlatformError>> {
        Box::pin(async move {
            *self.connect_calls.lock().unwrap() += 1;
            if let Some(e) = &self.fail_connect {
                return Err(e.clone());
            }
            *self.current.lock().unwrap() = Some(ssid.to_string());
            Ok(NetworkInfo {
                assigned_address: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 4, 2))),
            })
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            *self.disconnect_calls.lock().unwrap() += 1;
            *self.current.lock().unwrap() = None;
            Ok(())
        })
    }

    fn current_network_name(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move { self.current.lock().unwrap().clone() })
    }

    fn is_on_network_kind(&self, kind: NetworkKind) -> BoxFuture<'_, bool> {
        Box::pin(async move { kind == NetworkKind::Wifi })
    }
}

/// A sensor serving one job.
///
/// Only answers while `wifi` is attached; any request made otherwise is
/// counted in `offline_requests` and fails with a connect error.
pub struct FakeSensor {
    wifi: Arc<FakeWifi>,
    pub job_id: String,
    files: Vec<(String, Vec<u8>)>,
    pub health_status: u16,
    pub listing_override: Option<String>,
    /// Remaining forced failures per file name.
    pub failures: Mutex<HashMap<String, u32>>,
    /// Bytes to serve instead of the real content, per file name.
    pub corrupt: Mutex<HashMap<String, Vec<u8>>>,
    /// Time spent serving each download.
    pub download_delay: Duration,
    pub requests: Mutex<Vec<String>>,
    pub offline_requests: Mutex<u32>,
}

impl FakeSensor {
    pub fn new(wifi: Arc<FakeWifi>, job_id: &str, files: &[(&str, usize)]) -> Self {
        Self {
            wifi,
            job_id: job_id.to_string(),
            files: files
                .iter()
                .map(|(name, size)| (name.to_string(), vec![b'x'; *size]))
                .collect(),
            health_status: 200,
            listing_override: None,
            failures: Mutex::new(HashMap::new()),
            corrupt: Mutex::new(HashMap::new()),
            download_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            offline_requests: Mutex::new(0),
        }
    }

    pub fn fail_times(self, name: &str, times: u32) -> Self {
        self.failures.lock().unwrap().insert(name.to_string(), times);
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.strip_prefix("download:").map(str::to_string))
            .collect()
    }

    pub fn offline(&self) -> u32 {
        *self.offline_requests.lock().unwrap()
    }

    fn listing(&self) -> String {
        if let Some(body) = &self.listing_override {
            return body.clone();
        }
        let files: Vec<_> = self
            .files
            .iter()
            .map(|(name, data)| {
                serde_json::json!({
                    "name": name,
                    "size": data.len(),
                    "hash": checksum_bytes(data),
                })
            })
            .collect();
        serde_json::json!({ "jobId": self.job_id, "files": files }).to_string()
    }

    fn serve(&self, request: &LinkRequest) -> Result<LinkResponse, LinkError> {
        if !self.wifi.is_attached() {
            *self.offline_requests.lock().unwrap() += 1;
            return Err(LinkError::Connect("network is unreachable".into()));
        }

        let endpoint = request.url.rsplit('/').next().unwrap_or_default();
        match endpoint {
            "health" => {
                self.requests.lock().unwrap().push("health".into());
                Ok(LinkResponse::new(self.health_status, b"ok".to_vec()))
            }
            "files" => {
                self.requests.lock().unwrap().push("files".into());
                Ok(LinkResponse::new(200, self.listing().into_bytes()))
            }
            "download" => {
                let name = request.query_value("name").unwrap_or_default().to_string();
                self.requests
                    .lock()
                    .unwrap()
                    .push(format!("download:{name}"));

                if let Some(left) = self.failures.lock().unwrap().get_mut(&name)
                    && *left > 0
                {
                    *left -= 1;
                    return Ok(LinkResponse::new(500, Vec::new()));
                }
                if let Some(bytes) = self.corrupt.lock().unwrap().get(&name) {
                    return Ok(LinkResponse::new(200, bytes.clone()));
                }
                match self.files.iter().find(|(n, _)| *n == name) {
                    Some((_, data)) => Ok(LinkResponse::new(200, data.clone())),
                    None => Ok(LinkResponse::new(404, Vec::new())),
                }
            }
            _ => Ok(LinkResponse::new(404, Vec::new())),
        }
    }
}

impl LinkClient for FakeSensor {
    fn send(&self, request: LinkRequest) -> BoxFuture<'_, Result<LinkResponse, LinkError>> {
        Box::pin(async move { self.serve(&request) })
    }

    fn download<'a>(
        &'a self,
        request: LinkRequest,
        on_fraction: &'a (dyn Fn(f64) + Send + Sync),
    ) -> BoxFuture<'a, Result<LinkResponse, LinkError>> {
        Box::pin(async move {
            on_fraction(0.5);
            if !self.download_delay.is_zero() {
                tokio::time::sleep(self.download_delay).await;
            }
            let response = self.serve(&request)?;
            if response.is_success() {
                on_fraction(1.0);
            }
            Ok(response)
        })
    }
}
