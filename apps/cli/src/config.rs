//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/fieldlink/fieldlink.toml`
//! - Windows: `%APPDATA%/fieldlink/fieldlink.toml`
//!
//! A missing file means defaults. Command-line flags override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use fieldlink_connection::{ConnectionCredentials, DEFAULT_CONNECT_TIMEOUT};
use fieldlink_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// The sensor to pull from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// SSID of the sensor's access point.
    pub ssid: String,
    pub secret: Option<String>,
    /// Base URL of the sensor application once associated.
    pub server_url: String,
    /// Association timeout.
    pub timeout_ms: u64,
    /// WiFi interface to use; `None` lets NetworkManager pick.
    pub interface: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            secret: None,
            server_url: "http://192.168.4.1".into(),
            timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            interface: None,
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory pulled jobs are written under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("fieldlink-data")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            device: DeviceConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ssid: Option<String>,
    pub secret: Option<String>,
    pub server_url: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Loads `path`, or the default location when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: CliConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(ssid) = overrides.ssid {
            self.device.ssid = ssid;
        }
        if let Some(secret) = overrides.secret {
            self.device.secret = Some(secret);
        }
        if let Some(url) = overrides.server_url {
            self.device.server_url = url;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
    }

    /// Credentials for the configured sensor.
    pub fn credentials(&self) -> anyhow::Result<ConnectionCredentials> {
        let device = &self.device;
        if device.ssid.trim().is_empty() {
            anyhow::bail!("no sensor SSID configured (set [device] ssid or pass --ssid)");
        }
        if device.server_url.trim().is_empty() {
            anyhow::bail!(
                "no sensor URL configured (set [device] server_url or pass --server-url)"
            );
        }

        let mut creds = ConnectionCredentials::new(&device.ssid, &device.server_url)
            .with_timeout(Duration::from_millis(device.timeout_ms));
        if let Some(secret) = device.secret.as_deref().filter(|s| !s.is_empty()) {
            creds = creds.with_secret(secret);
        }
        Ok(creds)
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").context("APPDATA is not set")?;
        Ok(PathBuf::from(appdata).join("fieldlink").join("fieldlink.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("fieldlink")
            .join("fieldlink.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CliConfig::default();
        assert!(config.device.ssid.is_empty());
        assert_eq!(config.device.server_url, "http://192.168.4.1");
        assert_eq!(config.device.timeout_ms, 20_000);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn partial_toml() {
        let toml_str = r#"
            output_dir = "/data/pulls"

            [device]
            ssid = "SENSOR-0042"

            [engine]
            default_retry_attempts = 5
        "#;
        let config: CliConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/data/pulls"));
        assert_eq!(config.device.ssid, "SENSOR-0042");
        assert_eq!(config.device.server_url, "http://192.168.4.1");
        assert_eq!(config.engine.default_retry_attempts, 5);
        assert_eq!(config.engine.settle_delay_ms, 1500);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CliConfig::load(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fieldlink.toml");
        std::fs::write(
            &path,
            "[device]\nssid = \"S1\"\nsecret = \"pw\"\ntimeout_ms = 5000\n",
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        let creds = config.credentials().unwrap();
        assert_eq!(creds.network_name, "S1");
        assert_eq!(creds.secret.as_deref(), Some("pw"));
        assert_eq!(creds.timeout, Duration::from_secs(5));
    }

    #[test]
    fn load_rejects_bad_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fieldlink.toml");
        std::fs::write(&path, "[device\nssid = ").unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn overrides_win() {
        let mut config = CliConfig::default();
        config.device.ssid = "FROM-FILE".into();
        config.apply(Overrides {
            ssid: Some("FROM-FLAG".into()),
            secret: None,
            server_url: Some("http://10.0.0.1:8080".into()),
            output_dir: Some(PathBuf::from("out")),
        });
        assert_eq!(config.device.ssid, "FROM-FLAG");
        assert_eq!(config.device.secret, None);
        assert_eq!(config.device.server_url, "http://10.0.0.1:8080");
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn credentials_require_ssid() {
        assert!(CliConfig::default().credentials().is_err());
    }

    #[test]
    fn empty_secret_means_open_network() {
        let mut config = CliConfig::default();
        config.device.ssid = "OPEN".into();
        config.device.secret = Some(String::new());
        assert_eq!(config.credentials().unwrap().secret, None);
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("fieldlink"));
    }
}
