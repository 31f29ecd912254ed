//! Linux connectivity through NetworkManager's `nmcli`.

use std::net::IpAddr;
use std::process::Stdio;
use std::sync::Mutex;

use fieldlink_connection::{BoxFuture, Connectivity, NetworkInfo, NetworkKind, PlatformError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Joins and leaves WiFi networks by shelling out to `nmcli`.
pub struct NmcliConnectivity {
    interface: Option<String>,
    /// Connection profile created by the last successful join.
    joined: Mutex<Option<String>>,
}

impl NmcliConnectivity {
    pub fn new(interface: Option<String>) -> Self {
        Self {
            interface,
            joined: Mutex::new(None),
        }
    }

    fn joined(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.joined
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Runs `nmcli` in terse mode and returns its stdout.
async fn nmcli(args: &[&str]) -> Result<String, PlatformError> {
    nmcli_with_input(args, None).await
}

/// Runs `nmcli` in terse mode, feeding `input` to its stdin.
///
/// Secrets go through stdin with `--ask` so they never show up in the
/// process arguments.
async fn nmcli_with_input(args: &[&str], input: Option<&str>) -> Result<String, PlatformError> {
    let spawn_error = |e: std::io::Error| match e.kind() {
        std::io::ErrorKind::NotFound => {
            PlatformError::NotSupported("nmcli not found; NetworkManager is required".into())
        }
        _ => PlatformError::Failed(format!("failed to run nmcli: {e}")),
    };

    let mut command = Command::new("nmcli");
    command.arg("--terse");
    if input.is_some() {
        command.arg("--ask");
    }
    let mut child = command
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;

    if let Some(input) = input
        && let Some(mut stdin) = child.stdin.take()
    {
        stdin
            .write_all(secret_line(input).as_bytes())
            .await
            .map_err(|e| PlatformError::Failed(format!("failed to pass secret to nmcli: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| PlatformError::Failed(format!("failed to run nmcli: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlatformError::Failed(stderr.trim().to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl Connectivity for NmcliConnectivity {
    fn connect<'a>(
        &'a self,
        ssid: &'a str,
        secret: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NetworkInfo, PlatformError>> {
        Box::pin(async move {
            let args = connect_args(ssid, self.interface.as_deref());

            tracing::debug!(ssid = %ssid, interface = ?self.interface, "nmcli connect");
            nmcli_with_input(&args, secret).await?;
            *self.joined() = Some(ssid.to_string());

            Ok(NetworkInfo {
                assigned_address: wifi_address(self.interface.as_deref()),
            })
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<(), PlatformError>> {
        Box::pin(async move {
            let Some(profile) = self.joined().take() else {
                return Ok(());
            };
            tracing::debug!(profile = %profile, "nmcli connection down");
            nmcli(&["connection", "down", "id", &profile]).await?;
            Ok(())
        })
    }

    fn current_network_name(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            let out = nmcli(&[
                "--fields", "ACTIVE,SSID", "device", "wifi", "list", "--rescan", "no",
            ])
            .await
            .ok()?;
            active_ssid(&out)
        })
    }

    fn is_on_network_kind(&self, kind: NetworkKind) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match nmcli(&["--fields", "TYPE,STATE", "device", "status"]).await {
                Ok(out) => connected_kinds(&out).contains(&kind),
                Err(_) => false,
            }
        })
    }
}

/// Arguments for joining `ssid`. The passphrase is never among them.
fn connect_args<'a>(ssid: &'a str, interface: Option<&'a str>) -> Vec<&'a str> {
    let mut args = vec!["device", "wifi", "connect", ssid];
    if let Some(iface) = interface {
        args.extend(["ifname", iface]);
    }
    args
}

/// Stdin line answering nmcli's passphrase prompt.
fn secret_line(secret: &str) -> String {
    format!("{secret}\n")
}

/// Splits one line of `nmcli --terse` output. Literal colons in values
/// are escaped as `\:`.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// SSID of the active WiFi network from `ACTIVE,SSID` output.
fn active_ssid(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let fields = split_terse(line);
        match fields.as_slice() {
            [active, ssid] if active == "yes" && !ssid.is_empty() => Some(ssid.clone()),
            _ => None,
        }
    })
}

/// Kinds of every connected device from `TYPE,STATE` output.
fn connected_kinds(output: &str) -> Vec<NetworkKind> {
    output
        .lines()
        .filter_map(|line| {
            let fields = split_terse(line);
            let [kind, state] = fields.as_slice() else {
                return None;
            };
            if !state.starts_with("connected") {
                return None;
            }
            Some(match kind.as_str() {
                "wifi" => NetworkKind::Wifi,
                "ethernet" => NetworkKind::Ethernet,
                "gsm" | "cdma" => NetworkKind::Cellular,
                _ => NetworkKind::Other,
            })
        })
        .collect()
}

/// IPv4 address on the WiFi interface, excluding loopback and link-local.
fn wifi_address(interface: Option<&str>) -> Option<IpAddr> {
    let interfaces = if_addrs::get_if_addrs().ok()?;
    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .filter(|iface| interface.is_none_or(|name| iface.name == name))
        .filter(|iface| interface.is_some() || iface.name.starts_with("wl"))
        .find_map(|iface| match iface.ip() {
            IpAddr::V4(v4) if !v4.is_link_local() => Some(IpAddr::V4(v4)),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_args_never_carry_the_secret() {
        assert_eq!(
            connect_args("SENSOR-0042", None),
            ["device", "wifi", "connect", "SENSOR-0042"]
        );
        let args = connect_args("SENSOR-0042", Some("wlan1"));
        assert_eq!(args, ["device", "wifi", "connect", "SENSOR-0042", "ifname", "wlan1"]);
        assert!(!args.contains(&"password"));
        assert_eq!(secret_line("hunter22"), "hunter22\n");
    }

    #[test]
    fn terse_escapes() {
        assert_eq!(split_terse("yes:SENSOR-0042"), ["yes", "SENSOR-0042"]);
        assert_eq!(split_terse(r"yes:odd\:name"), ["yes", "odd:name"]);
        assert_eq!(split_terse("no:"), ["no", ""]);
    }

    #[test]
    fn finds_active_ssid() {
        let out = "no:HomeNet\nyes:SENSOR-0042\nno:Cafe\n";
        assert_eq!(active_ssid(out).as_deref(), Some("SENSOR-0042"));
        assert_eq!(active_ssid("no:HomeNet\n"), None);
        assert_eq!(active_ssid(""), None);
    }

    #[test]
    fn connected_device_kinds() {
        let out = "wifi:connected\n\
                   ethernet:unavailable\n\
                   loopback:connected (externally)\n\
                   gsm:connected\n";
        let kinds = connected_kinds(out);
        assert_eq!(
            kinds,
            [NetworkKind::Wifi, NetworkKind::Other, NetworkKind::Cellular]
        );
        assert!(connected_kinds("wifi:disconnected\n").is_empty());
    }

    #[tokio::test]
    async fn disconnect_without_join_is_a_no_op() {
        let wifi = NmcliConnectivity::new(None);
        assert!(wifi.disconnect().await.is_ok());
    }
}
