//! `wpa_supplicant`-backed discovery agents.
//!
//! The launcher renders a per-interface supplicant configuration, clears any
//! stale supplicant left over from an earlier run, and spawns a fresh
//! process. Control commands are relayed with `wpa_cli` over the agent's
//! control socket.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use peerlink_core::Endpoint;

use super::{AgentError, AgentLauncher, AgentProcess};
use crate::infrastructure::exec::{run_command, ExecError};
use crate::infrastructure::storage::config::AgentSettings;

/// Renders the supplicant configuration for one endpoint.
///
/// `device_type` is fixed to the generic PC category so peers list us with a
/// sensible primary device type.
pub fn render_config(
    endpoint: &Endpoint,
    ctrl_dir: &str,
    go_intent: u32,
    listen_channel: u32,
) -> String {
    format!(
        "ctrl_interface={ctrl_dir}\n\
         update_config=1\n\
         device_name={device_name}\n\
         device_type=1-0050F204-1\n\
         p2p_go_intent={go_intent}\n\
         p2p_oper_reg_class=81\n\
         p2p_oper_channel={listen_channel}\n",
        device_name = endpoint.device_name(),
    )
}

/// Spawns one `wpa_supplicant` per interface.
pub struct SupplicantLauncher {
    supplicant_bin: String,
    cli_bin: String,
    driver: String,
    ctrl_dir: String,
    config_dir: PathBuf,
    command_timeout: Duration,
}

impl SupplicantLauncher {
    pub fn new(settings: &AgentSettings) -> Self {
        Self {
            supplicant_bin: settings.supplicant_bin.clone(),
            cli_bin: settings.cli_bin.clone(),
            driver: settings.driver.clone(),
            ctrl_dir: settings.ctrl_dir.clone(),
            config_dir: settings.config_dir.clone(),
            command_timeout: settings.command_timeout(),
        }
    }

    /// Kills any supplicant already attached to the interface.
    ///
    /// A stale agent from an interrupted run would hold the control socket
    /// and shadow the new one. Failure here is ignored: usually it just
    /// means there was nothing to kill.
    async fn clear_stale_agent(&self, interface: &str) {
        let pattern = format!("wpa_supplicant.*-i {interface}");
        match run_command("pkill", &["-f", &pattern], Duration::from_secs(2)).await {
            Ok(output) if output.success => {
                info!(interface, "cleared stale discovery agent");
            }
            Ok(_) => {}
            Err(e) => debug!(interface, error = %e, "stale agent sweep skipped"),
        }
    }
}

#[async_trait]
impl AgentLauncher for SupplicantLauncher {
    async fn launch(
        &self,
        endpoint: &Endpoint,
        config_blob: &str,
    ) -> Result<Box<dyn AgentProcess>, AgentError> {
        let interface = endpoint.interface();
        let config_path = self.config_dir.join(format!("{interface}.conf"));

        std::fs::create_dir_all(&self.config_dir).map_err(|source| AgentError::ConfigWrite {
            path: self.config_dir.clone(),
            source,
        })?;
        std::fs::write(&config_path, config_blob).map_err(|source| AgentError::ConfigWrite {
            path: config_path.clone(),
            source,
        })?;

        self.clear_stale_agent(interface).await;

        // The agent outlives this process on purpose: a pairing that
        // succeeded should not drop when the controller exits. Reruns
        // supersede it through the stale-agent sweep above.
        let child = Command::new(&self.supplicant_bin)
            .args([
                "-i",
                interface,
                "-D",
                &self.driver,
                "-c",
                &config_path.to_string_lossy(),
            ])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| AgentError::SpawnFailed {
                interface: interface.to_string(),
                source,
            })?;

        info!(interface, config = %config_path.display(), "discovery agent started");

        Ok(Box::new(SupplicantProcess {
            child,
            interface: interface.to_string(),
            cli_bin: self.cli_bin.clone(),
            ctrl_dir: self.ctrl_dir.clone(),
            timeout: self.command_timeout,
            stopped: false,
        }))
    }
}

/// A spawned supplicant plus the `wpa_cli` plumbing to talk to it.
#[derive(Debug)]
pub struct SupplicantProcess {
    child: Child,
    interface: String,
    cli_bin: String,
    ctrl_dir: String,
    timeout: Duration,
    stopped: bool,
}

#[async_trait]
impl AgentProcess for SupplicantProcess {
    fn interface(&self) -> &str {
        &self.interface
    }

    async fn is_alive(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn command(&mut self, command: &str) -> Result<String, AgentError> {
        let mut args = vec!["-p", &self.ctrl_dir, "-i", &self.interface];
        args.extend(command.split_whitespace());

        let output = run_command(&self.cli_bin, &args, self.timeout)
            .await
            .map_err(|e| match e {
                ExecError::Launch { source, .. } => AgentError::CommandFailed {
                    interface: self.interface.clone(),
                    command: command.to_string(),
                    source,
                },
                ExecError::Timeout { .. } => AgentError::CommandTimeout {
                    interface: self.interface.clone(),
                    command: command.to_string(),
                },
            })?;

        // wpa_cli exits non-zero only when it cannot reach the control
        // socket. A reachable agent that dislikes the command still exits
        // zero and answers FAIL in the body.
        if !output.success {
            warn!(
                interface = %self.interface,
                command,
                stderr = %output.stderr.trim(),
                "agent control socket unreachable"
            );
            return Err(AgentError::Unavailable {
                interface: self.interface.clone(),
            });
        }

        Ok(output.stdout)
    }

    async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if self.child.start_kill().is_ok() {
            let _ = self.child.wait().await;
        }
        info!(interface = %self.interface, "discovery agent stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use peerlink_core::MacAddr;

    fn make_endpoint() -> Endpoint {
        Endpoint::new(
            "wlan0",
            "02:00:00:00:01:00".parse::<MacAddr>().unwrap(),
            "192.168.49.1".parse::<IpAddr>().unwrap(),
            "station-one",
        )
    }

    fn make_settings(config_dir: PathBuf) -> AgentSettings {
        AgentSettings {
            supplicant_bin: "/nonexistent/peerlink-supplicant".to_string(),
            cli_bin: "wpa_cli".to_string(),
            driver: "nl80211".to_string(),
            ctrl_dir: "/var/run/wpa_supplicant".to_string(),
            config_dir,
            go_intent: 7,
            listen_channel: 1,
            command_timeout_secs: 10,
        }
    }

    #[test]
    fn test_render_config_carries_endpoint_identity() {
        // Act
        let blob = render_config(&make_endpoint(), "/var/run/wpa_supplicant", 7, 1);

        // Assert
        assert!(blob.contains("ctrl_interface=/var/run/wpa_supplicant\n"));
        assert!(blob.contains("device_name=station-one\n"));
        assert!(blob.contains("device_type=1-0050F204-1\n"));
        assert!(blob.contains("p2p_go_intent=7\n"));
        assert!(blob.contains("p2p_oper_channel=1\n"));
    }

    #[tokio::test]
    async fn test_launch_missing_binary_is_spawn_error() {
        // Arrange
        let config_dir = std::env::temp_dir().join("peerlink-test-launch");
        let launcher = SupplicantLauncher::new(&make_settings(config_dir.clone()));

        // Act
        let err = launcher
            .launch(&make_endpoint(), "update_config=1\n")
            .await
            .unwrap_err();

        // Assert: the config was written, then the spawn itself failed.
        assert!(matches!(err, AgentError::SpawnFailed { .. }));
        assert!(config_dir.join("wlan0.conf").exists());
        let _ = std::fs::remove_dir_all(config_dir);
    }

    #[tokio::test]
    async fn test_launch_unwritable_config_dir_is_config_error() {
        // Arrange: a regular file where the config directory should be.
        let blocker = std::env::temp_dir().join("peerlink-test-blocker");
        std::fs::write(&blocker, b"x").expect("temp file");
        let launcher = SupplicantLauncher::new(&make_settings(blocker.join("sub")));

        // Act
        let err = launcher
            .launch(&make_endpoint(), "update_config=1\n")
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, AgentError::ConfigWrite { .. }));
        let _ = std::fs::remove_file(blocker);
    }
}
