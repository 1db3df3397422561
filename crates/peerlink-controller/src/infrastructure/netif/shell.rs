//! Shell-backed [`LinkControl`] built on the `ip` and `iw` utilities.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{channel_center_mhz, LinkControl, LinkError};
use crate::infrastructure::exec::{run_command, ExecError, DEFAULT_COMMAND_TIMEOUT};

/// Interface administration via `ip link` and `iw dev`.
pub struct ShellLinkControl {
    ip_bin: String,
    iw_bin: String,
    timeout: Duration,
}

impl ShellLinkControl {
    pub fn new() -> Self {
        Self {
            ip_bin: "ip".to_string(),
            iw_bin: "iw".to_string(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Overrides the utility paths, for installs that keep them off `PATH`.
    pub fn with_binaries(ip_bin: impl Into<String>, iw_bin: impl Into<String>) -> Self {
        Self {
            ip_bin: ip_bin.into(),
            iw_bin: iw_bin.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    async fn run_link_action(
        &self,
        bin: &str,
        args: &[&str],
        interface: &str,
        action: &'static str,
    ) -> Result<(), LinkError> {
        let output = run_command(bin, args, self.timeout)
            .await
            .map_err(|e| match e {
                ExecError::Launch { source, .. } => LinkError::Launch {
                    interface: interface.to_string(),
                    action,
                    source,
                },
                ExecError::Timeout { .. } => LinkError::Timeout {
                    interface: interface.to_string(),
                    action,
                },
            })?;

        if output.success {
            debug!(interface, action, "link action ok");
            Ok(())
        } else {
            Err(LinkError::CommandFailed {
                interface: interface.to_string(),
                action,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

impl Default for ShellLinkControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkControl for ShellLinkControl {
    async fn set_link_up(&self, interface: &str) -> Result<(), LinkError> {
        self.run_link_action(
            &self.ip_bin,
            &["link", "set", interface, "up"],
            interface,
            "link-up",
        )
        .await
    }

    async fn set_link_down(&self, interface: &str) -> Result<(), LinkError> {
        self.run_link_action(
            &self.ip_bin,
            &["link", "set", interface, "down"],
            interface,
            "link-down",
        )
        .await
    }

    async fn link_status(&self, interface: &str) -> String {
        match run_command(&self.ip_bin, &["link", "show", interface], self.timeout).await {
            Ok(output) if output.success => output.stdout,
            Ok(output) => {
                warn!(interface, stderr = %output.stderr.trim(), "link status query failed");
                String::new()
            }
            Err(e) => {
                warn!(interface, error = %e, "link status query failed");
                String::new()
            }
        }
    }

    async fn set_connectionless_mode(&self, interface: &str) -> Result<(), LinkError> {
        self.run_link_action(
            &self.iw_bin,
            &["dev", interface, "set", "type", "ibss"],
            interface,
            "set-ibss-mode",
        )
        .await
    }

    async fn join_shared_channel(
        &self,
        interface: &str,
        channel: u32,
        network_name: &str,
    ) -> Result<(), LinkError> {
        let freq = channel_center_mhz(channel).to_string();
        self.run_link_action(
            &self.iw_bin,
            &["dev", interface, "ibss", "join", network_name, &freq],
            interface,
            "join-channel",
        )
        .await
    }
}
