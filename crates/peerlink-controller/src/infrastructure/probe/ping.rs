//! `ping`-backed [`ConnectivityProbe`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use peerlink_core::{parse_probe_summary, ConnectivityResult, Endpoint};

use super::ConnectivityProbe;
use crate::infrastructure::exec::run_command;

/// Reachability verification via one `ping` burst.
pub struct PingProbe {
    ping_bin: String,
}

impl PingProbe {
    pub fn new() -> Self {
        Self {
            ping_bin: "ping".to_string(),
        }
    }

    /// Overrides the ping binary path.
    pub fn with_binary(ping_bin: impl Into<String>) -> Self {
        Self {
            ping_bin: ping_bin.into(),
        }
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectivityProbe for PingProbe {
    async fn verify(
        &self,
        source: &Endpoint,
        target: &Endpoint,
        attempts: u32,
        per_attempt_timeout: Duration,
    ) -> ConnectivityResult {
        let count = attempts.to_string();
        // ping takes whole seconds; 1s is the floor.
        let wait = per_attempt_timeout.as_secs().max(1).to_string();
        let address = target.address().to_string();

        // The burst itself is self-limiting, so the outer fence only has to
        // catch a wedged ping binary. One second of inter-probe spacing per
        // attempt, plus slack.
        let fence = per_attempt_timeout
            .saturating_add(Duration::from_secs(1))
            .saturating_mul(attempts.max(1))
            .saturating_add(Duration::from_secs(5));

        let args = [
            "-c",
            count.as_str(),
            "-W",
            wait.as_str(),
            "-I",
            source.interface(),
            address.as_str(),
        ];

        match run_command(&self.ping_bin, &args, fence).await {
            Ok(output) => {
                let evidence = if output.stdout.is_empty() {
                    output.stderr
                } else {
                    output.stdout
                };
                match parse_probe_summary(&evidence) {
                    Some((transmitted, received)) => {
                        debug!(
                            source = source.interface(),
                            target = %address,
                            transmitted,
                            received,
                            "probe burst finished"
                        );
                        ConnectivityResult::from_counts(attempts, received, evidence)
                    }
                    None => {
                        warn!(
                            source = source.interface(),
                            target = %address,
                            "probe output had no summary line"
                        );
                        ConnectivityResult::unreachable(attempts, evidence)
                    }
                }
            }
            Err(e) => {
                warn!(source = source.interface(), target = %address, error = %e, "probe burst failed to run");
                ConnectivityResult::unreachable(attempts, e.to_string())
            }
        }
    }
}
