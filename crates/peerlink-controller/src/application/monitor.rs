//! Use case: wait for a negotiated link to come up.
//!
//! After the handshake, the link takes a while to form. This monitor polls
//! the agent's status at a fixed interval until the connected marker shows
//! up or a hard deadline passes. The outcome is a plain yes/no: a link that
//! never forms is an answer, not an error, and the caller picks the
//! fallback route on `false`.

use std::time::Duration;

use tracing::debug;

use peerlink_core::is_connected;

use crate::infrastructure::agent::AgentRef;
use crate::infrastructure::poll::poll_until;

/// Control command that dumps the agent's link status.
pub const STATUS_COMMAND: &str = "status";

/// Polls `agent` until its status reports a completed link.
///
/// Returns `true` as soon as the link is up, `false` once `deadline` passes
/// without it. A status query that fails counts as "not connected yet" and
/// the polling continues; this never returns early on an error.
pub async fn await_connected(agent: &AgentRef, poll_interval: Duration, deadline: Duration) -> bool {
    poll_until(poll_interval, deadline, || {
        let agent = agent.clone();
        async move {
            match agent.lock().await.command(STATUS_COMMAND).await {
                Ok(raw) => is_connected(&raw),
                Err(e) => {
                    debug!(error = %e, "status poll failed; counting as not connected");
                    false
                }
            }
        }
    })
    .await
}
