//! Use case: collect the peers an agent can see within a bounded window.
//!
//! Discovery polls the agent's peer list at a fixed interval and stops as
//! soon as anything shows up, so a quiet bench does not wait out the full
//! window when its counterpart answers on the first poll. An empty result
//! after the whole window is a normal outcome, not an error; losing the
//! agent mid-scan is an error.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use peerlink_core::{extract_device_name, parse_peer_list, MacAddr, PeerInfo};

use crate::infrastructure::agent::{AgentError, AgentRef};
use crate::infrastructure::poll::poll_until;

/// Control command that starts a scan.
pub const DISCOVER_COMMAND: &str = "p2p_find";
/// Control command that lists the peers seen so far.
pub const PEER_LIST_COMMAND: &str = "p2p_peers";
/// Control command that dumps details for one peer.
pub const PEER_DETAIL_COMMAND: &str = "p2p_peer";

struct ScanState {
    peers: BTreeMap<MacAddr, PeerInfo>,
    error: Option<AgentError>,
}

/// One bounded discovery pass over one agent.
pub struct DiscoveryPhase {
    window: Duration,
    poll_interval: Duration,
}

impl DiscoveryPhase {
    pub fn new(window: Duration, poll_interval: Duration) -> Self {
        Self {
            window,
            poll_interval,
        }
    }

    /// Scans until the window closes or at least one peer appears, then
    /// enriches each peer with its advertised device name.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the agent cannot start the scan or stops
    /// answering peer-list queries. Detail lookups are best-effort and never
    /// fail the scan.
    pub async fn discover(
        &self,
        agent: &AgentRef,
    ) -> Result<BTreeMap<MacAddr, PeerInfo>, AgentError> {
        agent.lock().await.command(DISCOVER_COMMAND).await?;

        let state = Arc::new(tokio::sync::Mutex::new(ScanState {
            peers: BTreeMap::new(),
            error: None,
        }));

        poll_until(self.poll_interval, self.window, || {
            let agent = agent.clone();
            let state = state.clone();
            async move {
                let response = agent.lock().await.command(PEER_LIST_COMMAND).await;
                let mut state = state.lock().await;
                match response {
                    Ok(raw) => {
                        for peer in parse_peer_list(&raw) {
                            state.peers.entry(peer).or_default();
                        }
                        !state.peers.is_empty()
                    }
                    Err(e) => {
                        // Stop polling; the error surfaces below.
                        state.error = Some(e);
                        true
                    }
                }
            }
        })
        .await;

        let (mut peers, error) = {
            let mut state = state.lock().await;
            (std::mem::take(&mut state.peers), state.error.take())
        };
        if let Some(error) = error {
            return Err(error);
        }

        for (peer, info) in peers.iter_mut() {
            match agent
                .lock()
                .await
                .command(&format!("{PEER_DETAIL_COMMAND} {peer}"))
                .await
            {
                Ok(raw) => info.device_name = extract_device_name(&raw),
                Err(e) => debug!(peer = %peer, error = %e, "peer detail lookup skipped"),
            }
        }

        info!(peers = peers.len(), "discovery window closed");
        Ok(peers)
    }
}
