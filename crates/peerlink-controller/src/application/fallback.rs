//! Use case: regroup both endpoints on an ad-hoc channel.
//!
//! When pairing cannot complete, the session falls back to a connectionless
//! network both radios join directly. The agents are stopped first so they
//! cannot fight the mode change underneath us.
//!
//! This path is the last resort, so it never aborts: each step is attempted
//! on each endpoint, failures are logged, and the remaining steps still
//! run. Repeating the whole activation lands in the same configuration, so
//! calling it again is harmless.

use tracing::{info, warn};

use peerlink_core::{Endpoint, EndpointPhase};

use crate::infrastructure::agent::AgentSupervisor;
use crate::infrastructure::netif::LinkControl;

/// Moves both endpoints onto the shared ad-hoc channel.
pub async fn activate_adhoc(
    supervisor: &mut AgentSupervisor,
    link: &dyn LinkControl,
    initiator: &mut Endpoint,
    responder: &mut Endpoint,
    channel: u32,
    network_name: &str,
) {
    info!(channel, network_name, "activating ad-hoc fallback");
    supervisor.stop_all().await;

    for endpoint in [initiator, responder] {
        join_channel(link, endpoint, channel, network_name).await;
        endpoint.set_phase(EndpointPhase::AdHoc);
    }
}

async fn join_channel(
    link: &dyn LinkControl,
    endpoint: &Endpoint,
    channel: u32,
    network_name: &str,
) {
    let interface = endpoint.interface();

    if let Err(e) = link.set_link_down(interface).await {
        warn!(interface, error = %e, "fallback: link down failed");
    }
    if let Err(e) = link.set_connectionless_mode(interface).await {
        warn!(interface, error = %e, "fallback: mode switch failed");
    }
    if let Err(e) = link.set_link_up(interface).await {
        warn!(interface, error = %e, "fallback: link up failed");
    }
    if let Err(e) = link.join_shared_channel(interface, channel, network_name).await {
        warn!(interface, error = %e, "fallback: channel join failed");
    }
}
