//! Use case: drive one full pairing session from bring-up to verification.
//!
//! The orchestrator owns the session state machine and walks it through one
//! of three routes:
//!
//! - **discovery** – peers showed up in the scan window and the handshake
//!   plus connection wait both succeeded;
//! - **blind**     – the scan found nothing, so the handshake targets the
//!   configured counterpart address directly;
//! - **adhoc**     – the handshake or the connection wait fell through, and
//!   both radios regrouped on the fallback channel instead.
//!
//! All three routes end in a verified session: connectivity verification
//! always runs, and its outcome (including "nothing answered") is recorded
//! in the report rather than thrown. The session only fails outright when
//! the stage cannot be set at all: an interface that will not come up, an
//! agent that will not start, or an agent lost mid-discovery.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use peerlink_core::{
    ConnectivityResult, Endpoint, EndpointPhase, PairingPath, PairingSession, SessionState,
    TransitionError,
};

use crate::application::discovery::DiscoveryPhase;
use crate::application::fallback::activate_adhoc;
use crate::application::monitor::await_connected;
use crate::application::negotiation::{run_handshake, SETTLE_DELAY};
use crate::infrastructure::agent::{AgentError, AgentRef, AgentSupervisor};
use crate::infrastructure::netif::{LinkControl, LinkError};
use crate::infrastructure::probe::ConnectivityProbe;

/// Error type for fatal session failures.
///
/// Only stage-setting problems land here; a peer that cannot be paired or
/// reached is an outcome, not an error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Timings and parameters for one session run.
///
/// The agent config blobs are rendered by the caller so this layer stays
/// free of file and process concerns.
pub struct SessionSettings {
    pub discovery_window: Duration,
    pub discovery_poll: Duration,
    pub connect_deadline: Duration,
    pub connect_poll: Duration,
    pub probe_attempts: u32,
    pub probe_timeout: Duration,
    pub fallback_channel: u32,
    pub fallback_network: String,
    pub initiator_agent_config: String,
    pub responder_agent_config: String,
}

/// Final account of a session run.
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub state: SessionState,
    pub path: Option<PairingPath>,
    pub connectivity: Option<ConnectivityResult>,
    pub failure: Option<SessionError>,
}

/// Drives one [`PairingSession`] to a terminal state.
pub struct SessionOrchestrator {
    link: Arc<dyn LinkControl>,
    probe: Arc<dyn ConnectivityProbe>,
    supervisor: AgentSupervisor,
    settings: SessionSettings,
    session: PairingSession,
}

impl SessionOrchestrator {
    pub fn new(
        link: Arc<dyn LinkControl>,
        probe: Arc<dyn ConnectivityProbe>,
        supervisor: AgentSupervisor,
        settings: SessionSettings,
        initiator: Endpoint,
        responder: Endpoint,
    ) -> Self {
        Self {
            link,
            probe,
            supervisor,
            settings,
            session: PairingSession::new(initiator, responder),
        }
    }

    /// Runs the session to completion and reports what happened.
    pub async fn run(mut self) -> SessionReport {
        match self.drive().await {
            Ok(()) => {
                info!(
                    session = %self.session.id(),
                    state = %self.session.state(),
                    path = self.session.path().map(PairingPath::as_str),
                    "session finished"
                );
                self.report(None)
            }
            Err(e) => {
                error!(session = %self.session.id(), error = %e, "session failed");
                self.supervisor.stop_all().await;
                if let Err(te) = self.session.advance(SessionState::Failed) {
                    debug!(error = %te, "session already past the failing states");
                }
                self.report(Some(e))
            }
        }
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        self.bring_up_interfaces().await?;
        let (initiator_agent, responder_agent) = self.start_agents().await?;
        self.run_discovery(&initiator_agent, &responder_agent)
            .await?;

        let peer = self.session.responder().mac();
        self.session.select_peer(peer);
        self.session.advance(SessionState::Negotiating)?;
        self.session
            .initiator_mut()
            .set_phase(EndpointPhase::Negotiating);
        self.session
            .responder_mut()
            .set_phase(EndpointPhase::Negotiating);

        let pin = match run_handshake(&initiator_agent, &responder_agent, &peer.to_string()).await
        {
            Ok(pin) => pin,
            Err(e) => {
                warn!(error = %e, "handshake failed; taking the ad-hoc route");
                return self.fallback_and_verify().await;
            }
        };
        self.session.record_pin(pin);

        self.session
            .advance_with_deadline(SessionState::AwaitingConnection, self.settings.connect_deadline)?;
        let connected = await_connected(
            &initiator_agent,
            self.settings.connect_poll,
            self.settings.connect_deadline,
        )
        .await;

        if connected {
            self.session
                .initiator_mut()
                .set_phase(EndpointPhase::Connected);
            self.session
                .responder_mut()
                .set_phase(EndpointPhase::Connected);
            self.settle_and_verify().await
        } else {
            warn!("link did not form before the deadline; taking the ad-hoc route");
            self.fallback_and_verify().await
        }
    }

    async fn bring_up_interfaces(&mut self) -> Result<(), SessionError> {
        bring_up(&*self.link, self.session.initiator_mut()).await?;
        bring_up(&*self.link, self.session.responder_mut()).await?;
        self.session.advance(SessionState::InterfacesUp)?;
        Ok(())
    }

    async fn start_agents(&mut self) -> Result<(AgentRef, AgentRef), SessionError> {
        let initiator_agent = self
            .supervisor
            .start(
                self.session.initiator(),
                &self.settings.initiator_agent_config,
            )
            .await?;
        let responder_agent = self
            .supervisor
            .start(
                self.session.responder(),
                &self.settings.responder_agent_config,
            )
            .await?;
        self.session
            .initiator_mut()
            .set_phase(EndpointPhase::AgentRunning);
        self.session
            .responder_mut()
            .set_phase(EndpointPhase::AgentRunning);

        // Give the agents a beat to open their control sockets.
        tokio::time::sleep(SETTLE_DELAY).await;
        self.session.advance(SessionState::AgentsStarted)?;
        Ok((initiator_agent, responder_agent))
    }

    /// Scans from both sides at once and merges what they saw.
    async fn run_discovery(
        &mut self,
        initiator_agent: &AgentRef,
        responder_agent: &AgentRef,
    ) -> Result<(), SessionError> {
        self.session
            .advance_with_deadline(SessionState::Discovering, self.settings.discovery_window)?;

        let phase = DiscoveryPhase::new(
            self.settings.discovery_window,
            self.settings.discovery_poll,
        );
        let (from_initiator, from_responder) = tokio::join!(
            phase.discover(initiator_agent),
            phase.discover(responder_agent)
        );
        self.session.record_peers(from_initiator?);
        self.session.record_peers(from_responder?);

        if self.session.discovered().is_empty() {
            self.session.advance(SessionState::NoPeersFound)?;
            self.session.set_path(PairingPath::Blind);
            info!("scan window closed empty; pairing blind with the configured counterpart");
        } else {
            self.session.advance(SessionState::PeersFound)?;
            self.session.set_path(PairingPath::Discovery);
        }
        Ok(())
    }

    async fn fallback_and_verify(&mut self) -> Result<(), SessionError> {
        self.session.advance(SessionState::FallbackAdHoc)?;
        self.session.set_path(PairingPath::AdHoc);

        let (initiator, responder) = self.session.endpoints_mut();
        activate_adhoc(
            &mut self.supervisor,
            &*self.link,
            initiator,
            responder,
            self.settings.fallback_channel,
            &self.settings.fallback_network,
        )
        .await;

        self.settle_and_verify().await
    }

    /// Lets the link settle, then runs verification and closes the session.
    ///
    /// The verification outcome is recorded either way; reaching `Verified`
    /// means "verification ran", not "the peer answered".
    async fn settle_and_verify(&mut self) -> Result<(), SessionError> {
        tokio::time::sleep(SETTLE_DELAY).await;

        let result = self
            .probe
            .verify(
                self.session.initiator(),
                self.session.responder(),
                self.settings.probe_attempts,
                self.settings.probe_timeout,
            )
            .await;
        if !result.success {
            warn!(
                replies = result.replies,
                attempts = result.attempts,
                "verification probes went unanswered"
            );
        }
        self.session.record_connectivity(result);
        self.session.advance(SessionState::Verified)?;
        Ok(())
    }

    fn report(&self, failure: Option<SessionError>) -> SessionReport {
        SessionReport {
            session_id: self.session.id(),
            state: self.session.state(),
            path: self.session.path(),
            connectivity: self.session.connectivity().cloned(),
            failure,
        }
    }
}

async fn bring_up(link: &dyn LinkControl, endpoint: &mut Endpoint) -> Result<(), LinkError> {
    link.set_link_up(endpoint.interface()).await?;
    let status = link.link_status(endpoint.interface()).await;
    debug!(interface = endpoint.interface(), status = %status.trim(), "interface up");
    endpoint.set_phase(EndpointPhase::Up);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use peerlink_core::MacAddr;

    use super::*;
    use crate::infrastructure::agent::mock::MockAgentLauncher;
    use crate::infrastructure::netif::mock::MockLinkControl;
    use crate::infrastructure::probe::mock::MockConnectivityProbe;

    fn make_endpoint(interface: &str, mac: &str, address: &str) -> Endpoint {
        Endpoint::new(
            interface,
            mac.parse::<MacAddr>().unwrap(),
            address.parse::<IpAddr>().unwrap(),
            "station",
        )
    }

    fn make_settings() -> SessionSettings {
        SessionSettings {
            discovery_window: Duration::from_millis(80),
            discovery_poll: Duration::from_millis(20),
            connect_deadline: Duration::from_millis(100),
            connect_poll: Duration::from_millis(25),
            probe_attempts: 3,
            probe_timeout: Duration::from_millis(10),
            fallback_channel: 6,
            fallback_network: "bench-net".to_string(),
            initiator_agent_config: String::new(),
            responder_agent_config: String::new(),
        }
    }

    fn make_orchestrator(
        launcher: &MockAgentLauncher,
        link: &MockLinkControl,
        probe: &MockConnectivityProbe,
    ) -> SessionOrchestrator {
        SessionOrchestrator::new(
            Arc::new(link.clone()),
            Arc::new(probe.clone()),
            AgentSupervisor::new(Box::new(launcher.clone())),
            make_settings(),
            make_endpoint("wlan0", "02:00:00:00:01:00", "192.168.49.1"),
            make_endpoint("wlan1", "02:00:00:00:02:00", "192.168.49.2"),
        )
    }

    #[tokio::test]
    async fn test_report_carries_path_and_connectivity_on_success() {
        // Arrange: both sides see each other, handshake and link succeed.
        let launcher = MockAgentLauncher::new();
        launcher.script("wlan0", "p2p_peers", ["02:00:00:00:02:00\n"]);
        launcher.script("wlan1", "p2p_peers", ["02:00:00:00:01:00\n"]);
        launcher.script("wlan0", "p2p_connect", ["61729575\n"]);
        launcher.script("wlan1", "p2p_connect", ["OK\n"]);
        launcher.script("wlan0", "status", ["wpa_state=COMPLETED\n"]);
        let link = MockLinkControl::new();
        let probe = MockConnectivityProbe::new();

        // Act
        let report = make_orchestrator(&launcher, &link, &probe).run().await;

        // Assert
        assert_eq!(report.state, SessionState::Verified);
        assert_eq!(report.path, Some(PairingPath::Discovery));
        assert!(report.failure.is_none());
        let connectivity = report.connectivity.expect("verification ran");
        assert!(connectivity.success);
        assert_eq!(probe.calls(), vec!["wlan0 -> 192.168.49.2 x3"]);
    }

    #[tokio::test]
    async fn test_bring_up_failure_fails_the_session() {
        // Arrange
        let launcher = MockAgentLauncher::new();
        let link = MockLinkControl::new();
        link.fail_bring_up("wlan0");
        let probe = MockConnectivityProbe::new();

        // Act
        let report = make_orchestrator(&launcher, &link, &probe).run().await;

        // Assert: no agents ever started, nothing was verified.
        assert_eq!(report.state, SessionState::Failed);
        assert!(matches!(report.failure, Some(SessionError::Link(_))));
        assert!(report.path.is_none());
        assert!(report.connectivity.is_none());
        assert!(launcher.spawned().is_empty());
    }
}
