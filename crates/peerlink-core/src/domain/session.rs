//! The pairing-session aggregate and its state machine.
//!
//! A [`PairingSession`] is created once per pairing attempt, mutated only by
//! the session orchestrator, and discarded after a terminal state is reached.
//! It is never persisted or reused.
//!
//! # Session lifecycle (for beginners)
//!
//! Sessions progress through these states:
//!
//! ```text
//! Init ──► InterfacesUp ──► AgentsStarted ──► Discovering ──┬─► PeersFound ───┐
//!                                                           └─► NoPeersFound ─┤
//!                                                                             ▼
//!                                       FallbackAdHoc ◄──────────────── Negotiating
//!                                            │        ◄── AwaitingConnection ◄┘
//!                                            │                  │
//!                                            └────► Verified ◄──┘
//! ```
//!
//! - The happy path runs left to right and ends in `Verified`.
//! - `NoPeersFound` is not a dead end: the session still attempts a *blind*
//!   negotiation against the counterpart's known hardware address.
//! - The only alternate edge leads into `FallbackAdHoc` (negotiation failed
//!   or the connection wait timed out); after ad-hoc reconfiguration the
//!   session always finishes `Verified`, carrying whatever probe evidence was
//!   collected.
//! - `Failed` is reserved for fatal setup errors (interface bring-up, agent
//!   start, agent loss during discovery). Once `Verified` or `Failed` is
//!   reached no further transition is legal.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::endpoint::{Endpoint, MacAddr};

/// Error returned when a state transition outside the legality table is
/// requested. This always indicates a sequencing bug in the caller, never an
/// environmental failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("illegal session transition {from} -> {to}")]
pub struct TransitionError {
    pub from: SessionState,
    pub to: SessionState,
}

/// Phase marker for a pairing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created; nothing touched yet.
    Init,
    /// Both endpoint interfaces activated.
    InterfacesUp,
    /// A discovery agent is running on each interface.
    AgentsStarted,
    /// Both agents scanning inside the discovery window.
    Discovering,
    /// At least one endpoint discovered a peer.
    PeersFound,
    /// The discovery window closed with empty peer lists on both sides.
    NoPeersFound,
    /// PIN handshake in progress.
    Negotiating,
    /// Handshake issued; polling for the connected-state marker.
    AwaitingConnection,
    /// Negotiated pairing abandoned; shared ad-hoc channel configured.
    FallbackAdHoc,
    /// Terminal: reachability verification was performed and recorded.
    Verified,
    /// Terminal: fatal setup error before negotiation could complete.
    Failed,
}

impl SessionState {
    /// States this state may legally move to.
    ///
    /// Transitions are monotonic forward along the happy path; the single
    /// alternate edge enters [`SessionState::FallbackAdHoc`]. Terminal states
    /// have no successors.
    pub fn allowed_next(self) -> &'static [SessionState] {
        use SessionState::*;
        match self {
            Init => &[InterfacesUp, Failed],
            InterfacesUp => &[AgentsStarted, Failed],
            AgentsStarted => &[Discovering, Failed],
            Discovering => &[PeersFound, NoPeersFound, Failed],
            PeersFound => &[Negotiating],
            NoPeersFound => &[Negotiating],
            Negotiating => &[AwaitingConnection, FallbackAdHoc],
            AwaitingConnection => &[Verified, FallbackAdHoc],
            FallbackAdHoc => &[Verified],
            Verified => &[],
            Failed => &[],
        }
    }

    /// Whether moving to `next` is inside the legality table.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Whether the session is finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Verified | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionState::Init => "init",
            SessionState::InterfacesUp => "interfaces-up",
            SessionState::AgentsStarted => "agents-started",
            SessionState::Discovering => "discovering",
            SessionState::PeersFound => "peers-found",
            SessionState::NoPeersFound => "no-peers-found",
            SessionState::Negotiating => "negotiating",
            SessionState::AwaitingConnection => "awaiting-connection",
            SessionState::FallbackAdHoc => "fallback-adhoc",
            SessionState::Verified => "verified",
            SessionState::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Which route produced the final link, carried in the session outcome so
/// callers and tests can assert on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingPath {
    /// Peers found during the discovery window; negotiated pairing.
    Discovery,
    /// No peers found; negotiated pairing against the known counterpart
    /// address.
    Blind,
    /// Negotiation abandoned; shared ad-hoc channel.
    AdHoc,
}

impl PairingPath {
    /// Stable diagnostic tag for logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            PairingPath::Discovery => "discovery",
            PairingPath::Blind => "blind",
            PairingPath::AdHoc => "adhoc",
        }
    }
}

impl fmt::Display for PairingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata learned about a discovered peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerInfo {
    /// Device name advertised by the peer, when its detail record had one.
    pub device_name: Option<String>,
}

/// Outcome of the reachability verification.
///
/// A failed verification is recorded data, not an error: `success` is false
/// and the evidence text says why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityResult {
    /// Probes requested.
    pub attempts: u32,
    /// Replies received.
    pub replies: u32,
    /// Strict policy: true only when every single probe was answered.
    pub success: bool,
    /// Raw probe output (or the failure text when the probe never ran).
    pub evidence: String,
}

impl ConnectivityResult {
    /// Builds a result from reply counts, applying the all-or-nothing
    /// success policy.
    pub fn from_counts(attempts: u32, replies: u32, evidence: impl Into<String>) -> Self {
        Self {
            attempts,
            replies,
            success: attempts > 0 && replies >= attempts,
            evidence: evidence.into(),
        }
    }

    /// Result for a probe that produced no replies at all (unreachable peer
    /// or a probe command that could not run).
    pub fn unreachable(attempts: u32, evidence: impl Into<String>) -> Self {
        Self::from_counts(attempts, 0, evidence)
    }
}

/// The aggregate root of one pairing attempt.
///
/// Exactly two endpoints, one designated initiator. All mutation goes through
/// the methods here so the invariants hold:
///
/// - the state only moves along [`SessionState::allowed_next`] edges,
/// - a phase deadline, when set, is strictly later than the phase start,
/// - a PIN recorded for a negotiation attempt is never regenerated
///   mid-attempt (it can only be replaced by a whole new `record_pin` call
///   from a fresh attempt).
#[derive(Debug)]
pub struct PairingSession {
    id: Uuid,
    initiator: Endpoint,
    responder: Endpoint,
    state: SessionState,
    phase_started: Instant,
    phase_deadline: Option<Instant>,
    discovered: BTreeMap<MacAddr, PeerInfo>,
    selected_peer: Option<MacAddr>,
    pin: Option<String>,
    connectivity: Option<ConnectivityResult>,
    path: Option<PairingPath>,
}

impl PairingSession {
    /// Creates a session in [`SessionState::Init`].
    pub fn new(initiator: Endpoint, responder: Endpoint) -> Self {
        let id = Uuid::new_v4();
        info!(
            session = %id,
            initiator = %initiator.interface(),
            responder = %responder.interface(),
            "pairing session created"
        );
        Self {
            id,
            initiator,
            responder,
            state: SessionState::Init,
            phase_started: Instant::now(),
            phase_deadline: None,
            discovered: BTreeMap::new(),
            selected_peer: None,
            pin: None,
            connectivity: None,
            path: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn initiator(&self) -> &Endpoint {
        &self.initiator
    }

    pub fn responder(&self) -> &Endpoint {
        &self.responder
    }

    pub fn initiator_mut(&mut self) -> &mut Endpoint {
        &mut self.initiator
    }

    pub fn responder_mut(&mut self) -> &mut Endpoint {
        &mut self.responder
    }

    /// Both endpoints at once, for callers that reconfigure the pair.
    pub fn endpoints_mut(&mut self) -> (&mut Endpoint, &mut Endpoint) {
        (&mut self.initiator, &mut self.responder)
    }

    /// Union of both endpoints' discovered-peer views, keyed by address.
    pub fn discovered(&self) -> &BTreeMap<MacAddr, PeerInfo> {
        &self.discovered
    }

    pub fn selected_peer(&self) -> Option<MacAddr> {
        self.selected_peer
    }

    /// PIN negotiated in the current attempt, if any.
    pub fn pin(&self) -> Option<&str> {
        self.pin.as_deref()
    }

    pub fn connectivity(&self) -> Option<&ConnectivityResult> {
        self.connectivity.as_ref()
    }

    pub fn path(&self) -> Option<PairingPath> {
        self.path
    }

    /// Start of the current phase.
    pub fn phase_started(&self) -> Instant {
        self.phase_started
    }

    /// Deadline of the current phase, when one was armed.
    pub fn phase_deadline(&self) -> Option<Instant> {
        self.phase_deadline
    }

    /// Moves to `next` without arming a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `next` is not in the legality table
    /// for the current state.
    pub fn advance(&mut self, next: SessionState) -> Result<(), TransitionError> {
        self.transition(next, None)
    }

    /// Moves to `next` and arms a phase deadline `timeout` from now.
    ///
    /// `timeout` must be non-zero; configuration validation guarantees this
    /// for every timeout that reaches a session.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `next` is not in the legality table
    /// for the current state.
    pub fn advance_with_deadline(
        &mut self,
        next: SessionState,
        timeout: Duration,
    ) -> Result<(), TransitionError> {
        debug_assert!(!timeout.is_zero(), "phase deadline must be in the future");
        self.transition(next, Some(timeout))
    }

    fn transition(
        &mut self,
        next: SessionState,
        timeout: Option<Duration>,
    ) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        info!(session = %self.id, from = %self.state, to = %next, "session state");
        self.state = next;
        self.phase_started = Instant::now();
        self.phase_deadline = timeout.map(|t| self.phase_started + t);
        Ok(())
    }

    /// Records one discovered peer, merging metadata into any existing entry.
    pub fn record_peer(&mut self, peer: MacAddr, info: PeerInfo) {
        let entry = self.discovered.entry(peer).or_default();
        if info.device_name.is_some() {
            entry.device_name = info.device_name;
        }
    }

    /// Records a batch of discovered peers.
    pub fn record_peers<I: IntoIterator<Item = (MacAddr, PeerInfo)>>(&mut self, peers: I) {
        for (peer, info) in peers {
            self.record_peer(peer, info);
        }
    }

    /// Fixes the peer address negotiation will target.
    pub fn select_peer(&mut self, peer: MacAddr) {
        self.selected_peer = Some(peer);
    }

    /// Records the PIN produced by the initiator for the current attempt.
    pub fn record_pin(&mut self, pin: impl Into<String>) {
        self.pin = Some(pin.into());
    }

    /// Records the verification outcome.
    pub fn record_connectivity(&mut self, result: ConnectivityResult) {
        self.connectivity = Some(result);
    }

    /// Tags the route that produced (or will produce) the final link. The
    /// fallback path overwrites an earlier discovery/blind tag.
    pub fn set_path(&mut self, path: PairingPath) {
        self.path = Some(path);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::endpoint::MacAddr;

    fn make_session() -> PairingSession {
        let initiator = Endpoint::new(
            "wlan0",
            MacAddr::new([0x02, 0, 0, 0, 1, 0]),
            "192.168.49.1".parse().unwrap(),
            "station-one",
        );
        let responder = Endpoint::new(
            "wlan1",
            MacAddr::new([0x02, 0, 0, 0, 2, 0]),
            "192.168.49.2".parse().unwrap(),
            "station-two",
        );
        PairingSession::new(initiator, responder)
    }

    fn advance_to_negotiating(session: &mut PairingSession) {
        session.advance(SessionState::InterfacesUp).unwrap();
        session.advance(SessionState::AgentsStarted).unwrap();
        session.advance(SessionState::Discovering).unwrap();
        session.advance(SessionState::PeersFound).unwrap();
        session.advance(SessionState::Negotiating).unwrap();
    }

    // ── Transition legality ───────────────────────────────────────────────────

    #[test]
    fn test_new_session_starts_in_init() {
        let session = make_session();
        assert_eq!(session.state(), SessionState::Init);
        assert!(session.phase_deadline().is_none());
    }

    #[test]
    fn test_happy_path_transitions_are_legal() {
        let mut session = make_session();
        advance_to_negotiating(&mut session);
        session.advance(SessionState::AwaitingConnection).unwrap();
        session.advance(SessionState::Verified).unwrap();
        assert_eq!(session.state(), SessionState::Verified);
    }

    #[test]
    fn test_blind_path_via_no_peers_found_is_legal() {
        let mut session = make_session();
        session.advance(SessionState::InterfacesUp).unwrap();
        session.advance(SessionState::AgentsStarted).unwrap();
        session.advance(SessionState::Discovering).unwrap();
        session.advance(SessionState::NoPeersFound).unwrap();
        session.advance(SessionState::Negotiating).unwrap();
        assert_eq!(session.state(), SessionState::Negotiating);
    }

    #[test]
    fn test_fallback_edge_from_negotiating() {
        let mut session = make_session();
        advance_to_negotiating(&mut session);
        session.advance(SessionState::FallbackAdHoc).unwrap();
        session.advance(SessionState::Verified).unwrap();
        assert_eq!(session.state(), SessionState::Verified);
    }

    #[test]
    fn test_fallback_edge_from_awaiting_connection() {
        let mut session = make_session();
        advance_to_negotiating(&mut session);
        session.advance(SessionState::AwaitingConnection).unwrap();
        session.advance(SessionState::FallbackAdHoc).unwrap();
        assert_eq!(session.state(), SessionState::FallbackAdHoc);
    }

    #[test]
    fn test_backward_transition_is_rejected() {
        let mut session = make_session();
        advance_to_negotiating(&mut session);

        let err = session.advance(SessionState::Discovering).unwrap_err();
        assert_eq!(err.from, SessionState::Negotiating);
        assert_eq!(err.to, SessionState::Discovering);
        // State is untouched after a rejected transition.
        assert_eq!(session.state(), SessionState::Negotiating);
    }

    #[test]
    fn test_skipping_phases_is_rejected() {
        let mut session = make_session();
        assert!(session.advance(SessionState::Negotiating).is_err());
        assert!(session.advance(SessionState::Verified).is_err());
    }

    #[test]
    fn test_failed_is_reachable_only_before_negotiation() {
        use SessionState::*;
        for state in [Init, InterfacesUp, AgentsStarted, Discovering] {
            assert!(state.can_transition_to(Failed), "{state} must allow Failed");
        }
        for state in [PeersFound, NoPeersFound, Negotiating, AwaitingConnection, FallbackAdHoc] {
            assert!(!state.can_transition_to(Failed), "{state} must not allow Failed");
        }
    }

    #[test]
    fn test_fallback_always_ends_verified() {
        assert_eq!(
            SessionState::FallbackAdHoc.allowed_next(),
            &[SessionState::Verified]
        );
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        assert!(SessionState::Verified.allowed_next().is_empty());
        assert!(SessionState::Failed.allowed_next().is_empty());
        assert!(SessionState::Verified.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Negotiating.is_terminal());
    }

    // ── Phase deadline invariant ──────────────────────────────────────────────

    #[test]
    fn test_deadline_is_strictly_after_phase_start() {
        let mut session = make_session();
        session
            .advance_with_deadline(SessionState::InterfacesUp, Duration::from_secs(30))
            .unwrap();

        let deadline = session.phase_deadline().expect("deadline armed");
        assert!(deadline > session.phase_started());
    }

    #[test]
    fn test_plain_advance_clears_previous_deadline() {
        let mut session = make_session();
        session
            .advance_with_deadline(SessionState::InterfacesUp, Duration::from_secs(30))
            .unwrap();
        session.advance(SessionState::AgentsStarted).unwrap();
        assert!(session.phase_deadline().is_none());
    }

    // ── Session bookkeeping ───────────────────────────────────────────────────

    #[test]
    fn test_record_peer_merges_metadata() {
        let mut session = make_session();
        let peer = MacAddr::new([0x02, 0, 0, 0, 2, 0]);

        session.record_peer(peer, PeerInfo::default());
        session.record_peer(
            peer,
            PeerInfo {
                device_name: Some("station-two".to_string()),
            },
        );
        // A later record without metadata must not erase the name.
        session.record_peer(peer, PeerInfo::default());

        assert_eq!(session.discovered().len(), 1);
        assert_eq!(
            session.discovered()[&peer].device_name.as_deref(),
            Some("station-two")
        );
    }

    #[test]
    fn test_pin_is_stable_within_an_attempt() {
        let mut session = make_session();
        session.record_pin("61729575");
        assert_eq!(session.pin(), Some("61729575"));
    }

    #[test]
    fn test_path_tag_is_overwritten_by_fallback() {
        let mut session = make_session();
        session.set_path(PairingPath::Discovery);
        session.set_path(PairingPath::AdHoc);
        assert_eq!(session.path(), Some(PairingPath::AdHoc));
    }

    #[test]
    fn test_path_tags_render_as_diagnostic_strings() {
        assert_eq!(PairingPath::Discovery.to_string(), "discovery");
        assert_eq!(PairingPath::Blind.to_string(), "blind");
        assert_eq!(PairingPath::AdHoc.to_string(), "adhoc");
    }

    // ── ConnectivityResult policy ─────────────────────────────────────────────

    #[test]
    fn test_connectivity_success_requires_every_reply() {
        let full = ConnectivityResult::from_counts(3, 3, "3 of 3");
        let partial = ConnectivityResult::from_counts(3, 2, "2 of 3");
        let none = ConnectivityResult::from_counts(3, 0, "0 of 3");

        assert!(full.success);
        assert!(!partial.success);
        assert!(!none.success);
    }

    #[test]
    fn test_connectivity_zero_attempts_is_never_success() {
        let result = ConnectivityResult::from_counts(0, 0, "no probes issued");
        assert!(!result.success);
    }

    #[test]
    fn test_unreachable_records_zero_replies() {
        let result = ConnectivityResult::unreachable(3, "probe launch failed");
        assert_eq!(result.replies, 0);
        assert!(!result.success);
        assert_eq!(result.evidence, "probe launch failed");
    }
}
