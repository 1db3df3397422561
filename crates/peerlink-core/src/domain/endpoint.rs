//! Endpoint identity: one side of a pairing attempt.
//!
//! An [`Endpoint`] binds together everything the controller needs to know
//! about one radio: the interface it drives, the hardware address it
//! advertises during discovery, and the address it is expected to answer
//! probes on once a link exists. Identity fields are fixed at construction;
//! only the [`EndpointPhase`] marker moves as the session progresses.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

/// Error returned when a string does not describe a hardware address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("not a hardware address: {input:?}")]
pub struct MacParseError {
    /// The text that failed to parse (truncated to its first 64 bytes).
    pub input: String,
}

/// A six-octet IEEE 802 hardware address.
///
/// This is the unit of peer identity in discovery output: a line of agent
/// output is treated as a peer record exactly when its first token parses as
/// a `MacAddr`. Parsing is strict (`aa:bb:cc:dd:ee:ff`, case-insensitive);
/// display is lowercase with colons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Creates an address from raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Returns the raw octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MacParseError {
            input: s.chars().take(64).collect(),
        };

        let mut octets = [0u8; 6];
        let mut groups = s.split(':');
        for octet in octets.iter_mut() {
            let group = groups.next().ok_or_else(err)?;
            if group.len() != 2 {
                return Err(err());
            }
            *octet = u8::from_str_radix(group, 16).map_err(|_| err())?;
        }
        if groups.next().is_some() {
            return Err(err());
        }
        Ok(Self(octets))
    }
}

// Serialize/deserialize as the canonical textual form so hardware addresses
// read naturally in config files (`mac = "02:00:00:00:01:00"`).
impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Per-endpoint progress marker, advanced by the session orchestrator.
///
/// Distinct from the session-wide state: each endpoint tracks how far *its*
/// radio has come, which matters when one side fails while the other is
/// already up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointPhase {
    /// Interface not yet activated.
    Down,
    /// Interface link is up; no agent running.
    Up,
    /// Discovery agent launched for this interface.
    AgentRunning,
    /// A pairing command has been issued on this endpoint's agent.
    Negotiating,
    /// The agent reported the connected-state marker.
    Connected,
    /// Reconfigured onto the shared ad-hoc channel.
    AdHoc,
}

impl fmt::Display for EndpointPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndpointPhase::Down => "down",
            EndpointPhase::Up => "up",
            EndpointPhase::AgentRunning => "agent-running",
            EndpointPhase::Negotiating => "negotiating",
            EndpointPhase::Connected => "connected",
            EndpointPhase::AdHoc => "adhoc",
        };
        f.write_str(text)
    }
}

/// Identity of one side of the pairing.
///
/// Owned by the [`crate::PairingSession`] that created it. The interface
/// name, hardware address, probe address, and device name never change after
/// construction; the phase marker is the only mutable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    interface: String,
    mac: MacAddr,
    address: IpAddr,
    device_name: String,
    phase: EndpointPhase,
}

impl Endpoint {
    /// Creates an endpoint in the [`EndpointPhase::Down`] phase.
    pub fn new(
        interface: impl Into<String>,
        mac: MacAddr,
        address: IpAddr,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            interface: interface.into(),
            mac,
            address,
            device_name: device_name.into(),
            phase: EndpointPhase::Down,
        }
    }

    /// Network interface this endpoint drives (e.g. `wlan0`).
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Hardware address advertised during discovery.
    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    /// Address the endpoint answers reachability probes on once linked.
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Name advertised to peers during discovery.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Current progress marker.
    pub fn phase(&self) -> EndpointPhase {
        self.phase
    }

    /// Moves the progress marker.
    pub fn set_phase(&mut self, phase: EndpointPhase) {
        if phase != self.phase {
            debug!(interface = %self.interface, from = %self.phase, to = %phase, "endpoint phase");
        }
        self.phase = phase;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
