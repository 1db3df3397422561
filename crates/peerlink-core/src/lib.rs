//! # peerlink-core
//!
//! Shared library for PeerLink containing the pairing-session domain model
//! and the tolerant parsers for discovery-agent output.
//!
//! This crate is used by the controller application. It has zero dependencies
//! on OS APIs, process spawning, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! PeerLink establishes a direct wireless link between two radio endpoints
//! without any access point in between: both sides discover each other,
//! exchange a pairing PIN, and the link is verified end to end. When the
//! negotiated path stalls, both sides drop to a shared ad-hoc channel instead.
//!
//! This crate (`peerlink-core`) is the shared foundation. It defines:
//!
//! - **`domain`** – Pure session state with no OS dependencies: the
//!   [`Endpoint`] identities, the [`PairingSession`] aggregate, and the
//!   [`SessionState`] machine with its transition-legality table.
//!
//! - **`parse`** – Extraction of structured facts from the free-form text the
//!   discovery agent and the reachability probe produce: peer addresses, the
//!   pairing PIN, the connected-state marker, and probe reply counts. All
//!   parsers are tolerant: unrecognized text is skipped, never fatal.

// Declare the two top-level modules. Rust will look for each in a
// subdirectory with the same name (e.g., src/domain/mod.rs).
pub mod domain;
pub mod parse;

// Re-export the most-used types at the crate root so callers can write
// `peerlink_core::PairingSession` instead of the full module path.
pub use domain::endpoint::{Endpoint, EndpointPhase, MacAddr, MacParseError};
pub use domain::session::{
    ConnectivityResult, PairingPath, PairingSession, PeerInfo, SessionState, TransitionError,
};
pub use parse::handshake::{extract_pin, is_connected, is_rejection, CONNECTED_MARKER};
pub use parse::peers::{extract_device_name, parse_peer_list};
pub use parse::ping::parse_probe_summary;
