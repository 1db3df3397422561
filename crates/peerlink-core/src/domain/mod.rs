//! Domain layer: pure pairing-session state, no OS dependencies.
//!
//! # Sub-modules
//!
//! - **`endpoint`** – Identity of one side of a pairing attempt: interface
//!   name, hardware address, probe address, and the per-endpoint phase marker.
//!
//! - **`session`** – The [`session::PairingSession`] aggregate root and the
//!   [`session::SessionState`] machine. All state transitions go through the
//!   legality table there; nothing else in the workspace mutates a session.

pub mod endpoint;
pub mod session;
