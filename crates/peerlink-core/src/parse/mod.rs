//! Tolerant parsers for agent and probe output.
//!
//! The discovery agent speaks a line-oriented textual protocol and its
//! responses routinely carry banner lines, blank lines, and fields this
//! system does not care about. Every parser here follows the same policy:
//! extract the tokens that match the expected shape, skip everything else at
//! debug level, and never treat unrecognized text as fatal.
//!
//! # Sub-modules
//!
//! - **`peers`** – Peer-list and peer-detail records from discovery output.
//! - **`handshake`** – PIN tokens, rejection markers, and the
//!   connected-state marker from pairing/status responses.
//! - **`ping`** – Transmitted/received counts from reachability-probe
//!   output.

pub mod handshake;
pub mod peers;
pub mod ping;
