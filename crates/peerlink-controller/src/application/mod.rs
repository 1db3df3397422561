//! Application layer use cases for the pairing controller.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules, here in `peerlink_core`) and the infrastructure
//! (processes, shell utilities, file system).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "pair two
//!   stations and verify they can reach each other").
//! - **Depend on abstractions** (the `LinkControl`, `AgentProcess`, and
//!   `ConnectivityProbe` traits) rather than on the shell-backed adapters
//!   behind them, so every use case runs unchanged against the in-memory
//!   mocks.
//! - **Contain no process spawning, no shell commands, no file system
//!   access** of their own.
//!
//! # Sub-modules
//!
//! - **`discovery`**   – Opens a bounded scan window and collects the peers
//!   an agent can see.
//!
//! - **`negotiation`** – Runs the PIN handshake between the two agents.
//!
//! - **`monitor`**     – Waits for the negotiated link to come up, with a
//!   fixed poll interval and a hard deadline.
//!
//! - **`fallback`**    – Regroups both endpoints on an ad-hoc channel when
//!   pairing cannot complete.
//!
//! - **`run_session`** – Drives one full pairing session through its state
//!   machine and produces the final report.

pub mod discovery;
pub mod fallback;
pub mod monitor;
pub mod negotiation;
pub mod run_session;
