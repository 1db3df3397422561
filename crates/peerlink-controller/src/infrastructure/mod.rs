//! Infrastructure layer for the pairing controller.
//!
//! Contains OS-facing adapters: network interface control, discovery agent
//! processes, connectivity probes, and file-system configuration storage.
//!
//! **Dependency rule**: concrete adapters in this layer may depend on
//! `peerlink_core`, but the `application` layer may only name the *traits*
//! defined here ([`netif::LinkControl`], [`agent::AgentProcess`],
//! [`probe::ConnectivityProbe`]), never the shell-backed implementations.
//! That keeps every use case runnable against the in-memory mocks.

pub mod agent;
pub mod exec;
pub mod netif;
pub mod poll;
pub mod probe;
pub mod storage;
