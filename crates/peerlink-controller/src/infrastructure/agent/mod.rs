//! Discovery agent infrastructure.
//!
//! On Linux, peer discovery and pairing are delegated to a `wpa_supplicant`
//! process per wireless interface, driven over its control socket with
//! `wpa_cli`. This module owns the agent lifecycle: render a config, spawn
//! the process, relay control commands, and tear it down again.
//!
//! The supervisor enforces the one-agent-per-interface rule: starting an
//! agent on an interface that already has one stops the old agent first.
//!
//! # Testability
//!
//! The `AgentProcess` and `AgentLauncher` traits allow unit tests to script
//! agent transcripts without spawning real processes.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use peerlink_core::Endpoint;

pub mod mock;
pub mod supervisor;
pub mod supplicant;

pub use supervisor::AgentSupervisor;

/// Shared handle to a running agent.
///
/// Commands serialize through the mutex, so two tasks never interleave on
/// one control socket.
pub type AgentRef = Arc<tokio::sync::Mutex<Box<dyn AgentProcess>>>;

/// Error type for agent lifecycle and control operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent process could not be spawned.
    #[error("failed to spawn agent for '{interface}': {source}")]
    SpawnFailed {
        interface: String,
        #[source]
        source: io::Error,
    },

    /// The agent is not accepting control commands (dead or refusing).
    #[error("agent for '{interface}' is unavailable")]
    Unavailable { interface: String },

    /// The control utility could not be launched for a command.
    #[error("agent command '{command}' on '{interface}' could not launch: {source}")]
    CommandFailed {
        interface: String,
        command: String,
        #[source]
        source: io::Error,
    },

    /// A control command hung past its timeout.
    #[error("agent command '{command}' on '{interface}' timed out")]
    CommandTimeout { interface: String, command: String },

    /// The agent configuration file could not be written.
    #[error("failed to write agent config '{path}': {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A running discovery agent bound to one interface.
#[async_trait]
pub trait AgentProcess: Send + std::fmt::Debug {
    /// The interface this agent serves.
    fn interface(&self) -> &str;

    /// Whether the agent process is still running.
    async fn is_alive(&mut self) -> bool;

    /// Sends a control command and returns the agent's raw response text.
    async fn command(&mut self, command: &str) -> Result<String, AgentError>;

    /// Stops the agent. Idempotent; a second call is a no-op.
    async fn stop(&mut self);
}

/// Factory for [`AgentProcess`] instances.
///
/// The production implementation spawns `wpa_supplicant`; tests use
/// [`mock::MockAgentLauncher`].
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    /// Launches an agent for `endpoint` using the rendered `config_blob`.
    async fn launch(
        &self,
        endpoint: &Endpoint,
        config_blob: &str,
    ) -> Result<Box<dyn AgentProcess>, AgentError>;
}
