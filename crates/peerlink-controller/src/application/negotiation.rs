//! Use case: run the PIN handshake between the two agents.
//!
//! The initiator asks its agent to start a PIN-authenticated pairing with
//! the selected peer; the agent answers with the PIN it generated. After a
//! settle delay the responder authorizes the same pairing with that same
//! PIN. Using the returned PIN on both sides is what keeps the two agents
//! negotiating the same session.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use peerlink_core::{extract_pin, is_rejection};

use crate::infrastructure::agent::{AgentError, AgentRef};

/// Pause between dependent pairing steps.
///
/// Agents need a beat to set up their side of an exchange before the
/// counterpart acts on it; firing the next step immediately loses races
/// against the agent's own state machine. Used after agent start, between
/// the two handshake halves, and before verification.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Error type for handshake operations.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The agent could not be driven at all.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The agent answered but produced nothing PIN-shaped.
    #[error("agent on '{interface}' returned no usable PIN: {response}")]
    NoPin { interface: String, response: String },

    /// The agent refused the pairing command.
    #[error("agent on '{interface}' rejected the pairing command: {response}")]
    Rejected { interface: String, response: String },
}

/// Starts a PIN-authenticated pairing toward `peer` and returns the PIN the
/// agent generated.
///
/// # Errors
///
/// Returns [`NegotiationError::Rejected`] when the agent refuses the command
/// and [`NegotiationError::NoPin`] when its response carries no PIN.
pub async fn initiate(agent: &AgentRef, peer: &str) -> Result<String, NegotiationError> {
    let mut guard = agent.lock().await;
    let response = guard.command(&format!("p2p_connect {peer} pin auth")).await?;
    let interface = guard.interface().to_string();
    drop(guard);

    if is_rejection(&response) {
        return Err(NegotiationError::Rejected {
            interface,
            response: response.trim().to_string(),
        });
    }
    match extract_pin(&response) {
        Some(pin) => {
            info!(interface, peer, "pairing initiated");
            Ok(pin)
        }
        None => Err(NegotiationError::NoPin {
            interface,
            response: response.trim().to_string(),
        }),
    }
}

/// Authorizes the pairing on the responding side with the initiator's PIN.
///
/// # Errors
///
/// Returns [`NegotiationError::Rejected`] when the agent refuses the command.
pub async fn respond(agent: &AgentRef, peer: &str, pin: &str) -> Result<(), NegotiationError> {
    let mut guard = agent.lock().await;
    let response = guard.command(&format!("p2p_connect {peer} {pin}")).await?;
    let interface = guard.interface().to_string();
    drop(guard);

    if is_rejection(&response) {
        return Err(NegotiationError::Rejected {
            interface,
            response: response.trim().to_string(),
        });
    }
    info!(interface, peer, "pairing authorized");
    Ok(())
}

/// Runs the full handshake: initiate, settle, respond. Returns the PIN the
/// attempt used.
pub async fn run_handshake(
    initiator: &AgentRef,
    responder: &AgentRef,
    peer: &str,
) -> Result<String, NegotiationError> {
    let pin = initiate(initiator, peer).await?;
    debug!(peer, "letting the initiating agent settle");
    tokio::time::sleep(SETTLE_DELAY).await;
    respond(responder, peer, &pin).await?;
    Ok(pin)
}
