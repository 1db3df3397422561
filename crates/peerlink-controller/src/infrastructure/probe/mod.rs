//! Connectivity probing infrastructure.
//!
//! After a link is established (or the fallback channel is joined), the
//! session sends a burst of reachability probes from one endpoint to the
//! other and records how many were answered.
//!
//! Probing is evidence collection, not control flow: implementations never
//! fail, they return a [`ConnectivityResult`] describing what happened.
//!
//! # Testability
//!
//! The `ConnectivityProbe` trait allows unit tests to script probe outcomes
//! without generating real traffic.

use std::time::Duration;

use async_trait::async_trait;

use peerlink_core::{ConnectivityResult, Endpoint};

pub mod mock;
pub mod ping;

/// Trait abstracting reachability verification between two endpoints.
///
/// The production implementation shells out to `ping`; tests use
/// [`mock::MockConnectivityProbe`].
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Sends `attempts` probes from `source` to `target` and reports the
    /// outcome. Every probe must be answered for the result to count as a
    /// success.
    async fn verify(
        &self,
        source: &Endpoint,
        target: &Endpoint,
        attempts: u32,
        per_attempt_timeout: Duration,
    ) -> ConnectivityResult;
}
