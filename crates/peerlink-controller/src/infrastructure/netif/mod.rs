//! Network interface control infrastructure.
//!
//! On Linux, interface administration goes through the `ip` and `iw`
//! utilities: bringing links up and down, switching a radio into
//! connectionless (IBSS) operation, and joining a shared channel by name
//! and frequency.
//!
//! # Testability
//!
//! The `LinkControl` trait allows unit tests to drive sessions against an
//! in-memory link table without touching real interfaces.

use std::io;

use async_trait::async_trait;
use thiserror::Error;

pub mod mock;
pub mod shell;

/// Error type for link control operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The underlying utility could not be launched.
    #[error("link action '{action}' on '{interface}' could not launch: {source}")]
    Launch {
        interface: String,
        action: &'static str,
        #[source]
        source: io::Error,
    },

    /// The underlying utility hung past its timeout.
    #[error("link action '{action}' on '{interface}' timed out")]
    Timeout {
        interface: String,
        action: &'static str,
    },

    /// The utility ran and reported failure.
    #[error("link action '{action}' on '{interface}' failed (exit {code:?}): {stderr}")]
    CommandFailed {
        interface: String,
        action: &'static str,
        code: Option<i32>,
        stderr: String,
    },
}

/// Trait abstracting interface administration.
///
/// The production implementation shells out to `ip`/`iw`; tests use
/// [`mock::MockLinkControl`].
#[async_trait]
pub trait LinkControl: Send + Sync {
    /// Administratively enables the interface.
    async fn set_link_up(&self, interface: &str) -> Result<(), LinkError>;

    /// Administratively disables the interface.
    async fn set_link_down(&self, interface: &str) -> Result<(), LinkError>;

    /// Returns a human-readable status dump for the interface.
    ///
    /// Status is advisory only, so this never fails: on any problem it logs
    /// and returns an empty string.
    async fn link_status(&self, interface: &str) -> String;

    /// Switches the interface into connectionless (IBSS) operation.
    async fn set_connectionless_mode(&self, interface: &str) -> Result<(), LinkError>;

    /// Joins the named shared channel on the given 2.4 GHz channel number.
    async fn join_shared_channel(
        &self,
        interface: &str,
        channel: u32,
        network_name: &str,
    ) -> Result<(), LinkError>;
}

/// Maps a 2.4 GHz channel number to its center frequency in MHz.
///
/// Channels 1-13 are spaced 5 MHz apart from 2412; channel 14 sits apart at
/// 2484.
pub fn channel_center_mhz(channel: u32) -> u32 {
    if channel == 14 {
        2484
    } else {
        2407 + 5 * channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_center_mhz_standard_grid() {
        assert_eq!(channel_center_mhz(1), 2412);
        assert_eq!(channel_center_mhz(6), 2437);
        assert_eq!(channel_center_mhz(11), 2462);
        assert_eq!(channel_center_mhz(13), 2472);
    }

    #[test]
    fn test_channel_center_mhz_channel_14_is_offset() {
        assert_eq!(channel_center_mhz(14), 2484);
    }
}
