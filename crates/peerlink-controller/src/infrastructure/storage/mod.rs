//! Storage infrastructure: configuration file persistence.
//!
//! This module provides a thin adapter between the application and the
//! file system.  The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate directory.
//! - Writing a template back to disk so operators can edit it.
//! - Providing sensible defaults when the file does not exist yet (first run).
//! - Rejecting configurations the session could not run with (zero poll
//!   intervals, identical interfaces, out-of-range channels).

pub mod config;
