//! PeerLink pairing controller entry point.
//!
//! Wires together all infrastructure adapters and starts the Tokio async
//! runtime. One invocation drives one pairing session and exits with a code
//! describing how it went.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML file or built-in defaults
//!  └─ wire adapters
//!       ├─ ShellLinkControl      (ip / iw)
//!       ├─ SupplicantLauncher    (wpa_supplicant / wpa_cli)
//!       └─ PingProbe             (ping)
//!  └─ SessionOrchestrator::run  (Tokio task, raced against Ctrl-C)
//! ```
//!
//! # Exit codes
//!
//! - `0` – session verified and every probe was answered
//! - `1` – session verified but verification probes went unanswered
//! - `2` – session failed during stage setting
//! - `130` – interrupted

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use peerlink_core::SessionState;
use peerlink_controller::application::run_session::{
    SessionOrchestrator, SessionReport, SessionSettings,
};
use peerlink_controller::infrastructure::agent::supplicant::{render_config, SupplicantLauncher};
use peerlink_controller::infrastructure::agent::AgentSupervisor;
use peerlink_controller::infrastructure::netif::shell::ShellLinkControl;
use peerlink_controller::infrastructure::probe::ping::PingProbe;
use peerlink_controller::infrastructure::storage::config::{
    load_config, load_config_from, ControllerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("PeerLink pairing controller starting");

    // An explicit config path on the command line wins over the platform one.
    let config = match std::env::args().nth(1) {
        Some(path) => load_config_from(&PathBuf::from(path))?,
        None => load_config()?,
    };

    let orchestrator = build_orchestrator(&config);

    // The session races the interrupt handler. On interrupt the controller
    // exits without tearing the bench down; agents started by this run stay
    // alive, and the next run supersedes them.
    let report = tokio::select! {
        report = orchestrator.run() => report,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; discovery agents may still be running");
            std::process::exit(130);
        }
    };

    summarize(&report);
    std::process::exit(exit_code(&report));
}

fn build_orchestrator(config: &ControllerConfig) -> SessionOrchestrator {
    let initiator = config.initiator.to_endpoint();
    let responder = config.responder.to_endpoint();

    let settings = SessionSettings {
        discovery_window: config.discovery.window(),
        discovery_poll: config.discovery.poll_interval(),
        connect_deadline: config.connection.deadline(),
        connect_poll: config.connection.poll_interval(),
        probe_attempts: config.verification.attempts,
        probe_timeout: config.verification.per_attempt_timeout(),
        fallback_channel: config.fallback.channel,
        fallback_network: config.fallback.network_name.clone(),
        initiator_agent_config: render_config(
            &initiator,
            &config.agent.ctrl_dir,
            config.agent.go_intent,
            config.agent.listen_channel,
        ),
        responder_agent_config: render_config(
            &responder,
            &config.agent.ctrl_dir,
            config.agent.go_intent,
            config.agent.listen_channel,
        ),
    };

    SessionOrchestrator::new(
        Arc::new(ShellLinkControl::new()),
        Arc::new(PingProbe::new()),
        AgentSupervisor::new(Box::new(SupplicantLauncher::new(&config.agent))),
        settings,
        initiator,
        responder,
    )
}

fn summarize(report: &SessionReport) {
    match &report.connectivity {
        Some(c) => info!(
            session = %report.session_id,
            state = %report.state,
            path = report.path.map(|p| p.as_str()).unwrap_or("none"),
            replies = c.replies,
            attempts = c.attempts,
            reachable = c.success,
            "session report"
        ),
        None => info!(
            session = %report.session_id,
            state = %report.state,
            "session report: no verification ran"
        ),
    }
    if let Some(failure) = &report.failure {
        warn!(error = %failure, "session failure cause");
    }
}

fn exit_code(report: &SessionReport) -> i32 {
    match report.state {
        SessionState::Verified => {
            if report.connectivity.as_ref().is_some_and(|c| c.success) {
                0
            } else {
                1
            }
        }
        _ => 2,
    }
}
