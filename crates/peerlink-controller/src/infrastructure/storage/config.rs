//! TOML-based configuration persistence for the pairing controller.
//!
//! Reads and writes `ControllerConfig` to the platform-appropriate config file:
//! - Linux:    `~/.config/peerlink/config.toml`
//! - macOS:    `~/Library/Application Support/PeerLink/config.toml`
//! - Windows:  `%APPDATA%\PeerLink\config.toml`
//!
//! Every section has defaults tuned for a two-station bench with `wlan0` and
//! `wlan1`, so the controller runs before a config file exists.  Example:
//!
//! ```toml
//! [initiator]
//! interface = "wlan0"
//! mac = "02:00:00:00:01:00"
//! address = "192.168.49.1"
//! device_name = "peerlink-initiator"
//!
//! [discovery]
//! window_secs = 10
//! poll_interval_secs = 1
//! ```
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, so older or
//! partial config files keep working as new sections are added.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use peerlink_core::{Endpoint, MacAddr};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config parsed but a value is unusable for a session.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level controller configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// Endpoint that initiates the pairing handshake.
    #[serde(default = "default_initiator")]
    pub initiator: EndpointSettings,
    /// Endpoint that answers the handshake.
    #[serde(default = "default_responder")]
    pub responder: EndpointSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub verification: VerificationSettings,
    #[serde(default)]
    pub fallback: FallbackSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Identity of one managed endpoint.
///
/// When the section is present in the file, all four fields are required;
/// a half-specified endpoint is a config mistake worth failing on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointSettings {
    /// Wireless interface name, e.g. `"wlan0"`.
    pub interface: String,
    /// Hardware address of the interface.
    pub mac: MacAddr,
    /// Address assigned to the interface, used as probe target.
    pub address: IpAddr,
    /// Name announced to peers during discovery.
    pub device_name: String,
}

impl EndpointSettings {
    /// Builds the runtime endpoint this record describes.
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.interface, self.mac, self.address, &self.device_name)
    }
}

/// Discovery window settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySettings {
    /// How long the discovery window stays open.
    #[serde(default = "default_discovery_window_secs")]
    pub window_secs: u64,
    /// Pause between peer-list polls inside the window.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl DiscoverySettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Connection wait settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSettings {
    /// Hard deadline for the link to come up after the handshake.
    #[serde(default = "default_connection_deadline_secs")]
    pub deadline_secs: u64,
    /// Pause between link status polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl ConnectionSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Connectivity verification settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationSettings {
    /// Number of probes in the verification burst.
    #[serde(default = "default_probe_attempts")]
    pub attempts: u32,
    /// How long to wait for each probe reply.
    #[serde(default = "default_probe_timeout_secs")]
    pub per_attempt_timeout_secs: u64,
}

impl VerificationSettings {
    pub fn per_attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.per_attempt_timeout_secs)
    }
}

/// Ad-hoc fallback channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FallbackSettings {
    /// 2.4 GHz channel number to regroup on.
    #[serde(default = "default_fallback_channel")]
    pub channel: u32,
    /// Network name both endpoints join.
    #[serde(default = "default_fallback_network")]
    pub network_name: String,
}

/// Discovery agent settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    /// Path to the `wpa_supplicant` binary.
    #[serde(default = "default_supplicant_bin")]
    pub supplicant_bin: String,
    /// Path to the `wpa_cli` binary.
    #[serde(default = "default_cli_bin")]
    pub cli_bin: String,
    /// Driver name passed to the supplicant.
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Control socket directory shared with `wpa_cli`.
    #[serde(default = "default_ctrl_dir")]
    pub ctrl_dir: String,
    /// Directory where rendered per-interface configs are written.
    #[serde(default = "default_agent_config_dir")]
    pub config_dir: PathBuf,
    /// Group-owner intent (0-15, higher = more likely to own the group).
    #[serde(default = "default_go_intent")]
    pub go_intent: u32,
    /// 2.4 GHz channel the agent listens on.
    #[serde(default = "default_listen_channel")]
    pub listen_channel: u32,
    /// Timeout for a single control command.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl AgentSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_initiator() -> EndpointSettings {
    EndpointSettings {
        interface: "wlan0".to_string(),
        mac: MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x01, 0x00]),
        address: IpAddr::from([192, 168, 49, 1]),
        device_name: "peerlink-initiator".to_string(),
    }
}
fn default_responder() -> EndpointSettings {
    EndpointSettings {
        interface: "wlan1".to_string(),
        mac: MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x02, 0x00]),
        address: IpAddr::from([192, 168, 49, 2]),
        device_name: "peerlink-responder".to_string(),
    }
}
fn default_discovery_window_secs() -> u64 {
    10
}
fn default_poll_interval_secs() -> u64 {
    1
}
fn default_connection_deadline_secs() -> u64 {
    30
}
fn default_probe_attempts() -> u32 {
    3
}
fn default_probe_timeout_secs() -> u64 {
    2
}
fn default_fallback_channel() -> u32 {
    6
}
fn default_fallback_network() -> String {
    "peerlink-adhoc".to_string()
}
fn default_supplicant_bin() -> String {
    "wpa_supplicant".to_string()
}
fn default_cli_bin() -> String {
    "wpa_cli".to_string()
}
fn default_driver() -> String {
    "nl80211".to_string()
}
fn default_ctrl_dir() -> String {
    "/var/run/wpa_supplicant".to_string()
}
fn default_agent_config_dir() -> PathBuf {
    std::env::temp_dir().join("peerlink")
}
fn default_go_intent() -> u32 {
    7
}
fn default_listen_channel() -> u32 {
    1
}
fn default_command_timeout_secs() -> u64 {
    10
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initiator: default_initiator(),
            responder: default_responder(),
            discovery: DiscoverySettings::default(),
            connection: ConnectionSettings::default(),
            verification: VerificationSettings::default(),
            fallback: FallbackSettings::default(),
            agent: AgentSettings::default(),
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            window_secs: default_discovery_window_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            deadline_secs: default_connection_deadline_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            attempts: default_probe_attempts(),
            per_attempt_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            channel: default_fallback_channel(),
            network_name: default_fallback_network(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            supplicant_bin: default_supplicant_bin(),
            cli_bin: default_cli_bin(),
            driver: default_driver(),
            ctrl_dir: default_ctrl_dir(),
            config_dir: default_agent_config_dir(),
            go_intent: default_go_intent(),
            listen_channel: default_listen_channel(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

impl ControllerConfig {
    /// Checks the values a session could not run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
            Ok(())
        }
        fn channel_in_band(field: &'static str, channel: u32) -> Result<(), ConfigError> {
            if !(1..=14).contains(&channel) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("channel {channel} is outside the 2.4 GHz band (1-14)"),
                });
            }
            Ok(())
        }

        if self.initiator.interface.is_empty() {
            return Err(ConfigError::Invalid {
                field: "initiator.interface",
                reason: "must not be empty".to_string(),
            });
        }
        if self.responder.interface.is_empty() {
            return Err(ConfigError::Invalid {
                field: "responder.interface",
                reason: "must not be empty".to_string(),
            });
        }
        if self.initiator.interface == self.responder.interface {
            return Err(ConfigError::Invalid {
                field: "responder.interface",
                reason: format!(
                    "both endpoints use '{}'; a session needs two interfaces",
                    self.initiator.interface
                ),
            });
        }

        non_zero("discovery.window_secs", self.discovery.window_secs)?;
        non_zero("discovery.poll_interval_secs", self.discovery.poll_interval_secs)?;
        non_zero("connection.deadline_secs", self.connection.deadline_secs)?;
        non_zero("connection.poll_interval_secs", self.connection.poll_interval_secs)?;
        non_zero("verification.attempts", u64::from(self.verification.attempts))?;
        non_zero(
            "verification.per_attempt_timeout_secs",
            self.verification.per_attempt_timeout_secs,
        )?;
        non_zero("agent.command_timeout_secs", self.agent.command_timeout_secs)?;

        channel_in_band("fallback.channel", self.fallback.channel)?;
        channel_in_band("agent.listen_channel", self.agent.listen_channel)?;

        if self.agent.go_intent > 15 {
            return Err(ConfigError::Invalid {
                field: "agent.go_intent",
                reason: format!("{} is outside the 0-15 range", self.agent.go_intent),
            });
        }

        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `ControllerConfig` from the platform path, returning
/// `ControllerConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if a value fails validation.
pub fn load_config() -> Result<ControllerConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: ControllerConfig = toml::from_str(&content)?;
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ControllerConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Loads `ControllerConfig` from an explicit path.
///
/// Unlike [`load_config`], a missing file here is an error: the operator
/// named this path on purpose.
///
/// # Errors
///
/// Returns [`ConfigError::Io`], [`ConfigError::Parse`], or
/// [`ConfigError::Invalid`] as for [`load_config`].
pub fn load_config_from(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: ControllerConfig = toml::from_str(&content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Persists `config` to the platform path.
///
/// Creates the config directory and file if they do not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ControllerConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    // Ensure directory exists before writing.
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory without the `peerlink` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("peerlink"))
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/PeerLink
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PeerLink")
        })
    }

    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PeerLink"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        // Fallback for unsupported platforms.
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_default_config_has_expected_timings() {
        // Arrange / Act
        let cfg = ControllerConfig::default();

        // Assert
        assert_eq!(cfg.discovery.window(), Duration::from_secs(10));
        assert_eq!(cfg.discovery.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.connection.deadline(), Duration::from_secs(30));
        assert_eq!(cfg.connection.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.verification.attempts, 3);
        assert_eq!(cfg.verification.per_attempt_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_default_config_endpoints_are_distinct() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.initiator.interface, "wlan0");
        assert_eq!(cfg.responder.interface, "wlan1");
        assert_ne!(cfg.initiator.mac, cfg.responder.mac);
        assert_ne!(cfg.initiator.address, cfg.responder.address);
    }

    #[test]
    fn test_default_config_passes_validation() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_fallback_is_channel_6() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.fallback.channel, 6);
        assert_eq!(cfg.fallback.network_name, "peerlink-adhoc");
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = ControllerConfig::default();
        cfg.discovery.window_secs = 20;
        cfg.fallback.network_name = "bench-net".to_string();

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: ControllerConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_partial_file_fills_missing_sections_with_defaults() {
        // Arrange: only the discovery window is customized.
        let toml_str = "[discovery]\nwindow_secs = 25\n";

        // Act
        let cfg: ControllerConfig = toml::from_str(toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg.discovery.window_secs, 25);
        assert_eq!(cfg.discovery.poll_interval_secs, 1);
        assert_eq!(cfg.initiator.interface, "wlan0");
        assert_eq!(cfg.connection.deadline_secs, 30);
    }

    #[test]
    fn test_endpoint_section_requires_all_fields() {
        // Arrange: an initiator section missing mac/address/device_name.
        let toml_str = "[initiator]\ninterface = \"wlan7\"\n";

        // Act / Assert
        assert!(toml::from_str::<ControllerConfig>(toml_str).is_err());
    }

    #[test]
    fn test_custom_endpoint_section_parses() {
        // Arrange
        let toml_str = concat!(
            "[initiator]\n",
            "interface = \"wlp2s0\"\n",
            "mac = \"aa:bb:cc:dd:ee:ff\"\n",
            "address = \"10.0.0.1\"\n",
            "device_name = \"left-bench\"\n",
        );

        // Act
        let cfg: ControllerConfig = toml::from_str(toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg.initiator.interface, "wlp2s0");
        assert_eq!(cfg.initiator.mac.to_string(), "aa:bb:cc:dd:ee:ff");
        let endpoint = cfg.initiator.to_endpoint();
        assert_eq!(endpoint.device_name(), "left-bench");
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut cfg = ControllerConfig::default();
        cfg.discovery.poll_interval_secs = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "discovery.poll_interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_shared_interface() {
        let mut cfg = ControllerConfig::default();
        cfg.responder.interface = cfg.initiator.interface.clone();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "responder.interface",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_band_channel() {
        let mut cfg = ControllerConfig::default();
        cfg.fallback.channel = 15;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "fallback.channel",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_probe_attempts() {
        let mut cfg = ControllerConfig::default();
        cfg.verification.attempts = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "verification.attempts",
                ..
            })
        ));
    }

    // ── File loading ──────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_reads_and_validates() {
        // Arrange
        let path = std::env::temp_dir().join("peerlink-test-config.toml");
        std::fs::write(&path, "[discovery]\nwindow_secs = 4\n").expect("write");

        // Act
        let cfg = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(cfg.discovery.window_secs, 4);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_config_from_missing_path_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/peerlink.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_config_from_rejects_invalid_values() {
        // Arrange
        let path = std::env::temp_dir().join("peerlink-test-bad-config.toml");
        std::fs::write(&path, "[connection]\ndeadline_secs = 0\n").expect("write");

        // Act / Assert
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Invalid { .. })
        ));
        let _ = std::fs::remove_file(path);
    }
}
