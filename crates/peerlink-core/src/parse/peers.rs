//! Peer-record extraction from discovery output.
//!
//! A peer-list response is one peer hardware address per line, usually
//! preceded by an interface banner:
//!
//! ```text
//! Selected interface 'wlan0'
//! 02:00:00:00:02:00
//! 5e:11:22:33:44:55
//! ```
//!
//! A peer-detail response repeats the address and follows it with
//! `key=value` fields:
//!
//! ```text
//! 02:00:00:00:02:00
//! pri_dev_type=1-0050F204-1
//! device_name=station-two
//! config_methods=0x188
//! ```

use tracing::debug;

use crate::domain::endpoint::MacAddr;

/// Extracts the ordered list of peer addresses from a peer-list response.
///
/// A line is a peer record exactly when its first whitespace token parses as
/// a hardware address; all other lines are skipped. Duplicate addresses keep
/// their first position. An empty result is a normal outcome, not an error.
pub fn parse_peer_list(raw: &str) -> Vec<MacAddr> {
    let mut peers: Vec<MacAddr> = Vec::new();
    for line in raw.lines() {
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        match token.parse::<MacAddr>() {
            Ok(mac) => {
                if !peers.contains(&mac) {
                    peers.push(mac);
                }
            }
            Err(_) => debug!(line, "skipping non-peer line in peer list"),
        }
    }
    peers
}

/// Extracts the advertised device name from a peer-detail response, if the
/// record carried one.
pub fn extract_device_name(raw: &str) -> Option<String> {
    for line in raw.lines() {
        if let Some(value) = line.trim().strip_prefix("device_name=") {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
