//! PIN and status-marker extraction from pairing responses.
//!
//! When the initiator requests PIN-based pairing, the agent answers with the
//! generated PIN somewhere in its response:
//!
//! ```text
//! Selected interface 'wlan0'
//! 61729575
//! ```
//!
//! A refused command answers with a line starting `FAIL` (optionally with a
//! reason suffix such as `FAIL-CHANNEL-UNAVAILABLE`). Connection progress is
//! read from the status response, which reports `wpa_state=COMPLETED` once
//! the link is up.

/// Substring that marks an established link in a status response.
pub const CONNECTED_MARKER: &str = "wpa_state=COMPLETED";

/// Shortest PIN the agent is expected to produce.
const MIN_PIN_DIGITS: usize = 4;
/// Longest token still treated as a PIN rather than arbitrary numeric noise.
const MAX_PIN_DIGITS: usize = 16;

/// Extracts the pairing PIN from an initiate response.
///
/// The PIN is the first whitespace-separated token consisting entirely of
/// ASCII digits with a plausible length. Banner lines, addresses, and
/// hex-prefixed fields never qualify. Returns `None` when the response
/// carries no usable PIN.
pub fn extract_pin(raw: &str) -> Option<String> {
    raw.split_whitespace()
        .find(|token| {
            (MIN_PIN_DIGITS..=MAX_PIN_DIGITS).contains(&token.len())
                && token.bytes().all(|b| b.is_ascii_digit())
        })
        .map(str::to_string)
}

/// Whether a status response reports an established link.
pub fn is_connected(raw: &str) -> bool {
    raw.contains(CONNECTED_MARKER)
}

/// Whether the agent refused a command.
///
/// Tolerant of surrounding banner text: any line whose first token starts
/// with `FAIL` counts as a rejection.
pub fn is_rejection(raw: &str) -> bool {
    raw.lines().any(|line| {
        line.split_whitespace()
            .next()
            .is_some_and(|token| token.starts_with("FAIL"))
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
