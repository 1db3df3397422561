//! Reachability-probe statistics extraction.
//!
//! The probe tool prints a summary line after its final attempt:
//!
//! ```text
//! 3 packets transmitted, 3 received, 0% packet loss, time 2003ms
//! ```
//!
//! Busybox-style variants say `3 packets received` instead of `3 received`;
//! both shapes are handled. Only the transmitted/received counts are
//! extracted; everything else on the line is ignored.

use tracing::debug;

/// Extracts `(transmitted, received)` from probe output.
///
/// Returns `None` when no summary line is present (the probe was killed
/// before finishing, or the output is not probe output at all).
pub fn parse_probe_summary(raw: &str) -> Option<(u32, u32)> {
    let line = raw.lines().find(|l| l.contains("packets transmitted"))?;

    let mut transmitted: Option<u32> = None;
    let mut received: Option<u32> = None;
    for part in line.split(',') {
        let part = part.trim();
        if part.contains("packets transmitted") {
            transmitted = leading_count(part);
        } else if part.contains("received") && !part.contains("errors") {
            received = leading_count(part);
        }
    }

    match (transmitted, received) {
        (Some(tx), Some(rx)) => Some((tx, rx)),
        _ => {
            debug!(line, "probe summary line did not carry both counts");
            None
        }
    }
}

fn leading_count(part: &str) -> Option<u32> {
    part.split_whitespace().next()?.parse().ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
