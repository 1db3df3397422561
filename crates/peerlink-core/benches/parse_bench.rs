//! Criterion benchmarks for the agent-output parsers.
//!
//! Measures the latency of peer-list, handshake, and probe-summary parsing.
//! These parsers sit on the discovery polling loop, so they are exercised
//! once per poll tick and should stay comfortably in the microsecond class.
//!
//! Run with:
//! ```bash
//! cargo bench --package peerlink-core --bench parse_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use peerlink_core::{extract_pin, is_connected, parse_peer_list, parse_probe_summary};

// ── Output fixtures ───────────────────────────────────────────────────────────

/// Builds a peer-list transcript with `count` addresses plus the usual
/// interface banner line.
fn make_peer_list(count: usize) -> String {
    let mut raw = String::from("Selected interface 'wlan0'\n");
    for i in 0..count {
        raw.push_str(&format!("02:00:00:00:{:02x}:{:02x}\n", i / 256, i % 256));
    }
    raw
}

fn make_pin_response() -> String {
    "Selected interface 'wlan0'\n61729575\n".to_string()
}

fn make_status_output() -> String {
    concat!(
        "bssid=02:00:00:00:02:00\n",
        "freq=2437\n",
        "ssid=DIRECT-xy\n",
        "mode=station\n",
        "wpa_state=COMPLETED\n",
        "ip_address=192.168.49.1\n",
    )
    .to_string()
}

fn make_probe_output() -> String {
    concat!(
        "PING 192.168.49.2 (192.168.49.2) 56(84) bytes of data.\n",
        "64 bytes from 192.168.49.2: icmp_seq=1 ttl=64 time=1.24 ms\n",
        "64 bytes from 192.168.49.2: icmp_seq=2 ttl=64 time=0.98 ms\n",
        "64 bytes from 192.168.49.2: icmp_seq=3 ttl=64 time=1.02 ms\n",
        "\n",
        "--- 192.168.49.2 ping statistics ---\n",
        "3 packets transmitted, 3 received, 0% packet loss, time 2003ms\n",
        "rtt min/avg/max/mdev = 0.980/1.080/1.240/0.115 ms\n",
    )
    .to_string()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

/// Benchmarks peer-list parsing across realistic list sizes. A lab bench has
/// one or two peers in range; a busy office floor can show dozens.
fn bench_parse_peer_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_peer_list");
    for count in [1usize, 8, 64] {
        let raw = make_peer_list(count);
        group.bench_with_input(BenchmarkId::new("peers", count), &raw, |b, raw| {
            b.iter(|| parse_peer_list(black_box(raw)))
        });
    }
    group.finish();
}

fn bench_handshake_parsers(c: &mut Criterion) {
    let mut group = c.benchmark_group("handshake");

    let pin_response = make_pin_response();
    group.bench_function("extract_pin", |b| {
        b.iter(|| extract_pin(black_box(&pin_response)))
    });

    let status = make_status_output();
    group.bench_function("is_connected", |b| {
        b.iter(|| is_connected(black_box(&status)))
    });

    group.finish();
}

fn bench_parse_probe_summary(c: &mut Criterion) {
    let output = make_probe_output();
    c.bench_function("parse_probe_summary", |b| {
        b.iter(|| parse_probe_summary(black_box(&output)))
    });
}

criterion_group!(
    benches,
    bench_parse_peer_list,
    bench_handshake_parsers,
    bench_parse_probe_summary
);
criterion_main!(benches);
