//! Fixed-interval polling with a hard deadline.
//!
//! Discovery and connection waiting both reduce to the same shape: run a
//! check, and if it is not yet satisfied, sleep a fixed interval and try
//! again until a deadline passes. [`poll_until`] is that shape, written once.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Polls `check` every `poll_interval` until it returns `true` or `deadline`
/// has elapsed.
///
/// The first check runs immediately, so at least one check happens even when
/// `deadline` is zero. The deadline is re-examined after every check, which
/// bounds the total wait to `deadline` plus one interval plus one check.
pub async fn poll_until<C, F>(poll_interval: Duration, deadline: Duration, mut check: C) -> bool
where
    C: FnMut() -> F,
    F: Future<Output = bool>,
{
    let started = Instant::now();
    loop {
        if check().await {
            return true;
        }
        if started.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
