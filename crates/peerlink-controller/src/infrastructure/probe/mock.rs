//! Mock connectivity probe for unit testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use peerlink_core::{ConnectivityResult, Endpoint};

use super::ConnectivityProbe;

/// A mock implementation of [`ConnectivityProbe`] with scripted reply counts.
///
/// By default every probe burst is fully answered. Each call consumes the
/// next scripted count; the final one repeats forever.
#[derive(Clone)]
pub struct MockConnectivityProbe {
    replies: Arc<Mutex<VecDeque<u32>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockConnectivityProbe {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Scripts the reply count for each upcoming burst.
    pub fn script_replies<I>(&self, counts: I)
    where
        I: IntoIterator<Item = u32>,
    {
        *self.replies.lock().expect("lock poisoned") = counts.into_iter().collect();
    }

    /// Returns one entry per burst: "source-interface -> target-address xN".
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockConnectivityProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectivityProbe for MockConnectivityProbe {
    async fn verify(
        &self,
        source: &Endpoint,
        target: &Endpoint,
        attempts: u32,
        _per_attempt_timeout: Duration,
    ) -> ConnectivityResult {
        self.calls.lock().expect("lock poisoned").push(format!(
            "{} -> {} x{attempts}",
            source.interface(),
            target.address()
        ));

        let replies = {
            let mut queue = self.replies.lock().expect("lock poisoned");
            if queue.len() > 1 {
                queue.pop_front().unwrap_or(attempts)
            } else {
                queue.front().copied().unwrap_or(attempts)
            }
        };
        let replies = replies.min(attempts);

        ConnectivityResult::from_counts(
            attempts,
            replies,
            format!("{replies}/{attempts} scripted replies"),
        )
    }
}
