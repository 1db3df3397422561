//! Mock discovery agents for unit testing.
//!
//! Tests script responses per interface and command prefix, then drive the
//! real use cases against them. Every command an agent receives is
//! journalled so tests can assert on the exact control traffic.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use peerlink_core::Endpoint;

use super::{AgentError, AgentLauncher, AgentProcess};

type ScriptTable = HashMap<String, HashMap<String, VecDeque<String>>>;

/// A mock implementation of [`AgentLauncher`] with scriptable agents.
#[derive(Clone)]
pub struct MockAgentLauncher {
    scripts: Arc<Mutex<ScriptTable>>,
    fail_prefixes: Arc<Mutex<HashMap<String, HashSet<String>>>>,
    fail_launch: Arc<Mutex<HashSet<String>>>,
    spawned: Arc<Mutex<Vec<MockAgentHandle>>>,
}

/// Test-side view of one spawned mock agent.
#[derive(Clone)]
pub struct MockAgentHandle {
    interface: String,
    alive: Arc<AtomicBool>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl MockAgentHandle {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Returns every command the agent received, in order.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().expect("lock poisoned").clone()
    }
}

impl MockAgentLauncher {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            fail_prefixes: Arc::new(Mutex::new(HashMap::new())),
            fail_launch: Arc::new(Mutex::new(HashSet::new())),
            spawned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Scripts responses for commands starting with `prefix` on `interface`.
    ///
    /// Responses are served in order; the final one repeats forever, so a
    /// status sequence can be scripted as "SCANNING, SCANNING, COMPLETED".
    pub fn script<I, S>(&self, interface: &str, prefix: &str, responses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scripts = self.scripts.lock().expect("lock poisoned");
        scripts
            .entry(interface.to_string())
            .or_default()
            .insert(prefix.to_string(), responses.into_iter().map(Into::into).collect());
    }

    /// Makes commands starting with `prefix` on `interface` fail as if the
    /// control socket were unreachable.
    pub fn fail_command(&self, interface: &str, prefix: &str) {
        self.fail_prefixes
            .lock()
            .expect("lock poisoned")
            .entry(interface.to_string())
            .or_default()
            .insert(prefix.to_string());
    }

    /// Makes `launch` fail for `interface`.
    pub fn fail_launch(&self, interface: &str) {
        self.fail_launch
            .lock()
            .expect("lock poisoned")
            .insert(interface.to_string());
    }

    /// Returns a handle for every agent launched so far.
    pub fn spawned(&self) -> Vec<MockAgentHandle> {
        self.spawned.lock().expect("lock poisoned").clone()
    }

    /// Returns the handle for the agent on `interface`, if one was launched.
    pub fn handle(&self, interface: &str) -> Option<MockAgentHandle> {
        self.spawned
            .lock()
            .expect("lock poisoned")
            .iter()
            .find(|h| h.interface == interface)
            .cloned()
    }
}

impl Default for MockAgentLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentLauncher for MockAgentLauncher {
    async fn launch(
        &self,
        endpoint: &Endpoint,
        _config_blob: &str,
    ) -> Result<Box<dyn AgentProcess>, AgentError> {
        let interface = endpoint.interface().to_string();
        if self
            .fail_launch
            .lock()
            .expect("lock poisoned")
            .contains(&interface)
        {
            return Err(AgentError::SpawnFailed {
                interface,
                source: io::Error::other("scripted launch failure"),
            });
        }

        let handle = MockAgentHandle {
            interface: interface.clone(),
            alive: Arc::new(AtomicBool::new(true)),
            journal: Arc::new(Mutex::new(Vec::new())),
        };
        self.spawned
            .lock()
            .expect("lock poisoned")
            .push(handle.clone());

        Ok(Box::new(MockAgent {
            interface,
            alive: handle.alive,
            journal: handle.journal,
            scripts: self.scripts.clone(),
            fail_prefixes: self.fail_prefixes.clone(),
        }))
    }
}

#[derive(Debug)]
struct MockAgent {
    interface: String,
    alive: Arc<AtomicBool>,
    journal: Arc<Mutex<Vec<String>>>,
    scripts: Arc<Mutex<ScriptTable>>,
    fail_prefixes: Arc<Mutex<HashMap<String, HashSet<String>>>>,
}

#[async_trait]
impl AgentProcess for MockAgent {
    fn interface(&self) -> &str {
        &self.interface
    }

    async fn is_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn command(&mut self, command: &str) -> Result<String, AgentError> {
        self.journal
            .lock()
            .expect("lock poisoned")
            .push(command.to_string());

        if !self.alive.load(Ordering::SeqCst) {
            return Err(AgentError::Unavailable {
                interface: self.interface.clone(),
            });
        }

        if let Some(prefixes) = self
            .fail_prefixes
            .lock()
            .expect("lock poisoned")
            .get(&self.interface)
        {
            if prefixes.iter().any(|p| command.starts_with(p.as_str())) {
                return Err(AgentError::Unavailable {
                    interface: self.interface.clone(),
                });
            }
        }

        let mut scripts = self.scripts.lock().expect("lock poisoned");
        let Some(table) = scripts.get_mut(&self.interface) else {
            return Ok(String::new());
        };

        // Longest matching prefix wins, so "p2p_peer " can be scripted
        // separately from "p2p_peers".
        let Some(prefix) = table
            .keys()
            .filter(|p| command.starts_with(p.as_str()))
            .max_by_key(|p| p.len())
            .cloned()
        else {
            return Ok(String::new());
        };

        let queue = table.get_mut(&prefix).expect("prefix just found");
        let response = if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().cloned().unwrap_or_default()
        };
        Ok(response)
    }

    async fn stop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use peerlink_core::MacAddr;

    use super::*;

    fn make_endpoint(interface: &str) -> Endpoint {
        Endpoint::new(
            interface,
            "02:00:00:00:01:00".parse::<MacAddr>().unwrap(),
            "192.168.49.1".parse::<IpAddr>().unwrap(),
            "station-one",
        )
    }

    #[tokio::test]
    async fn test_scripted_responses_serve_in_order_then_repeat_last() {
        // Arrange
        let launcher = MockAgentLauncher::new();
        launcher.script("wlan0", "status", ["SCANNING", "SCANNING", "COMPLETED"]);
        let mut agent = launcher.launch(&make_endpoint("wlan0"), "").await.unwrap();

        // Act + Assert
        assert_eq!(agent.command("status").await.unwrap(), "SCANNING");
        assert_eq!(agent.command("status").await.unwrap(), "SCANNING");
        assert_eq!(agent.command("status").await.unwrap(), "COMPLETED");
        assert_eq!(agent.command("status").await.unwrap(), "COMPLETED");
    }

    #[tokio::test]
    async fn test_longest_prefix_wins_over_shorter_one() {
        // Arrange
        let launcher = MockAgentLauncher::new();
        launcher.script("wlan0", "p2p_peer", ["02:00:00:00:02:00"]);
        launcher.script("wlan0", "p2p_peer 02:", ["device_name=station-two"]);
        let mut agent = launcher.launch(&make_endpoint("wlan0"), "").await.unwrap();

        // Act + Assert
        assert_eq!(
            agent.command("p2p_peer 02:00:00:00:02:00").await.unwrap(),
            "device_name=station-two"
        );
        assert_eq!(
            agent.command("p2p_peers").await.unwrap(),
            "02:00:00:00:02:00"
        );
    }

    #[tokio::test]
    async fn test_unscripted_command_answers_empty() {
        // Arrange
        let launcher = MockAgentLauncher::new();
        let mut agent = launcher.launch(&make_endpoint("wlan0"), "").await.unwrap();

        // Act + Assert
        assert_eq!(agent.command("p2p_find").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_fail_command_and_journal() {
        // Arrange
        let launcher = MockAgentLauncher::new();
        launcher.fail_command("wlan0", "p2p_connect");
        let mut agent = launcher.launch(&make_endpoint("wlan0"), "").await.unwrap();

        // Act
        let err = agent.command("p2p_connect 02:00:00:00:02:00 pin auth").await;

        // Assert: the failure is recorded in the journal all the same.
        assert!(matches!(err, Err(AgentError::Unavailable { .. })));
        let handle = launcher.handle("wlan0").expect("spawned");
        assert_eq!(
            handle.journal(),
            vec!["p2p_connect 02:00:00:00:02:00 pin auth"]
        );
    }

    #[tokio::test]
    async fn test_stop_marks_handle_dead() {
        // Arrange
        let launcher = MockAgentLauncher::new();
        launcher.fail_launch("wlan1");
        let mut agent = launcher.launch(&make_endpoint("wlan0"), "").await.unwrap();

        // Act
        agent.stop().await;

        // Assert
        assert!(!launcher.handle("wlan0").expect("spawned").is_alive());
        assert!(launcher.launch(&make_endpoint("wlan1"), "").await.is_err());
    }
}
