//! Mock link control for unit testing.
//!
//! Keeps an in-memory link table so tests can drive full sessions without
//! touching real interfaces, and journals every action for assertions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{LinkControl, LinkError};

/// A mock implementation of [`LinkControl`] backed by an in-memory table.
#[derive(Clone)]
pub struct MockLinkControl {
    journal: Arc<Mutex<Vec<String>>>,
    up: Arc<Mutex<HashMap<String, bool>>>,
    adhoc: Arc<Mutex<HashMap<String, (u32, String)>>>,
    fail_bring_up: Arc<Mutex<HashSet<String>>>,
}

impl MockLinkControl {
    /// Creates a new mock with every interface down.
    pub fn new() -> Self {
        Self {
            journal: Arc::new(Mutex::new(Vec::new())),
            up: Arc::new(Mutex::new(HashMap::new())),
            adhoc: Arc::new(Mutex::new(HashMap::new())),
            fail_bring_up: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Makes every future `set_link_up` on `interface` fail.
    pub fn fail_bring_up(&self, interface: &str) {
        self.fail_bring_up
            .lock()
            .expect("lock poisoned")
            .insert(interface.to_string());
    }

    /// Returns every action performed so far, in order.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().expect("lock poisoned").clone()
    }

    /// Returns whether the interface is administratively up.
    pub fn is_up(&self, interface: &str) -> bool {
        self.up
            .lock()
            .expect("lock poisoned")
            .get(interface)
            .copied()
            .unwrap_or(false)
    }

    /// Returns the channel and network name the interface last joined.
    pub fn adhoc_params(&self, interface: &str) -> Option<(u32, String)> {
        self.adhoc
            .lock()
            .expect("lock poisoned")
            .get(interface)
            .cloned()
    }

    fn record(&self, entry: String) {
        self.journal.lock().expect("lock poisoned").push(entry);
    }
}

impl Default for MockLinkControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkControl for MockLinkControl {
    async fn set_link_up(&self, interface: &str) -> Result<(), LinkError> {
        self.record(format!("link-up {interface}"));
        if self
            .fail_bring_up
            .lock()
            .expect("lock poisoned")
            .contains(interface)
        {
            return Err(LinkError::CommandFailed {
                interface: interface.to_string(),
                action: "link-up",
                code: Some(1),
                stderr: "scripted failure".to_string(),
            });
        }
        self.up
            .lock()
            .expect("lock poisoned")
            .insert(interface.to_string(), true);
        Ok(())
    }

    async fn set_link_down(&self, interface: &str) -> Result<(), LinkError> {
        self.record(format!("link-down {interface}"));
        self.up
            .lock()
            .expect("lock poisoned")
            .insert(interface.to_string(), false);
        Ok(())
    }

    async fn link_status(&self, interface: &str) -> String {
        let state = if self.is_up(interface) { "UP" } else { "DOWN" };
        format!("{interface}: state {state}")
    }

    async fn set_connectionless_mode(&self, interface: &str) -> Result<(), LinkError> {
        self.record(format!("set-ibss-mode {interface}"));
        Ok(())
    }

    async fn join_shared_channel(
        &self,
        interface: &str,
        channel: u32,
        network_name: &str,
    ) -> Result<(), LinkError> {
        self.record(format!("join-channel {interface} {channel} {network_name}"));
        self.adhoc
            .lock()
            .expect("lock poisoned")
            .insert(interface.to_string(), (channel, network_name.to_string()));
        Ok(())
    }
}
