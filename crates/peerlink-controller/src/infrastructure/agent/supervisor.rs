//! Agent registry enforcing one live agent per interface.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use peerlink_core::Endpoint;

use super::{AgentError, AgentLauncher, AgentRef};

/// Owns every running agent, keyed by interface name.
pub struct AgentSupervisor {
    launcher: Box<dyn AgentLauncher>,
    agents: HashMap<String, AgentRef>,
}

impl AgentSupervisor {
    pub fn new(launcher: Box<dyn AgentLauncher>) -> Self {
        Self {
            launcher,
            agents: HashMap::new(),
        }
    }

    /// Starts an agent for `endpoint`, superseding any agent already bound
    /// to the same interface.
    pub async fn start(
        &mut self,
        endpoint: &Endpoint,
        config_blob: &str,
    ) -> Result<AgentRef, AgentError> {
        let interface = endpoint.interface();
        if let Some(existing) = self.agents.remove(interface) {
            warn!(interface, "superseding live discovery agent");
            existing.lock().await.stop().await;
        }

        let agent = self.launcher.launch(endpoint, config_blob).await?;
        let agent: AgentRef = Arc::new(tokio::sync::Mutex::new(agent));
        self.agents.insert(interface.to_string(), agent.clone());
        Ok(agent)
    }

    /// Returns the live agent for `interface`, if any.
    pub fn agent(&self, interface: &str) -> Option<AgentRef> {
        self.agents.get(interface).cloned()
    }

    /// Stops and forgets the agent on `interface`. No-op when absent.
    pub async fn stop(&mut self, interface: &str) {
        if let Some(agent) = self.agents.remove(interface) {
            agent.lock().await.stop().await;
        } else {
            debug!(interface, "no agent to stop");
        }
    }

    /// Stops every agent the supervisor knows about.
    pub async fn stop_all(&mut self) {
        for (interface, agent) in self.agents.drain() {
            debug!(interface = %interface, "stopping discovery agent");
            agent.lock().await.stop().await;
        }
    }
}
