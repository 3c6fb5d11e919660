//! Agent registration and per-agent health polling (`spec.md` §4.7.3:
//! "one goroutine-equivalent per registered agent for polling").

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use reqwest::Url;
use tokio_util::sync::CancellationToken;

const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(10);
const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub id: String,
    pub base_url: Url,
    pub healthy: bool,
}

struct Entry {
    base_url: Url,
    healthy: bool,
    last_poll: Instant,
}

/// Single-writer registry of known TN agents; reads dominate (dispatch
/// fans out over every healthy agent), matching the inventory
/// registry's `Mutex<HashMap<_, _>>` shape in `mano-core`.
#[derive(Default)]
pub struct AgentRegistry {
    agents: Mutex<HashMap<String, Entry>>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` at `base_url` and spawns its health-poll task,
    /// which runs until `cancel` fires.
    pub fn register(self: &std::sync::Arc<Self>, id: String, base_url: Url, client: reqwest::Client, cancel: CancellationToken) {
        self.agents.lock().unwrap_or_else(|e| e.into_inner()).insert(
            id.clone(),
            Entry {
                base_url: base_url.clone(),
                healthy: true,
                last_poll: Instant::now(),
            },
        );

        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_POLL_INTERVAL);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    _ = interval.tick() => registry.poll_once(&id, &base_url, &client).await,
                }
            }
        });
    }

    async fn poll_once(&self, id: &str, base_url: &Url, client: &reqwest::Client) {
        let Ok(health_url) = base_url.join("/health") else {
            return;
        };
        let healthy = client
            .get(health_url)
            .timeout(HEALTH_REQUEST_TIMEOUT)
            .send()
            .await
            .is_ok_and(|resp| resp.status().is_success());

        let mut agents = self.agents.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = agents.get_mut(id) {
            entry.healthy = healthy;
            entry.last_poll = Instant::now();
        }
        if !healthy {
            tracing::warn!(agent_id = id, "health poll failed");
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<AgentRecord> {
        self.agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, entry)| AgentRecord {
                id: id.clone(),
                base_url: entry.base_url.clone(),
                healthy: entry.healthy,
            })
            .collect()
    }

    #[must_use]
    pub fn healthy_agents(&self) -> Vec<AgentRecord> {
        self.list().into_iter().filter(|a| a.healthy).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_agent_starts_healthy() {
        let registry = std::sync::Arc::new(AgentRegistry::new());
        registry.register(
            "edge-1".to_owned(),
            Url::parse("http://127.0.0.1:9100").unwrap(),
            reqwest::Client::new(),
            CancellationToken::new(),
        );
        let agents = registry.list();
        assert_eq!(agents.len(), 1);
        assert!(agents[0].healthy);
    }

    #[test]
    fn healthy_agents_filters_out_unhealthy() {
        let registry = std::sync::Arc::new(AgentRegistry::new());
        registry.register(
            "edge-1".to_owned(),
            Url::parse("http://127.0.0.1:9100").unwrap(),
            reqwest::Client::new(),
            CancellationToken::new(),
        );
        {
            let mut agents = registry.agents.lock().unwrap();
            agents.get_mut("edge-1").unwrap().healthy = false;
        }
        assert!(registry.healthy_agents().is_empty());
    }
}
