//! Shared state every handler reads or mutates through (`spec.md`
//! §4.7.3), mirroring `mano-tn-agent`'s `Arc<AgentState>` idiom.

use std::{collections::HashMap, sync::Mutex};

use tokio_util::sync::CancellationToken;

use crate::{dispatch::HttpAgentProbe, registry::AgentRegistry, report::ThesisReport};

pub struct ManagerState {
    pub registry: std::sync::Arc<AgentRegistry>,
    pub client: reqwest::Client,
    pub probe: HttpAgentProbe,
    pub cancel: CancellationToken,
    reports: Mutex<HashMap<String, ThesisReport>>,
}

impl ManagerState {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        let client = reqwest::Client::new();
        Self {
            registry: std::sync::Arc::new(AgentRegistry::new()),
            probe: HttpAgentProbe::new(client.clone()),
            client,
            cancel,
            reports: Mutex::new(HashMap::new()),
        }
    }

    pub fn store_report(&self, report: ThesisReport) {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).insert(report.test_id.clone(), report);
    }

    #[must_use]
    pub fn report(&self, test_id: &str) -> Option<ThesisReport> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).get(test_id).cloned()
    }
}
