//! Synchronised multi-site test dispatch: a fan-out of per-agent probes
//! joined with a per-agent deadline (`spec.md` §4.7.3).

use std::{collections::HashMap, time::Duration, time::SystemTime};

use async_trait::async_trait;
use mano_core::SliceClass;

use crate::registry::AgentRecord;

#[derive(Debug, Clone)]
pub struct ProbeDescriptor {
    pub test_id: String,
    pub slice_class: SliceClass,
    pub duration: Duration,
    pub protocol: String,
    /// Common start epoch every agent aligns its probe to, so
    /// multi-site measurements land on overlapping windows.
    pub start_epoch: SystemTime,
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectivitySample {
    pub rtt_avg_ms: f64,
    pub loss_ratio: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BandwidthSnapshot {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("agent {agent_id} did not respond within {deadline_secs}s")]
    Deadline { agent_id: String, deadline_secs: u64 },
    #[error("agent {agent_id} returned an error: {message}")]
    AgentError { agent_id: String, message: String },
}

/// The HTTP surface a dispatch needs from an agent, abstracted so the
/// fan-out logic is testable without a live `mano-tn-agent` (`spec.md`
/// §9 expansion: the same fake-collaborator substitution the teacher
/// makes with its `local` deployer).
#[async_trait]
pub trait AgentProbe: Send + Sync {
    async fn connectivity(&self, agent: &AgentRecord, target_ip: &str) -> Result<ConnectivitySample, DispatchError>;
    async fn bandwidth_snapshot(&self, agent: &AgentRecord) -> Result<BandwidthSnapshot, DispatchError>;
}

#[derive(Debug, Clone)]
pub struct AgentProbeResult {
    pub agent_id: String,
    pub throughput_mbps: f64,
    pub rtt_avg_ms: f64,
    pub loss_ratio: f64,
}

#[derive(serde::Serialize)]
struct ConnectivityRequest<'a> {
    target_ip: &'a str,
    count: u32,
}

#[derive(serde::Deserialize)]
struct ConnectivityResponse {
    avg_ms: f64,
    loss_ratio: f64,
}

#[derive(serde::Deserialize)]
struct BandwidthResponse {
    rx_bytes: u64,
    tx_bytes: u64,
}

/// Drives the real `mano-tn-agent` HTTP surface: `POST /vxlan/connectivity`
/// for RTT and loss, `GET /bandwidth` for a byte-counter snapshot.
pub struct HttpAgentProbe {
    client: reqwest::Client,
    ping_count: u32,
}

impl HttpAgentProbe {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, ping_count: 4 }
    }
}

#[async_trait]
impl AgentProbe for HttpAgentProbe {
    async fn connectivity(&self, agent: &AgentRecord, target_ip: &str) -> Result<ConnectivitySample, DispatchError> {
        let url = agent.base_url.join("/vxlan/connectivity").map_err(|err| DispatchError::AgentError {
            agent_id: agent.id.clone(),
            message: err.to_string(),
        })?;
        let body = self
            .client
            .post(url)
            .json(&ConnectivityRequest { target_ip, count: self.ping_count })
            .send()
            .await
            .map_err(|err| DispatchError::AgentError { agent_id: agent.id.clone(), message: err.to_string() })?
            .error_for_status()
            .map_err(|err| DispatchError::AgentError { agent_id: agent.id.clone(), message: err.to_string() })?
            .json::<ConnectivityResponse>()
            .await
            .map_err(|err| DispatchError::AgentError { agent_id: agent.id.clone(), message: err.to_string() })?;
        Ok(ConnectivitySample { rtt_avg_ms: body.avg_ms, loss_ratio: body.loss_ratio })
    }

    async fn bandwidth_snapshot(&self, agent: &AgentRecord) -> Result<BandwidthSnapshot, DispatchError> {
        let url = agent.base_url.join("/bandwidth").map_err(|err| DispatchError::AgentError {
            agent_id: agent.id.clone(),
            message: err.to_string(),
        })?;
        let body = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| DispatchError::AgentError { agent_id: agent.id.clone(), message: err.to_string() })?
            .error_for_status()
            .map_err(|err| DispatchError::AgentError { agent_id: agent.id.clone(), message: err.to_string() })?
            .json::<BandwidthResponse>()
            .await
            .map_err(|err| DispatchError::AgentError { agent_id: agent.id.clone(), message: err.to_string() })?;
        Ok(BandwidthSnapshot { rx_bytes: body.rx_bytes, tx_bytes: body.tx_bytes })
    }
}

/// Broadcasts `descriptor` to every agent in `agents`, each probing
/// `targets[agent.id]`, and joins the results under `per_agent_deadline`
/// (`spec.md` §4.7.3 "fan-out/fan-in with a per-agent deadline").
pub async fn dispatch_test(
    agents: &[AgentRecord],
    targets: &HashMap<String, String>,
    descriptor: &ProbeDescriptor,
    probe: &dyn AgentProbe,
    per_agent_deadline: Duration,
) -> Vec<Result<AgentProbeResult, DispatchError>> {
    let futures = agents.iter().map(|agent| {
        let target_ip = targets.get(&agent.id).cloned().unwrap_or_default();
        run_one_agent(agent.clone(), target_ip, descriptor, probe, per_agent_deadline)
    });
    futures::future::join_all(futures).await
}

async fn run_one_agent(
    agent: AgentRecord,
    target_ip: String,
    descriptor: &ProbeDescriptor,
    probe: &dyn AgentProbe,
    per_agent_deadline: Duration,
) -> Result<AgentProbeResult, DispatchError> {
    let agent_id = agent.id.clone();
    let run = async {
        if let Ok(delay) = descriptor.start_epoch.duration_since(SystemTime::now()) {
            tokio::time::sleep(delay).await;
        }

        let before = probe.bandwidth_snapshot(&agent).await?;
        let connectivity = probe.connectivity(&agent, &target_ip).await?;
        tokio::time::sleep(descriptor.duration).await;
        let after = probe.bandwidth_snapshot(&agent).await?;

        let delta_bytes = after.tx_bytes.saturating_sub(before.tx_bytes) as f64;
        let secs = descriptor.duration.as_secs_f64();
        let throughput_mbps = if secs > 0.0 { delta_bytes * 8.0 / 1_000_000.0 / secs } else { 0.0 };

        Ok(AgentProbeResult {
            agent_id: agent.id.clone(),
            throughput_mbps,
            rtt_avg_ms: connectivity.rtt_avg_ms,
            loss_ratio: connectivity.loss_ratio,
        })
    };

    match tokio::time::timeout(per_agent_deadline, run).await {
        Ok(result) => result,
        Err(_) => Err(DispatchError::Deadline { agent_id, deadline_secs: per_agent_deadline.as_secs() }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::Url;

    use super::*;

    struct FakeProbe {
        tx_delta: u64,
        rtt_avg_ms: f64,
        fail_agent: Option<String>,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl AgentProbe for FakeProbe {
        async fn connectivity(&self, agent: &AgentRecord, _target_ip: &str) -> Result<ConnectivitySample, DispatchError> {
            if self.fail_agent.as_deref() == Some(agent.id.as_str()) {
                return Err(DispatchError::AgentError {
                    agent_id: agent.id.clone(),
                    message: "synthetic failure".to_owned(),
                });
            }
            Ok(ConnectivitySample { rtt_avg_ms: self.rtt_avg_ms, loss_ratio: 0.0 })
        }

        async fn bandwidth_snapshot(&self, _agent: &AgentRecord) -> Result<BandwidthSnapshot, DispatchError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            let tx_bytes = u64::from(*calls - 1) * self.tx_delta;
            Ok(BandwidthSnapshot { rx_bytes: 0, tx_bytes })
        }
    }

    fn agent(id: &str) -> AgentRecord {
        AgentRecord { id: id.to_owned(), base_url: Url::parse("http://127.0.0.1:9100").unwrap(), healthy: true }
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_computes_throughput_from_bandwidth_delta() {
        let probe = FakeProbe { tx_delta: 1_250_000, rtt_avg_ms: 1.0, fail_agent: None, calls: Mutex::new(0) };
        let descriptor = ProbeDescriptor {
            test_id: "t1".to_owned(),
            slice_class: SliceClass::Urllc,
            duration: Duration::from_secs(1),
            protocol: "udp".to_owned(),
            start_epoch: SystemTime::now(),
        };
        let targets = HashMap::from([("edge-1".to_owned(), "10.0.0.2".to_owned())]);
        let results = dispatch_test(&[agent("edge-1")], &targets, &descriptor, &probe, Duration::from_secs(5)).await;

        assert_eq!(results.len(), 1);
        let result = results[0].as_ref().unwrap();
        assert!((result.throughput_mbps - 10.0).abs() < 0.01);
        assert_eq!(result.rtt_avg_ms, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_reports_per_agent_failure_without_aborting_others() {
        let probe = FakeProbe {
            tx_delta: 1_000,
            rtt_avg_ms: 2.0,
            fail_agent: Some("edge-1".to_owned()),
            calls: Mutex::new(0),
        };
        let descriptor = ProbeDescriptor {
            test_id: "t2".to_owned(),
            slice_class: SliceClass::Embb,
            duration: Duration::from_millis(10),
            protocol: "tcp".to_owned(),
            start_epoch: SystemTime::now(),
        };
        let targets = HashMap::from([
            ("edge-1".to_owned(), "10.0.0.2".to_owned()),
            ("edge-2".to_owned(), "10.0.0.3".to_owned()),
        ]);
        let results =
            dispatch_test(&[agent("edge-1"), agent("edge-2")], &targets, &descriptor, &probe, Duration::from_secs(5))
                .await;

        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }
}
