//! Aggregates per-site probe results into the per-class throughput/RTT
//! distributions and deployment timing a thesis-style report needs
//! (`spec.md` §4.7.3).

use std::collections::HashMap;

use serde::Serialize;

use crate::dispatch::AgentProbeResult;

#[derive(Debug, Clone, Serialize)]
pub struct Distribution {
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[must_use]
pub fn distribution(values: &[f64]) -> Distribution {
    if values.is_empty() {
        return Distribution { mean: 0.0, p50: 0.0, p95: 0.0, p99: 0.0 };
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    Distribution { mean, p50: percentile(&sorted, 0.50), p95: percentile(&sorted, 0.95), p99: percentile(&sorted, 0.99) }
}

fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * pct).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub throughput_mbps: Distribution,
    pub rtt_ms: Distribution,
    pub loss_ratio: Distribution,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThesisReport {
    pub test_id: String,
    pub slice_class: String,
    pub metrics: ClassMetrics,
    pub deployment_timing_ms: HashMap<String, f64>,
    pub agent_count: usize,
    pub failed_agents: Vec<String>,
}

/// Builds a report from dispatch outcomes; agents whose probe errored
/// are recorded in `failed_agents` but never poison the distributions
/// computed from the agents that succeeded.
#[must_use]
pub fn aggregate(
    test_id: &str,
    slice_class: &str,
    results: &[(String, Result<AgentProbeResult, crate::dispatch::DispatchError>)],
    deployment_timing_ms: HashMap<String, f64>,
) -> ThesisReport {
    let mut throughputs = Vec::new();
    let mut rtts = Vec::new();
    let mut losses = Vec::new();
    let mut failed_agents = Vec::new();

    for (agent_id, outcome) in results {
        match outcome {
            Ok(result) => {
                throughputs.push(result.throughput_mbps);
                rtts.push(result.rtt_avg_ms);
                losses.push(result.loss_ratio);
            }
            Err(_) => failed_agents.push(agent_id.clone()),
        }
    }

    ThesisReport {
        test_id: test_id.to_owned(),
        slice_class: slice_class.to_owned(),
        metrics: ClassMetrics {
            throughput_mbps: distribution(&throughputs),
            rtt_ms: distribution(&rtts),
            loss_ratio: distribution(&losses),
            sample_count: throughputs.len(),
        },
        deployment_timing_ms,
        agent_count: results.len(),
        failed_agents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_of_empty_slice_is_all_zero() {
        let d = distribution(&[]);
        assert_eq!(d.mean, 0.0);
        assert_eq!(d.p99, 0.0);
    }

    #[test]
    fn percentiles_track_sorted_order() {
        let d = distribution(&[10.0, 30.0, 20.0, 40.0, 50.0]);
        assert_eq!(d.p50, 30.0);
        assert_eq!(d.p99, 50.0);
    }

    #[test]
    fn aggregate_separates_failed_agents_from_distribution() {
        let ok = AgentProbeResult { agent_id: "edge-1".to_owned(), throughput_mbps: 100.0, rtt_avg_ms: 5.0, loss_ratio: 0.0 };
        let err = crate::dispatch::DispatchError::Deadline { agent_id: "edge-2".to_owned(), deadline_secs: 5 };
        let results = vec![("edge-1".to_owned(), Ok(ok)), ("edge-2".to_owned(), Err(err))];

        let report = aggregate("t1", "embb", &results, HashMap::new());
        assert_eq!(report.metrics.sample_count, 1);
        assert_eq!(report.failed_agents, vec!["edge-2".to_owned()]);
        assert_eq!(report.agent_count, 2);
    }
}
