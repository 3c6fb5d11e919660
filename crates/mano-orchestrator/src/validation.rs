//! Validation probe: dispatches a short synchronised test through the
//! TN manager and checks the measured QoS against the descriptor's
//! targets (`spec.md` §4.4 step 4).

use std::collections::HashMap;

use async_trait::async_trait;
use mano_core::{MeasuredQos, QosDescriptor, SliceId};
use serde::{Deserialize, Serialize};

const PROBE_DURATION_SECS: u64 = 5;
const PROBE_DEADLINE_SECS: u64 = 10;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("TN manager at '{base_url}' rejected the probe request: {message}")]
    Rejected { base_url: String, message: String },
    #[error("TN manager at '{base_url}' did not respond: {message}")]
    Unreachable { base_url: String, message: String },
    #[error("probe returned no samples")]
    NoSamples,
}

/// Required margin on top of the descriptor's target values
/// (`spec.md` §4.4 step 4: "BW >= target*0.9, RTT <= target*1.1, loss <= 1%").
#[must_use]
pub fn satisfies_descriptor(qos: &QosDescriptor, measured: &MeasuredQos) -> bool {
    measured.throughput_mbps >= qos.bandwidth_mbps * 0.9
        && measured.rtt_ms <= qos.latency_ms * 1.1
        && measured.loss_ratio <= 0.01
}

#[async_trait]
pub trait ValidationProbe: Send + Sync {
    async fn measure(
        &self,
        slice_id: SliceId,
        qos: &QosDescriptor,
        targets: HashMap<String, String>,
    ) -> Result<MeasuredQos, ValidationError>;
}

#[derive(Debug, Serialize)]
struct RunTestRequest {
    test_id: String,
    slice_class: mano_core::SliceClass,
    duration_secs: u64,
    protocol: &'static str,
    targets: HashMap<String, String>,
    deadline_secs: u64,
}

#[derive(Debug, Deserialize)]
struct Distribution {
    mean: f64,
}

#[derive(Debug, Deserialize)]
struct ClassMetrics {
    throughput_mbps: Distribution,
    rtt_ms: Distribution,
    loss_ratio: Distribution,
    sample_count: usize,
}

#[derive(Debug, Deserialize)]
struct ThesisReport {
    metrics: ClassMetrics,
}

pub struct HttpValidationProbe {
    client: reqwest::Client,
    tn_manager_base_url: String,
}

impl HttpValidationProbe {
    #[must_use]
    pub fn new(client: reqwest::Client, tn_manager_base_url: String) -> Self {
        Self { client, tn_manager_base_url }
    }
}

#[async_trait]
impl ValidationProbe for HttpValidationProbe {
    async fn measure(
        &self,
        slice_id: SliceId,
        qos: &QosDescriptor,
        targets: HashMap<String, String>,
    ) -> Result<MeasuredQos, ValidationError> {
        let url = format!("{}/tests", self.tn_manager_base_url);
        let body = RunTestRequest {
            test_id: format!("validation-{slice_id}"),
            slice_class: qos.class,
            duration_secs: PROBE_DURATION_SECS,
            protocol: "udp",
            targets,
            deadline_secs: PROBE_DEADLINE_SECS,
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|err| {
            ValidationError::Unreachable { base_url: self.tn_manager_base_url.clone(), message: err.to_string() }
        })?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ValidationError::Rejected { base_url: self.tn_manager_base_url.clone(), message });
        }

        let report: ThesisReport = response.json().await.map_err(|err| ValidationError::Rejected {
            base_url: self.tn_manager_base_url.clone(),
            message: err.to_string(),
        })?;

        if report.metrics.sample_count == 0 {
            return Err(ValidationError::NoSamples);
        }

        Ok(MeasuredQos {
            throughput_mbps: report.metrics.throughput_mbps.mean,
            rtt_ms: report.metrics.rtt_ms.mean,
            loss_ratio: report.metrics.loss_ratio.mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qos() -> QosDescriptor {
        QosDescriptor::new(mano_core::SliceClass::Embb, 100.0, 20.0, 5.0, 0.001, None, 5, "video".to_owned()).unwrap()
    }

    #[test]
    fn satisfies_descriptor_enforces_all_three_margins() {
        let target = qos();
        let good = MeasuredQos { throughput_mbps: 95.0, rtt_ms: 21.0, loss_ratio: 0.005 };
        assert!(satisfies_descriptor(&target, &good));

        let low_throughput = MeasuredQos { throughput_mbps: 80.0, rtt_ms: 21.0, loss_ratio: 0.005 };
        assert!(!satisfies_descriptor(&target, &low_throughput));

        let high_rtt = MeasuredQos { throughput_mbps: 95.0, rtt_ms: 30.0, loss_ratio: 0.005 };
        assert!(!satisfies_descriptor(&target, &high_rtt));

        let high_loss = MeasuredQos { throughput_mbps: 95.0, rtt_ms: 21.0, loss_ratio: 0.02 };
        assert!(!satisfies_descriptor(&target, &high_loss));
    }
}
