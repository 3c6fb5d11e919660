//! Instructs each site's TN agent to bring up the inter-site overlay and
//! shaping for a slice (`spec.md` §4.4 step 3).

use std::net::Ipv4Addr;

use async_trait::async_trait;
use mano_core::{ClusterRecord, QosDescriptor, SliceId, Vni};
use serde::Serialize;

const MAX_VNI: u32 = 16_777_215;

/// Derives a stable per-slice VNI from the slice id so every TN
/// placement for the same slice agrees on the tunnel's VNI across a
/// reconcile restart, without persisting a separate allocation
/// (`spec.md` §6, "VNI 1-16777215").
#[must_use]
pub fn vni_for_slice(slice_id: SliceId) -> Vni {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(slice_id.to_string().as_bytes());
    let raw = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let value = 1 + (raw % MAX_VNI);
    Vni::new(value).unwrap_or_else(|_| Vni::new(1).expect("1 is within range"))
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TnActivationError {
    #[error("cluster '{cluster_id}' has no registered TN agent")]
    NoAgent { cluster_id: String },
    #[error("TN agent at '{base_url}' rejected the request: {message}")]
    Rejected { base_url: String, message: String },
    #[error("TN agent at '{base_url}' did not respond: {message}")]
    Unreachable { base_url: String, message: String },
}

/// Brings up the overlay tunnel and shaping for one TN placement's site,
/// pointed at its peers' underlay IPs.
#[async_trait]
pub trait TnActivator: Send + Sync {
    async fn activate(
        &self,
        site: &ClusterRecord,
        slice_id: SliceId,
        vni: Vni,
        remote_underlay_ips: Vec<Ipv4Addr>,
        descriptor: &QosDescriptor,
    ) -> Result<(), TnActivationError>;

    async fn deactivate(&self, site: &ClusterRecord, slice_id: SliceId) -> Result<(), TnActivationError>;
}

#[derive(Debug, Serialize)]
struct CreateSliceRequest<'a> {
    vni: u32,
    remote_underlay_ips: Vec<Ipv4Addr>,
    class: mano_core::SliceClass,
    bandwidth_mbps: f64,
    latency_ms: f64,
    jitter_ms: f64,
    loss_ratio: f64,
    reliability: Option<f64>,
    priority: u8,
    traffic_class: &'a str,
}

pub struct HttpTnActivator {
    client: reqwest::Client,
}

impl HttpTnActivator {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TnActivator for HttpTnActivator {
    async fn activate(
        &self,
        site: &ClusterRecord,
        slice_id: SliceId,
        vni: Vni,
        remote_underlay_ips: Vec<Ipv4Addr>,
        descriptor: &QosDescriptor,
    ) -> Result<(), TnActivationError> {
        let base_url = site.tn_agent_base_url.clone().ok_or_else(|| TnActivationError::NoAgent {
            cluster_id: site.id.clone(),
        })?;
        let url = format!("{base_url}/slices/{slice_id}");
        let body = CreateSliceRequest {
            vni: vni.get(),
            remote_underlay_ips,
            class: descriptor.class,
            bandwidth_mbps: descriptor.bandwidth_mbps,
            latency_ms: descriptor.latency_ms,
            jitter_ms: descriptor.jitter_ms,
            loss_ratio: descriptor.loss_ratio,
            reliability: descriptor.reliability,
            priority: descriptor.priority,
            traffic_class: &descriptor.traffic_class,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| TnActivationError::Unreachable { base_url: base_url.clone(), message: err.to_string() })?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TnActivationError::Rejected { base_url, message });
        }
        Ok(())
    }

    async fn deactivate(&self, site: &ClusterRecord, slice_id: SliceId) -> Result<(), TnActivationError> {
        let Some(base_url) = site.tn_agent_base_url.clone() else {
            return Ok(());
        };
        let url = format!("{base_url}/slices/{slice_id}");
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|err| TnActivationError::Unreachable { base_url: base_url.clone(), message: err.to_string() })?;
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TnActivationError::Rejected { base_url, message });
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::Mutex;

    use super::{Ipv4Addr, QosDescriptor, SliceId, TnActivationError, TnActivator, Vni};
    use async_trait::async_trait;
    use mano_core::ClusterRecord;

    #[derive(Default)]
    pub struct FakeTnActivator {
        pub activations: Mutex<Vec<(String, SliceId)>>,
        pub fail_site: Option<String>,
    }

    #[async_trait]
    impl TnActivator for FakeTnActivator {
        async fn activate(
            &self,
            site: &ClusterRecord,
            slice_id: SliceId,
            _vni: Vni,
            _remote_underlay_ips: Vec<Ipv4Addr>,
            _descriptor: &QosDescriptor,
        ) -> Result<(), TnActivationError> {
            if self.fail_site.as_deref() == Some(site.id.as_str()) {
                return Err(TnActivationError::Rejected {
                    base_url: site.id.clone(),
                    message: "synthetic failure".to_owned(),
                });
            }
            self.activations.lock().unwrap_or_else(|e| e.into_inner()).push((site.id.clone(), slice_id));
            Ok(())
        }

        async fn deactivate(&self, _site: &ClusterRecord, _slice_id: SliceId) -> Result<(), TnActivationError> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vni_for_slice_is_deterministic_and_in_range() {
        let slice_id = SliceId::new();
        let first = vni_for_slice(slice_id);
        let second = vni_for_slice(slice_id);
        assert_eq!(first, second);
        assert!(first.get() >= 1 && first.get() <= MAX_VNI);
    }

    #[test]
    fn distinct_slices_usually_get_distinct_vnis() {
        let a = vni_for_slice(SliceId::new());
        let b = vni_for_slice(SliceId::new());
        assert_ne!(a, b);
    }
}
