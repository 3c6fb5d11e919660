//! Per-interface HTB/netem traffic-control policy records, owned
//! exclusively by the TC manager on the same agent as the VXLAN it shapes
//! (`spec.md` §3, "TC policy record").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HtbClass {
    pub rate_kbit: u64,
    pub ceil_kbit: u64,
    pub burst_bytes: u64,
    pub priority: u8,
}

impl HtbClass {
    /// `rate = downlinkMbps x 1024 Kbit/s`, `ceil` equal to `rate`, burst
    /// proportional (`spec.md` §4.7.1).
    #[must_use]
    pub fn from_downlink_mbps(downlink_mbps: f64, priority: u8) -> Self {
        let rate_kbit = (downlink_mbps * 1024.0).round() as u64;
        Self {
            rate_kbit,
            ceil_kbit: rate_kbit,
            burst_bytes: rate_kbit * 125, // ~1/8 second of buffering, in bytes
            priority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NetemParams {
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub loss_ratio: f64,
}

impl NetemParams {
    #[must_use]
    pub fn is_noop(self) -> bool {
        self.latency_ms == 0.0 && self.jitter_ms == 0.0 && self.loss_ratio == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMatch {
    pub src_cidr: String,
    pub dst_cidr: String,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierFilter {
    pub flow: FlowMatch,
    pub flow_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcPolicyRecord {
    pub interface: String,
    pub slice_id: crate::SliceId,
    pub class: HtbClass,
    pub netem: Option<NetemParams>,
    pub filters: Vec<ClassifierFilter>,
}

impl TcPolicyRecord {
    #[must_use]
    pub fn new(interface: String, slice_id: crate::SliceId, descriptor: &crate::QosDescriptor) -> Self {
        let class = HtbClass::from_downlink_mbps(descriptor.bandwidth_mbps, descriptor.priority);
        let netem_params = NetemParams {
            latency_ms: descriptor.latency_ms,
            jitter_ms: descriptor.jitter_ms,
            loss_ratio: descriptor.loss_ratio,
        };
        let netem = (!netem_params.is_noop()).then_some(netem_params);
        Self {
            interface,
            slice_id,
            class,
            netem,
            filters: Vec::new(),
        }
    }
}
