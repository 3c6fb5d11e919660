//! The QoS descriptor: the immutable contract a slice is held to
//! (`spec.md` §3, "QoS descriptor").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceClass {
    Embb,
    Urllc,
    Mmtc,
    Balanced,
}

impl SliceClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Embb => "eMBB",
            Self::Urllc => "uRLLC",
            Self::Mmtc => "mMTC",
            Self::Balanced => "balanced",
        }
    }

    /// uRLLC prefers edge, eMBB prefers regional (`spec.md` §4.3 step 2).
    #[must_use]
    pub const fn preferred_cluster_class(self) -> Option<crate::ClusterClass> {
        match self {
            Self::Urllc => Some(crate::ClusterClass::Edge),
            Self::Embb => Some(crate::ClusterClass::Regional),
            Self::Mmtc | Self::Balanced => None,
        }
    }
}

/// Closed, validated QoS contract. Constructed only through
/// [`QosDescriptor::new`] so the class/numeric-envelope invariant in
/// `spec.md` §3 cannot be bypassed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QosDescriptor {
    pub class: SliceClass,
    pub bandwidth_mbps: f64,
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub loss_ratio: f64,
    pub reliability: Option<f64>,
    pub priority: u8,
    pub traffic_class: String,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum QosError {
    #[error("bandwidth must be >= 0 and <= 1e5 Mbps, got {0}")]
    BandwidthOutOfRange(f64),
    #[error("latency must be >= 0 and <= 1e4 ms, got {0}")]
    LatencyOutOfRange(f64),
    #[error("jitter must be >= 0, got {0}")]
    JitterOutOfRange(f64),
    #[error("loss ratio must be within 0..=1, got {0}")]
    LossOutOfRange(f64),
    #[error("reliability must be within 0..=1, got {0}")]
    ReliabilityOutOfRange(f64),
    #[error("priority must be within 1..=9, got {0}")]
    PriorityOutOfRange(u8),
}

impl QosDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        class: SliceClass,
        bandwidth_mbps: f64,
        latency_ms: f64,
        jitter_ms: f64,
        loss_ratio: f64,
        reliability: Option<f64>,
        priority: u8,
        traffic_class: String,
    ) -> Result<Self, QosError> {
        if !(0.0..=1e5).contains(&bandwidth_mbps) {
            return Err(QosError::BandwidthOutOfRange(bandwidth_mbps));
        }
        if !(0.0..=1e4).contains(&latency_ms) {
            return Err(QosError::LatencyOutOfRange(latency_ms));
        }
        if jitter_ms < 0.0 {
            return Err(QosError::JitterOutOfRange(jitter_ms));
        }
        if !(0.0..=1.0).contains(&loss_ratio) {
            return Err(QosError::LossOutOfRange(loss_ratio));
        }
        if let Some(r) = reliability {
            if !(0.0..=1.0).contains(&r) {
                return Err(QosError::ReliabilityOutOfRange(r));
            }
        }
        if !(1..=9).contains(&priority) {
            return Err(QosError::PriorityOutOfRange(priority));
        }
        Ok(Self {
            class,
            bandwidth_mbps,
            latency_ms,
            jitter_ms,
            loss_ratio,
            reliability,
            priority,
            traffic_class,
        })
    }

    /// `true` when the descriptor describes a flagged degenerate slice
    /// (bandwidth = 0 is accepted but notable, `spec.md` §8 boundary
    /// behaviour).
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.bandwidth_mbps == 0.0
    }

    /// Stable fingerprint used to key the placement cache
    /// (`spec.md` §4.3 step 4). Two descriptors that are `==` always
    /// fingerprint identically.
    #[must_use]
    pub fn fingerprint_input(&self) -> String {
        format!(
            "{}|{:.6}|{:.6}|{:.6}|{:.6}|{:?}|{}|{}",
            self.class.as_str(),
            self.bandwidth_mbps,
            self.latency_ms,
            self.jitter_ms,
            self.loss_ratio,
            self.reliability,
            self.priority,
            self.traffic_class
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_bandwidth() {
        let err = QosDescriptor::new(
            SliceClass::Embb,
            -1.0,
            20.0,
            5.0,
            0.001,
            None,
            5,
            "video".to_owned(),
        )
        .unwrap_err();
        assert_eq!(err, QosError::BandwidthOutOfRange(-1.0));
    }

    #[test]
    fn accepts_zero_bandwidth_as_degenerate() {
        let descriptor = QosDescriptor::new(
            SliceClass::Balanced,
            0.0,
            50.0,
            5.0,
            0.0,
            None,
            5,
            "default".to_owned(),
        )
        .unwrap();
        assert!(descriptor.is_degenerate());
    }
}
