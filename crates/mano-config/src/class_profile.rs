//! Default QoS envelopes per slice class (`spec.md` §4.2).

use std::time::Duration;

/// Fields a class falls back to when the intent compiler finds no
/// source span for them in the input text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProfile {
    pub bandwidth_mbps: f64,
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub loss_ratio: f64,
    /// `None` means the class does not mandate a reliability floor.
    pub reliability: Option<f64>,
}

pub const EMBB: ClassProfile = ClassProfile {
    bandwidth_mbps: 100.0,
    latency_ms: 20.0,
    jitter_ms: 5.0,
    loss_ratio: 0.001,
    reliability: None,
};

pub const URLLC: ClassProfile = ClassProfile {
    bandwidth_mbps: 10.0,
    latency_ms: 1.0,
    jitter_ms: 0.5,
    loss_ratio: 0.0001,
    reliability: Some(0.99999),
};

pub const MMTC: ClassProfile = ClassProfile {
    bandwidth_mbps: 1.0,
    latency_ms: 100.0,
    jitter_ms: 10.0,
    loss_ratio: 0.01,
    reliability: None,
};

/// Not named by the class-profile table in `spec.md`; `balanced` sits
/// between eMBB and mMTC and carries no reliability floor.
pub const BALANCED: ClassProfile = ClassProfile {
    bandwidth_mbps: 20.0,
    latency_ms: 50.0,
    jitter_ms: 5.0,
    loss_ratio: 0.005,
    reliability: None,
};

/// Returns the default envelope a class falls back to.
#[must_use]
pub const fn profile_for(class: mano_core::SliceClass) -> ClassProfile {
    match class {
        mano_core::SliceClass::Embb => EMBB,
        mano_core::SliceClass::Urllc => URLLC,
        mano_core::SliceClass::Mmtc => MMTC,
        mano_core::SliceClass::Balanced => BALANCED,
    }
}

/// Per-class deployment-time SLO (`spec.md` §4.4 step 2, §9 Open Question 3).
#[must_use]
pub const fn deployment_timeout(class: mano_core::SliceClass) -> Duration {
    match class {
        mano_core::SliceClass::Urllc => Duration::from_secs(2 * 60),
        mano_core::SliceClass::Embb => Duration::from_secs(5 * 60),
        mano_core::SliceClass::Mmtc => Duration::from_secs(8 * 60),
        mano_core::SliceClass::Balanced => Duration::from_secs(5 * 60),
    }
}
