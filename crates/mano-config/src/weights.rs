//! Placement scoring weights (`spec.md` §4.3 step 2): configuration, not
//! a hard-coded formula, so operators can retune the placement engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementWeights {
    pub latency_fit: f64,
    pub throughput_headroom: f64,
    pub utilisation_distance: f64,
    pub class_affinity: f64,
}

impl Default for PlacementWeights {
    fn default() -> Self {
        Self {
            latency_fit: 0.4,
            throughput_headroom: 0.25,
            utilisation_distance: 0.2,
            class_affinity: 0.15,
        }
    }
}

/// The utilisation target the placement engine scores distance from
/// (`spec.md` §4.3 step 2: "utilisation distance from a 70% target").
pub const UTILISATION_TARGET_PCT: f64 = 70.0;
