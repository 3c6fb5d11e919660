//! Candidate scoring (`spec.md` §4.3 step 2).

use mano_config::{PlacementWeights, UTILISATION_TARGET_PCT};
use mano_core::{ClusterClass, ClusterRecord, QosDescriptor, ResourceEnvelope};

/// Declared one-way latency budget attributable to a cluster's tier.
/// Edge is closest to the radio, central is furthest; this is the
/// proxy the scorer uses for "latency fit" since the inventory model
/// does not carry a measured per-site latency.
fn tier_latency_ms(class: ClusterClass) -> f64 {
    match class {
        ClusterClass::Edge => 2.0,
        ClusterClass::Regional => 10.0,
        ClusterClass::Central => 30.0,
    }
}

/// Passes the filter stage: capability match plus capacity headroom at
/// the 1.2x safety factor (`spec.md` §4.3 step 1).
#[must_use]
pub fn passes_filter(cluster: &ClusterRecord, kind: mano_core::VnfKind, resources: &ResourceEnvelope) -> bool {
    if !cluster.capabilities.supports_vnf(kind) {
        return false;
    }
    let required = resources.with_safety_factor();
    cluster.capacity.cpu_cores_free >= required.cpu_cores
        && cluster.capacity.memory_gib_free >= required.memory_gib
}

/// Weighted sum score (`spec.md` §4.3 step 2): latency fit, throughput
/// headroom, utilisation distance from the 70% target, class affinity.
#[must_use]
pub fn score(
    cluster: &ClusterRecord,
    qos: &QosDescriptor,
    resources: &ResourceEnvelope,
    weights: &PlacementWeights,
) -> f64 {
    let latency_gap = (tier_latency_ms(cluster.class) - qos.latency_ms).abs();
    let latency_fit = -(latency_gap / qos.latency_ms.max(1.0));

    let headroom = if cluster.capacity.cpu_cores_free > 0.0 {
        ((cluster.capacity.cpu_cores_free - resources.cpu_cores) / cluster.capacity.cpu_cores_free)
            .clamp(-1.0, 1.0)
    } else {
        -1.0
    };

    let utilisation_distance =
        -((cluster.capacity.utilisation_pct - UTILISATION_TARGET_PCT).abs() / 100.0);

    let affinity = if qos.class.preferred_cluster_class() == Some(cluster.class) {
        1.0
    } else {
        0.0
    };

    weights.latency_fit * latency_fit
        + weights.throughput_headroom * headroom
        + weights.utilisation_distance * utilisation_distance
        + weights.class_affinity * affinity
}
