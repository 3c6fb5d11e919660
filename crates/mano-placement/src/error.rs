//! Failure kinds for the placement engine (`spec.md` §4.3).

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum PlacementError {
    #[error("no cluster passes the capability/capacity filter for VNF '{vnf_name}' ({vnf_kind:?})")]
    NoViableSite {
        vnf_name: String,
        vnf_kind: mano_core::VnfKind,
    },
    #[error(
        "ambiguous selection for VNF '{vnf_name}': '{cluster_a}' and '{cluster_b}' scored within \
         0.01 of each other ({score_a} vs {score_b})"
    )]
    AmbiguousSelection {
        vnf_name: String,
        cluster_a: String,
        cluster_b: String,
        score_a: f64,
        score_b: f64,
    },
    #[error("inventory snapshot (version {snapshot_version}) is stale, age {age_secs}s exceeds the heartbeat timeout")]
    InventoryStale { snapshot_version: u64, age_secs: u64 },
}
