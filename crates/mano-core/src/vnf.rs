//! Placement plans: the output of the placement engine and the input to
//! the deployment orchestrator (`spec.md` §3, "Placement plan").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VnfKind {
    Ran,
    Cn,
    Tn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceEnvelope {
    pub cpu_cores: f64,
    pub memory_gib: f64,
    pub gpu: bool,
    pub sr_iov: bool,
}

impl ResourceEnvelope {
    /// The 1.2x safety factor the placement filter requires
    /// (`spec.md` §4.3 step 1).
    #[must_use]
    pub fn with_safety_factor(self) -> Self {
        const SAFETY_FACTOR: f64 = 1.2;
        Self {
            cpu_cores: self.cpu_cores * SAFETY_FACTOR,
            memory_gib: self.memory_gib * SAFETY_FACTOR,
            gpu: self.gpu,
            sr_iov: self.sr_iov,
        }
    }
}

/// One evaluated candidate site, kept for plan auditability
/// (`spec.md` §4.3 step 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedSite {
    pub cluster_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRationale {
    pub evaluated_sites: Vec<EvaluatedSite>,
    pub selected_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VnfPlacement {
    pub name: String,
    pub kind: VnfKind,
    pub cluster_id: String,
    pub resources: ResourceEnvelope,
    /// Names of placements in the same plan that must be Ready first.
    pub depends_on: Vec<String>,
    pub rationale: SelectionRationale,
}

/// Fingerprint over `(QoS, catalog version, cluster inventory snapshot)`
/// (`spec.md` §3, "Placement plan").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanFingerprint(pub [u8; 32]);

impl PlanFingerprint {
    #[must_use]
    pub fn compute(qos_fingerprint: &str, catalog_version: u32, inventory_version: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(qos_fingerprint.as_bytes());
        hasher.update(catalog_version.to_le_bytes());
        hasher.update(inventory_version.to_le_bytes());
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for PlanFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementPlan {
    pub fingerprint: PlanFingerprint,
    pub placements: Vec<VnfPlacement>,
}

impl PlacementPlan {
    /// Topologically orders placements by their `depends_on` edges
    /// (`spec.md` §4.3, "the generator orders the plan topologically").
    pub fn topological_order(&self) -> Result<Vec<&VnfPlacement>, PlanOrderError> {
        let mut remaining: Vec<&VnfPlacement> = self.placements.iter().collect();
        let mut ready_names = std::collections::HashSet::new();
        let mut ordered = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|placement| {
                if placement
                    .depends_on
                    .iter()
                    .all(|dep| ready_names.contains(dep))
                {
                    ready_names.insert(placement.name.clone());
                    ordered.push(*placement);
                    false
                } else {
                    true
                }
            });
            if remaining.len() == before {
                return Err(PlanOrderError::Cyclic {
                    remaining: remaining.iter().map(|p| p.name.clone()).collect(),
                });
            }
        }
        Ok(ordered)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PlanOrderError {
    #[error("dependency cycle detected among placements: {remaining:?}")]
    Cyclic { remaining: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(name: &str, deps: &[&str]) -> VnfPlacement {
        VnfPlacement {
            name: name.to_owned(),
            kind: VnfKind::Ran,
            cluster_id: "edge-1".to_owned(),
            resources: ResourceEnvelope::default(),
            depends_on: deps.iter().map(|s| (*s).to_owned()).collect(),
            rationale: SelectionRationale {
                evaluated_sites: vec![],
                selected_score: 0.0,
            },
        }
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let plan = PlacementPlan {
            fingerprint: PlanFingerprint([0; 32]),
            placements: vec![placement("cn", &["ran"]), placement("ran", &[])],
        };
        let order: Vec<&str> = plan
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(order, vec!["ran", "cn"]);
    }

    #[test]
    fn detects_cycles() {
        let plan = PlacementPlan {
            fingerprint: PlanFingerprint([0; 32]),
            placements: vec![placement("a", &["b"]), placement("b", &["a"])],
        };
        assert!(plan.topological_order().is_err());
    }
}
