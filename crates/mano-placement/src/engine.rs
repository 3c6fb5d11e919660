//! The filter → score → select → cache placement algorithm
//! (`spec.md` §4.3).

use std::time::{Duration, Instant};

use mano_config::PlacementWeights;
use mano_core::{
    ClusterRecord, EvaluatedSite, InventorySnapshot, MeasurementSample, PlacementPlan, PlanFingerprint,
    QosDescriptor, SelectionRationale, Severity, VnfPlacement,
};

use crate::{
    constraints::PlacementConstraints,
    error::PlacementError,
    requirements::{VnfRequirement, ran_and_cn_requirements, tn_for_sites},
    scoring::{passes_filter, score},
};

const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);
const DECISION_BUDGET: Duration = Duration::from_secs(2);
const MAX_SITES_EVALUATED: usize = 50;
const AMBIGUITY_MARGIN: f64 = 0.01;
const CACHE_CAPACITY: usize = 1024;
const CACHE_TTL: Duration = Duration::from_secs(30);

type CacheKey = (String, u64);

pub struct PlacementEngine {
    weights: PlacementWeights,
    cache: mano_core::cache::TtlLru<CacheKey, PlacementPlan>,
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new(PlacementWeights::default())
    }
}

impl PlacementEngine {
    #[must_use]
    pub fn new(weights: PlacementWeights) -> Self {
        Self {
            weights,
            cache: mano_core::cache::TtlLru::new(CACHE_CAPACITY, CACHE_TTL),
        }
    }

    /// Computes (or returns from cache) a placement plan for one slice
    /// intent. `snapshot_age` is how long ago `inventory` was captured;
    /// the caller (the orchestrator, which owns the inventory registry)
    /// tracks this rather than the engine holding a wall clock.
    pub fn place(
        &self,
        qos: &QosDescriptor,
        catalog_version: u32,
        inventory: &InventorySnapshot,
        snapshot_age: Duration,
        constraints: &PlacementConstraints,
        feedback: Option<&tokio::sync::mpsc::Sender<MeasurementSample>>,
    ) -> Result<PlacementPlan, PlacementError> {
        if snapshot_age > HEARTBEAT_TIMEOUT {
            return Err(PlacementError::InventoryStale {
                snapshot_version: inventory.version,
                age_secs: snapshot_age.as_secs(),
            });
        }

        let cache_key = (qos.fingerprint_input(), inventory.version);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        let started = Instant::now();
        let mut sites_evaluated = 0usize;

        let candidates: Vec<&ClusterRecord> = inventory
            .clusters
            .iter()
            .filter(|cluster| constraints.allows(cluster))
            .collect();

        let core_requirements = ran_and_cn_requirements(qos);
        let mut placements = Vec::with_capacity(core_requirements.len() + 2);
        let mut site_by_name = std::collections::HashMap::new();

        for requirement in &core_requirements {
            let placement = self.select_site(&candidates, requirement, qos, &mut sites_evaluated)?;
            site_by_name.insert(requirement.name.clone(), placement.cluster_id.clone());
            placements.push(placement);
        }

        let ran_site = site_by_name.get("ran").cloned().unwrap_or_default();
        let cn_site = site_by_name.get("cn").cloned().unwrap_or_default();

        for requirement in tn_for_sites(&ran_site, &cn_site) {
            let forced_site = if requirement.depends_on.contains(&"ran".to_owned()) {
                &ran_site
            } else {
                &cn_site
            };
            let placement = self.force_site(&candidates, &requirement, forced_site)?;
            placements.push(placement);
        }

        let fingerprint =
            PlanFingerprint::compute(&qos.fingerprint_input(), catalog_version, inventory.version);
        let plan = PlacementPlan { fingerprint, placements };

        self.cache.put(cache_key, plan.clone());

        let decision_time = started.elapsed();
        if let Some(sender) = feedback {
            if sites_evaluated > MAX_SITES_EVALUATED || decision_time > DECISION_BUDGET {
                emit_feedback(sender, sites_evaluated, decision_time);
            }
        }

        Ok(plan)
    }

    fn select_site(
        &self,
        candidates: &[&ClusterRecord],
        requirement: &VnfRequirement,
        qos: &QosDescriptor,
        sites_evaluated: &mut usize,
    ) -> Result<VnfPlacement, PlacementError> {
        let mut evaluated: Vec<EvaluatedSite> = candidates
            .iter()
            .filter(|cluster| passes_filter(cluster, requirement.kind, &requirement.resources))
            .map(|cluster| EvaluatedSite {
                cluster_id: cluster.id.clone(),
                score: score(cluster, qos, &requirement.resources, &self.weights),
            })
            .collect();

        *sites_evaluated += evaluated.len();

        if evaluated.is_empty() {
            return Err(PlacementError::NoViableSite {
                vnf_name: requirement.name.clone(),
                vnf_kind: requirement.kind,
            });
        }

        evaluated.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cluster_id.cmp(&b.cluster_id))
        });

        if evaluated.len() > 1 {
            let gap = (evaluated[0].score - evaluated[1].score).abs();
            if gap > 0.0 && gap < AMBIGUITY_MARGIN {
                return Err(PlacementError::AmbiguousSelection {
                    vnf_name: requirement.name.clone(),
                    cluster_a: evaluated[0].cluster_id.clone(),
                    cluster_b: evaluated[1].cluster_id.clone(),
                    score_a: evaluated[0].score,
                    score_b: evaluated[1].score,
                });
            }
        }

        let selected = evaluated[0].clone();
        let placement = VnfPlacement {
            name: requirement.name.clone(),
            kind: requirement.kind,
            cluster_id: selected.cluster_id.clone(),
            resources: requirement.resources,
            depends_on: requirement.depends_on.clone(),
            rationale: SelectionRationale {
                evaluated_sites: evaluated.clone(),
                selected_score: selected.score,
            },
        };

        Ok(placement)
    }

    fn force_site(
        &self,
        candidates: &[&ClusterRecord],
        requirement: &VnfRequirement,
        site: &str,
    ) -> Result<VnfPlacement, PlacementError> {
        let cluster = candidates
            .iter()
            .find(|cluster| cluster.id == site)
            .ok_or_else(|| PlacementError::NoViableSite {
                vnf_name: requirement.name.clone(),
                vnf_kind: requirement.kind,
            })?;

        if !passes_filter(cluster, requirement.kind, &requirement.resources) {
            return Err(PlacementError::NoViableSite {
                vnf_name: requirement.name.clone(),
                vnf_kind: requirement.kind,
            });
        }

        Ok(VnfPlacement {
            name: requirement.name.clone(),
            kind: requirement.kind,
            cluster_id: cluster.id.clone(),
            resources: requirement.resources,
            depends_on: requirement.depends_on.clone(),
            rationale: SelectionRationale {
                evaluated_sites: vec![EvaluatedSite {
                    cluster_id: cluster.id.clone(),
                    score: 0.0,
                }],
                selected_score: 0.0,
            },
        })
    }
}

fn emit_feedback(
    sender: &tokio::sync::mpsc::Sender<MeasurementSample>,
    sites_evaluated: usize,
    decision_time: Duration,
) {
    let labels = std::collections::HashMap::new();
    let _ = sender.try_send(MeasurementSample {
        timestamp: std::time::SystemTime::now(),
        component: "placement-engine".to_owned(),
        metric: "sites_evaluated".to_owned(),
        value: sites_evaluated as f64,
        labels: labels.clone(),
        severity: Severity::Low,
    });
    let _ = sender.try_send(MeasurementSample {
        timestamp: std::time::SystemTime::now(),
        component: "placement-engine".to_owned(),
        metric: "decision_time_ms".to_owned(),
        value: decision_time.as_millis() as f64,
        labels,
        severity: Severity::Low,
    });
}
