//! Translates a placement plan into per-cluster package sets
//! (`spec.md` §4.5).

use std::collections::HashMap;

use mano_core::{PlacementPlan, SliceId, VnfKind, VnfPlacement};

use crate::{
    error::GitopsError,
    package::{
        ConfigPackage, ContainerSpec, NetworkPolicy, PackageSet, ResourceSpec, SecurityContext,
        ServicePackage, ServicePort,
    },
};

/// Digest-pinned image per VNF kind. In a real deployment this comes
/// from an operator-maintained catalog; kept as a simple map here since
/// the catalog format itself is outside this spec's scope.
#[derive(Debug, Clone)]
pub struct ImageCatalog(HashMap<VnfKind, String>);

impl Default for ImageCatalog {
    fn default() -> Self {
        Self(HashMap::from([
            (
                VnfKind::Ran,
                "registry.internal/mano/ran@sha256:0000000000000000000000000000000000000000000000000000000000000000".to_owned(),
            ),
            (
                VnfKind::Cn,
                "registry.internal/mano/cn@sha256:1111111111111111111111111111111111111111111111111111111111111111".to_owned(),
            ),
            (
                VnfKind::Tn,
                "registry.internal/mano/tn-agent@sha256:2222222222222222222222222222222222222222222222222222222222222222".to_owned(),
            ),
        ]))
    }
}

impl ImageCatalog {
    #[must_use]
    pub fn image_for(&self, kind: VnfKind) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }
}

#[must_use]
pub fn namespace_for_slice(slice_id: SliceId) -> String {
    format!("mano-slice-{slice_id}")
}

fn workload_for_placement(
    placement: &VnfPlacement,
    namespace: &str,
    catalog: &ImageCatalog,
) -> Result<(ContainerSpec, crate::package::WorkloadPackage), GitopsError> {
    let image = catalog
        .image_for(placement.kind)
        .ok_or_else(|| GitopsError::ImageNotDigestPinned(format!("{:?}", placement.kind)))?
        .to_owned();

    let container = ContainerSpec {
        name: placement.name.clone(),
        image,
        requests: ResourceSpec {
            cpu_cores: placement.resources.cpu_cores,
            memory_gib: placement.resources.memory_gib,
        },
        limits: ResourceSpec {
            cpu_cores: placement.resources.cpu_cores * 1.5,
            memory_gib: placement.resources.memory_gib * 1.5,
        },
        security_context: SecurityContext::default(),
    };

    let workload = crate::package::WorkloadPackage {
        name: placement.name.clone(),
        namespace: namespace.to_owned(),
        containers: vec![container.clone()],
        labels: HashMap::from([
            ("mano.io/vnf-kind".to_owned(), format!("{:?}", placement.kind).to_lowercase()),
            ("mano.io/placement".to_owned(), placement.name.clone()),
        ]),
    };

    Ok((container, workload))
}

/// Well-known control-plane endpoints every package's network policy
/// allows egress to regardless of the placement's own dependencies
/// (`spec.md` §4.5).
const CONTROL_PLANE_ENDPOINTS: &[&str] = &["mano-orchestrator", "mano-tn-manager"];

/// Groups `plan`'s placements by target cluster and emits one
/// [`PackageSet`] per cluster, each carrying the baked-in security and
/// network policy (`spec.md` §4.5).
pub fn generate(
    plan: &PlacementPlan,
    slice_id: SliceId,
    catalog: &ImageCatalog,
) -> Result<HashMap<String, PackageSet>, GitopsError> {
    let namespace = namespace_for_slice(slice_id);
    let mut by_cluster: HashMap<String, PackageSet> = HashMap::new();

    for placement in &plan.placements {
        let (_container, workload) = workload_for_placement(placement, &namespace, catalog)?;

        let service = ServicePackage {
            name: format!("{}-svc", placement.name),
            namespace: namespace.clone(),
            selector: HashMap::from([("mano.io/placement".to_owned(), placement.name.clone())]),
            ports: vec![ServicePort {
                port: 8080,
                target_port: 8080,
            }],
        };

        let config = ConfigPackage {
            name: format!("{}-cfg", placement.name),
            namespace: namespace.clone(),
            data: HashMap::from([("slice_id".to_owned(), slice_id.to_string())]),
        };

        let network_policy = NetworkPolicy::deny_all_except(
            format!("{}-netpol", placement.name),
            namespace.clone(),
            &placement.depends_on,
            &CONTROL_PLANE_ENDPOINTS.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>(),
        );

        let entry = by_cluster
            .entry(placement.cluster_id.clone())
            .or_insert_with(|| PackageSet {
                slice_id: slice_id.to_string(),
                plan_fingerprint: plan.fingerprint.to_hex(),
                namespace: namespace.clone(),
                workloads: Vec::new(),
                services: Vec::new(),
                configs: Vec::new(),
                secrets: Vec::new(),
                network_policies: Vec::new(),
            });

        entry.workloads.push(workload);
        entry.services.push(service);
        entry.configs.push(config);
        entry.network_policies.push(network_policy);
    }

    for package_set in by_cluster.values() {
        package_set.validate()?;
    }

    Ok(by_cluster)
}

#[cfg(test)]
mod tests {
    use mano_core::{EvaluatedSite, PlanFingerprint, ResourceEnvelope, SelectionRationale};

    use super::*;

    fn placement(name: &str, kind: VnfKind, cluster: &str) -> VnfPlacement {
        VnfPlacement {
            name: name.to_owned(),
            kind,
            cluster_id: cluster.to_owned(),
            resources: ResourceEnvelope {
                cpu_cores: 1.0,
                memory_gib: 2.0,
                gpu: false,
                sr_iov: false,
            },
            depends_on: vec![],
            rationale: SelectionRationale {
                evaluated_sites: vec![EvaluatedSite {
                    cluster_id: cluster.to_owned(),
                    score: 0.9,
                }],
                selected_score: 0.9,
            },
        }
    }

    #[test]
    fn groups_packages_by_cluster() {
        let plan = PlacementPlan {
            fingerprint: PlanFingerprint([0; 32]),
            placements: vec![
                placement("ran", VnfKind::Ran, "edge-1"),
                placement("cn", VnfKind::Cn, "regional-1"),
            ],
        };
        let sets = generate(&plan, SliceId::new(), &ImageCatalog::default()).unwrap();
        assert_eq!(sets.len(), 2);
        assert!(sets.contains_key("edge-1"));
        assert!(sets.contains_key("regional-1"));
    }
}
