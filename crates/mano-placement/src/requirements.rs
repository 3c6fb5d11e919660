//! Per-class VNF requirement tables (`spec.md` §4.3: "RAN at edge, CN at
//! regional/central, TN on every participating cluster").

use mano_core::{QosDescriptor, ResourceEnvelope, VnfKind};

#[derive(Debug, Clone, PartialEq)]
pub struct VnfRequirement {
    pub name: String,
    pub kind: VnfKind,
    pub resources: ResourceEnvelope,
    pub depends_on: Vec<String>,
}

/// RAN and CN requirements for a slice. TN requirements are derived
/// afterwards, once RAN/CN sites are known (`requirements::tn_for_sites`).
#[must_use]
pub fn ran_and_cn_requirements(qos: &QosDescriptor) -> Vec<VnfRequirement> {
    let bandwidth_share = qos.bandwidth_mbps / 1000.0;
    vec![
        VnfRequirement {
            name: "ran".to_owned(),
            kind: VnfKind::Ran,
            resources: ResourceEnvelope {
                cpu_cores: 2.0 + bandwidth_share,
                memory_gib: 4.0 + bandwidth_share,
                gpu: false,
                sr_iov: qos.class == mano_core::SliceClass::Urllc,
            },
            depends_on: vec![],
        },
        VnfRequirement {
            name: "cn".to_owned(),
            kind: VnfKind::Cn,
            resources: ResourceEnvelope {
                cpu_cores: 4.0 + bandwidth_share * 2.0,
                memory_gib: 8.0 + bandwidth_share * 2.0,
                gpu: false,
                sr_iov: false,
            },
            depends_on: vec![],
        },
    ]
}

/// One TN requirement per distinct site hosting RAN or CN, depending on
/// whichever of RAN/CN landed there so the transport link comes up only
/// after both its endpoints are ready.
#[must_use]
pub fn tn_for_sites(ran_site: &str, cn_site: &str) -> Vec<VnfRequirement> {
    let mut sites: Vec<&str> = vec![ran_site];
    if cn_site != ran_site {
        sites.push(cn_site);
    }

    sites
        .into_iter()
        .enumerate()
        .map(|(index, site)| {
            let mut depends_on = Vec::new();
            if site == ran_site {
                depends_on.push("ran".to_owned());
            }
            if site == cn_site {
                depends_on.push("cn".to_owned());
            }
            VnfRequirement {
                name: format!("tn-{index}"),
                kind: VnfKind::Tn,
                resources: ResourceEnvelope {
                    cpu_cores: 0.5,
                    memory_gib: 1.0,
                    gpu: false,
                    sr_iov: false,
                },
                depends_on,
            }
        })
        .collect()
}
