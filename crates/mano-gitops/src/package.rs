//! The package tree a placement is translated into (`spec.md` §4.5):
//! workload, service, network-policy, config-map, secret reference,
//! each carrying the baked-in security/network policy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GitopsError;

/// `runAsNonRoot: true`, no privilege escalation, read-only root
/// filesystem, all capabilities dropped, seccomp default profile
/// (`spec.md` §4.5, "Policy emission").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    pub run_as_non_root: bool,
    pub allow_privilege_escalation: bool,
    pub read_only_root_filesystem: bool,
    pub capabilities_drop: Vec<String>,
    pub seccomp_profile: String,
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self {
            run_as_non_root: true,
            allow_privilege_escalation: false,
            read_only_root_filesystem: true,
            capabilities_drop: vec!["ALL".to_owned()],
            seccomp_profile: "RuntimeDefault".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub cpu_cores: f64,
    pub memory_gib: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    /// Must be digest-pinned (`name@sha256:...`); tags alone are
    /// rejected by [`ContainerSpec::validate`].
    pub image: String,
    pub requests: ResourceSpec,
    pub limits: ResourceSpec,
    pub security_context: SecurityContext,
}

impl ContainerSpec {
    /// Enforces the two hard policy invariants from `spec.md` §4.5:
    /// digest-pinned images, and requests/limits present on every
    /// container.
    pub fn validate(&self, workload_name: &str) -> Result<(), GitopsError> {
        if !self.image.contains('@') || !self.image.contains("sha256:") {
            return Err(GitopsError::ImageNotDigestPinned(self.image.clone()));
        }
        if self.requests.cpu_cores <= 0.0 || self.requests.memory_gib <= 0.0 {
            return Err(GitopsError::MissingResourceSpec {
                workload: workload_name.to_owned(),
                container: self.name.clone(),
                kind: "requests",
            });
        }
        if self.limits.cpu_cores <= 0.0 || self.limits.memory_gib <= 0.0 {
            return Err(GitopsError::MissingResourceSpec {
                workload: workload_name.to_owned(),
                container: self.name.clone(),
                kind: "limits",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadPackage {
    pub name: String,
    pub namespace: String,
    pub containers: Vec<ContainerSpec>,
    pub labels: HashMap<String, String>,
}

impl WorkloadPackage {
    pub fn validate(&self) -> Result<(), GitopsError> {
        for container in &self.containers {
            container.validate(&self.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServicePort {
    pub port: u16,
    pub target_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePackage {
    pub name: String,
    pub namespace: String,
    pub selector: HashMap<String, String>,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPackage {
    pub name: String,
    pub namespace: String,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    pub namespace: String,
}

/// Default-deny egress with explicit allows only for DNS, the
/// placement's declared dependencies, and required control-plane
/// endpoints (`spec.md` §4.5, "Policy emission").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    pub name: String,
    pub namespace: String,
    pub default_deny: bool,
    pub egress_allow: Vec<EgressRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgressRule {
    pub description: String,
    pub cidr_or_dns: String,
    pub port: Option<u16>,
}

impl NetworkPolicy {
    #[must_use]
    pub fn deny_all_except(
        name: String,
        namespace: String,
        dependency_names: &[String],
        control_plane_endpoints: &[String],
    ) -> Self {
        let mut egress_allow = vec![EgressRule {
            description: "DNS".to_owned(),
            cidr_or_dns: "kube-dns".to_owned(),
            port: Some(53),
        }];
        egress_allow.extend(dependency_names.iter().map(|dep| EgressRule {
            description: format!("dependency:{dep}"),
            cidr_or_dns: dep.clone(),
            port: None,
        }));
        egress_allow.extend(control_plane_endpoints.iter().map(|endpoint| EgressRule {
            description: "control-plane".to_owned(),
            cidr_or_dns: endpoint.clone(),
            port: None,
        }));
        Self {
            name,
            namespace,
            default_deny: true,
            egress_allow,
        }
    }
}

/// The content handed to a single [`crate::ClusterClient`] target plus
/// the auxiliary resources the generator always bakes in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSet {
    pub slice_id: String,
    pub plan_fingerprint: String,
    pub namespace: String,
    pub workloads: Vec<WorkloadPackage>,
    pub services: Vec<ServicePackage>,
    pub configs: Vec<ConfigPackage>,
    pub secrets: Vec<SecretRef>,
    pub network_policies: Vec<NetworkPolicy>,
}

impl PackageSet {
    pub fn validate(&self) -> Result<(), GitopsError> {
        for workload in &self.workloads {
            workload.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_container() -> ContainerSpec {
        ContainerSpec {
            name: "ran".to_owned(),
            image: "registry.example/ran@sha256:abcd1234".to_owned(),
            requests: ResourceSpec {
                cpu_cores: 1.0,
                memory_gib: 2.0,
            },
            limits: ResourceSpec {
                cpu_cores: 2.0,
                memory_gib: 4.0,
            },
            security_context: SecurityContext::default(),
        }
    }

    #[test]
    fn rejects_tag_only_image() {
        let mut container = valid_container();
        container.image = "registry.example/ran:latest".to_owned();
        assert!(container.validate("ran-workload").is_err());
    }

    #[test]
    fn rejects_missing_limits() {
        let mut container = valid_container();
        container.limits.cpu_cores = 0.0;
        assert!(container.validate("ran-workload").is_err());
    }

    #[test]
    fn accepts_digest_pinned_with_requests_and_limits() {
        assert!(valid_container().validate("ran-workload").is_ok());
    }
}
