//! GitOps package generation and the [`ClusterClient`] abstraction the
//! deployment orchestrator drives per target cluster (`spec.md` §4.5,
//! §4.6).

pub mod cluster_client;
pub mod error;
pub mod generator;
pub mod package;
pub mod store;

pub use cluster_client::{ClusterClient, FakeClusterClient, KubeClusterClient};
pub use error::{ClusterError, GitopsError};
pub use generator::{ImageCatalog, generate, namespace_for_slice};
pub use package::{
    ConfigPackage, ContainerSpec, EgressRule, NetworkPolicy, PackageSet, ResourceSpec, SecretRef,
    SecurityContext, ServicePackage, ServicePort, WorkloadPackage,
};
