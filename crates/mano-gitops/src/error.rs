//! Failure kinds for package generation and cluster application
//! (`spec.md` §4.5, §7).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GitopsError {
    #[error("image reference '{0}' is not digest-pinned; tags alone are rejected")]
    ImageNotDigestPinned(String),
    #[error("container '{container}' in workload '{workload}' is missing resource {kind}")]
    MissingResourceSpec {
        workload: String,
        container: String,
        kind: &'static str,
    },
    #[error("failed to serialize package content: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write package to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: mano_core::store::StoreError,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClusterError {
    #[error("cluster API call failed: {message}")]
    Api { message: String, retryable: bool },
    #[error("workload '{namespace}/{name}' did not become ready within {timeout_secs}s")]
    WaitTimeout {
        namespace: String,
        name: String,
        timeout_secs: u64,
    },
}

impl ClusterError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Api { retryable, .. })
    }
}
