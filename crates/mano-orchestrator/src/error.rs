//! HTTP and reconciliation failure kinds (`spec.md` §7).

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub enum ApiError {
    NotFound(String),
    Validation(String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Self::Upstream(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<mano_intent::IntentError> for ApiError {
    fn from(err: mano_intent::IntentError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<mano_placement::PlacementError> for ApiError {
    fn from(err: mano_placement::PlacementError) -> Self {
        match err {
            mano_placement::PlacementError::InventoryStale { .. } => Self::Upstream(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

/// A step failure during reconciliation; never propagated past the
/// per-slice task, always folded into a [`mano_core::QosViolation`]
/// (`spec.md` §7, "Orchestrator cleanup is best-effort").
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("package generation failed: {0}")]
    Gitops(#[from] mano_gitops::GitopsError),
    #[error("cluster operation for workload '{workload}' on '{cluster}' failed: {source}")]
    Cluster {
        cluster: String,
        workload: String,
        #[source]
        source: mano_gitops::ClusterError,
    },
    #[error("generated package set for cluster '{cluster}' has no entry for workload '{workload}'")]
    MissingPackage { cluster: String, workload: String },
    #[error("placement plan cannot be ordered: {0}")]
    PlanOrder(#[from] mano_core::PlanOrderError),
    #[error("TN activation failed: {0}")]
    TnActivation(#[from] crate::tn_activation::TnActivationError),
    #[error("validation probe failed: {0}")]
    Validation(#[from] crate::validation::ValidationError),
    #[error("measured QoS did not satisfy the descriptor after {attempts} attempts")]
    QosNotSatisfied { attempts: u32 },
    #[error("persisting reconcile progress failed: {0}")]
    Store(#[from] mano_core::store::StoreError),
}

impl ReconcileError {
    #[must_use]
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Gitops(_) => "package_generation",
            Self::Cluster { .. } | Self::MissingPackage { .. } | Self::PlanOrder(_) => "cluster_apply",
            Self::TnActivation(_) => "tn_activation",
            Self::Validation(_) | Self::QosNotSatisfied { .. } => "validation",
            Self::Store(_) => "persistence",
        }
    }
}
