//! HTTP API surface (`spec.md` §4.1): compile and submit an intent,
//! list/inspect slices, request termination.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use mano_core::{PlanFingerprint, SliceId, SliceInstance, SliceState};
use mano_placement::PlacementConstraints;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{error::ApiError, reconcile::reconcile_slice, state::OrchestratorState};

pub fn app(state: Arc<OrchestratorState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/intents", post(submit_intent))
        .route("/api/v1/slices", get(list_slices))
        .route("/api/v1/slices/:id", get(get_slice))
        .route("/api/v1/slices/:id/terminate", post(terminate_slice))
        .with_state(state)
}

#[instrument(skip_all)]
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct SubmitIntentRequest {
    text: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    cost_ceiling: Option<f64>,
    #[serde(default)]
    forbidden_sites: Vec<String>,
}

/// Compiles the intent, registers a `Pending` slice, and spawns its
/// reconciliation task; returns immediately with the slice id
/// (`spec.md` §4.1, §4.4).
#[instrument(skip(state, request), fields(intent_len = request.text.len()))]
async fn submit_intent(
    State(state): State<Arc<OrchestratorState>>,
    Json(request): Json<SubmitIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let compiled = mano_intent::compile(&request.text)?;

    let instance = SliceInstance::new(PlanFingerprint([0; 32]));
    let slice_id = instance.id;
    state.slices.insert(instance);

    let constraints = PlacementConstraints {
        region: request.region,
        cost_ceiling: request.cost_ceiling,
        forbidden_sites: request.forbidden_sites,
    };

    tokio::spawn(reconcile_slice(
        state.clone(),
        slice_id,
        compiled.descriptor.clone(),
        constraints,
        state.cancel.clone(),
    ));

    Ok(Json(json!({
        "slice_id": slice_id.to_string(),
        "confidence": compiled.confidence,
        "descriptor": compiled.descriptor,
    })))
}

#[instrument(skip_all)]
async fn list_slices(State(state): State<Arc<OrchestratorState>>) -> impl IntoResponse {
    Json(json!({ "slices": state.slices.list() }))
}

#[instrument(skip(state))]
async fn get_slice(Path(id): Path<String>, State(state): State<Arc<OrchestratorState>>) -> Result<impl IntoResponse, ApiError> {
    let slice_id: SliceId = id.parse().map_err(|_| ApiError::Validation(format!("malformed slice id '{id}'")))?;
    state.slices.get(slice_id).map(Json).ok_or_else(|| ApiError::NotFound(format!("no slice '{id}'")))
}

/// Marks a slice `Terminating`; actual teardown is driven by the
/// reconcile task observing the new state on its next cancellation
/// check (`spec.md` §4.4 "Cancellation").
#[instrument(skip(state))]
async fn terminate_slice(
    Path(id): Path<String>,
    State(state): State<Arc<OrchestratorState>>,
) -> Result<impl IntoResponse, ApiError> {
    let slice_id: SliceId = id.parse().map_err(|_| ApiError::Validation(format!("malformed slice id '{id}'")))?;
    let transitioned = state.slices.update(slice_id, |s| {
        let _ = s.transition(SliceState::Terminating);
    });
    if !transitioned {
        return Err(ApiError::NotFound(format!("no slice '{id}'")));
    }
    Ok(Json(json!({ "slice_id": id, "state": "terminating" })))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mano_gitops::FakeClusterClient;

    use super::*;
    use crate::{tn_activation::fake::FakeTnActivator, validation::ValidationProbe};

    struct NoopValidationProbe;

    #[async_trait::async_trait]
    impl ValidationProbe for NoopValidationProbe {
        async fn measure(
            &self,
            _slice_id: SliceId,
            qos: &mano_core::QosDescriptor,
            _targets: std::collections::HashMap<String, String>,
        ) -> Result<mano_core::MeasuredQos, crate::validation::ValidationError> {
            Ok(mano_core::MeasuredQos { throughput_mbps: qos.bandwidth_mbps, rtt_ms: qos.latency_ms * 0.5, loss_ratio: 0.0 })
        }
    }

    fn test_state() -> Arc<OrchestratorState> {
        let config = mano_config::AppConfig {
            data_dir: std::env::temp_dir().join(format!("mano-orch-routes-test-{}", mano_core::csprng::random_hex_suffix(8))),
            ..Default::default()
        };
        OrchestratorState::new(
            config,
            Arc::new(FakeClusterClient::new(Duration::from_millis(1))),
            Arc::new(FakeTnActivator::default()),
            Arc::new(NoopValidationProbe),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn submit_intent_registers_a_pending_slice() {
        let state = test_state();
        let response = submit_intent(
            State(state.clone()),
            Json(SubmitIntentRequest {
                text: "deliver 4K streaming, 100 Mbps, latency under 20 ms".to_owned(),
                region: None,
                cost_ceiling: None,
                forbidden_sites: vec![],
            }),
        )
        .await;
        assert!(response.is_ok());
        assert_eq!(state.slices.list().len(), 1);
        let _ = std::fs::remove_dir_all(&state.config.data_dir);
    }

    #[tokio::test]
    async fn submit_intent_rejects_empty_text() {
        let state = test_state();
        let response = submit_intent(
            State(state.clone()),
            Json(SubmitIntentRequest { text: String::new(), region: None, cost_ceiling: None, forbidden_sites: vec![] }),
        )
        .await;
        assert!(response.is_err());
        let _ = std::fs::remove_dir_all(&state.config.data_dir);
    }

    #[tokio::test]
    async fn get_slice_returns_not_found_for_unknown_id() {
        let state = test_state();
        let response = get_slice(Path(SliceId::new().to_string()), State(state.clone())).await;
        assert!(response.is_err());
        let _ = std::fs::remove_dir_all(&state.config.data_dir);
    }

    #[tokio::test]
    async fn terminate_slice_transitions_a_pending_slice() {
        let state = test_state();
        let instance = SliceInstance::new(PlanFingerprint([0; 32]));
        let slice_id = instance.id;
        state.slices.insert(instance);

        let response = terminate_slice(Path(slice_id.to_string()), State(state.clone())).await;
        assert!(response.is_ok());
        assert_eq!(state.slices.get(slice_id).unwrap().state, SliceState::Terminating);
        let _ = std::fs::remove_dir_all(&state.config.data_dir);
    }
}
