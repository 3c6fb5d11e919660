//! HTTP API surface (`spec.md` §4.7.3): register agents, dispatch a
//! synchronised test, and read back its report.

use std::{collections::HashMap, sync::Arc, time::Duration, time::SystemTime};

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use mano_core::SliceClass;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::{
    dispatch::{ProbeDescriptor, dispatch_test},
    error::ApiError,
    report::aggregate,
    state::ManagerState,
};

pub fn app(state: Arc<ManagerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agents", post(register_agent).get(list_agents))
        .route("/tests", post(run_test))
        .route("/tests/:test_id", get(get_report))
        .with_state(state)
}

#[instrument(skip_all)]
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct RegisterAgentRequest {
    id: String,
    base_url: String,
}

#[instrument(skip(state, request))]
async fn register_agent(
    State(state): State<Arc<ManagerState>>,
    Json(request): Json<RegisterAgentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let base_url = Url::parse(&request.base_url).map_err(|err| ApiError::Validation(err.to_string()))?;
    state.registry.register(request.id.clone(), base_url, state.client.clone(), state.cancel.clone());
    Ok(Json(json!({ "registered": request.id })))
}

#[instrument(skip_all)]
async fn list_agents(State(state): State<Arc<ManagerState>>) -> impl IntoResponse {
    let agents: Vec<_> = state
        .registry
        .list()
        .into_iter()
        .map(|agent| json!({ "id": agent.id, "base_url": agent.base_url.to_string(), "healthy": agent.healthy }))
        .collect();
    Json(json!({ "agents": agents }))
}

#[derive(Debug, Deserialize)]
struct RunTestRequest {
    test_id: String,
    slice_class: SliceClass,
    duration_secs: u64,
    #[serde(default = "default_protocol")]
    protocol: String,
    /// Maps each agent id to the peer IP it should probe.
    targets: HashMap<String, String>,
    #[serde(default = "default_deadline_secs")]
    deadline_secs: u64,
}

fn default_protocol() -> String {
    "udp".to_owned()
}

const fn default_deadline_secs() -> u64 {
    30
}

#[instrument(skip(state, request), fields(test_id = %request.test_id))]
async fn run_test(
    State(state): State<Arc<ManagerState>>,
    Json(request): Json<RunTestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agents: Vec<_> = state
        .registry
        .healthy_agents()
        .into_iter()
        .filter(|agent| request.targets.contains_key(&agent.id))
        .collect();
    if agents.is_empty() {
        return Err(ApiError::Validation("no healthy agents match the requested targets".to_owned()));
    }

    let descriptor = ProbeDescriptor {
        test_id: request.test_id.clone(),
        slice_class: request.slice_class,
        duration: Duration::from_secs(request.duration_secs),
        protocol: request.protocol,
        start_epoch: SystemTime::now() + Duration::from_secs(2),
    };

    let agent_ids: Vec<String> = agents.iter().map(|a| a.id.clone()).collect();
    let outcomes =
        dispatch_test(&agents, &request.targets, &descriptor, &state.probe, Duration::from_secs(request.deadline_secs))
            .await;
    let results: Vec<_> = agent_ids.into_iter().zip(outcomes).collect();

    let report = aggregate(&request.test_id, request.slice_class.as_str(), &results, HashMap::new());
    state.store_report(report.clone());
    Ok(Json(report))
}

#[instrument(skip(state))]
async fn get_report(Path(test_id): Path<String>, State(state): State<Arc<ManagerState>>) -> Result<impl IntoResponse, ApiError> {
    state.report(&test_id).map(Json).ok_or_else(|| ApiError::NotFound(format!("no report for test {test_id}")))
}
