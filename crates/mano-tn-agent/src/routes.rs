//! HTTP API surface (`spec.md` §4.7.2). Every handler is instrumented
//! so request spans carry the slice id / VNI where applicable, and
//! every response is `Content-Type: application/json`.

use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
    routing::{get, post, put},
};
use futures::stream::Stream;
use mano_core::{QosDescriptor, SliceClass, SliceId, TunnelCounters, TunnelState, Vni};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tracing::instrument;

use crate::{error::ApiError, probes, state::AgentState};

/// Routes eligible for the outer request-timeout layer: everything
/// except the open-ended bandwidth stream (`spec.md` §5).
pub fn bounded_routes(state: Arc<AgentState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/slices/:slice_id", post(create_slice).delete(remove_slice).get(slice_status))
        .route("/vxlan/status", get(vxlan_status))
        .route("/vxlan/peers", put(update_peers))
        .route("/vxlan/connectivity", post(connectivity_probe))
        .route("/tc/status", get(tc_status))
        .route("/tc/rules", post(apply_tc_rule).delete(remove_tc_rule))
        .route("/bandwidth", get(bandwidth_snapshot))
        .with_state(state)
}

/// The long-lived SSE stream, kept off the bounded-request timeout
/// layer so it is not severed mid-stream.
pub fn streaming_routes(state: Arc<AgentState>) -> Router {
    Router::new().route("/bandwidth/stream", get(bandwidth_stream)).with_state(state)
}

pub fn app(state: Arc<AgentState>) -> Router {
    bounded_routes(state.clone()).merge(streaming_routes(state))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: u64,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[instrument(skip_all)]
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: unix_now(),
    })
}

#[instrument(skip_all)]
async fn status(State(state): State<Arc<AgentState>>) -> impl IntoResponse {
    let active_tunnels = state.vxlan.list_active().len();
    let bound_slices = state.slices.lock().unwrap_or_else(|e| e.into_inner()).len();
    Json(json!({
        "status": "ok",
        "phys_interface": state.phys_interface,
        "active_tunnels": active_tunnels,
        "bound_slices": bound_slices,
    }))
}

#[derive(Debug, Deserialize)]
struct CreateSliceRequest {
    vni: u32,
    remote_underlay_ips: Vec<Ipv4Addr>,
    class: SliceClass,
    bandwidth_mbps: f64,
    latency_ms: f64,
    jitter_ms: f64,
    loss_ratio: f64,
    #[serde(default)]
    reliability: Option<f64>,
    #[serde(default = "default_priority")]
    priority: u8,
    #[serde(default)]
    traffic_class: String,
}

const fn default_priority() -> u8 {
    5
}

#[derive(Serialize)]
struct SliceCreatedResponse {
    slice_id: String,
    vni: u32,
    state: TunnelState,
}

#[instrument(skip(state, request), fields(slice_id = %slice_id))]
async fn create_slice(
    Path(slice_id): Path<SliceId>,
    State(state): State<Arc<AgentState>>,
    Json(request): Json<CreateSliceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let vni = Vni::new(request.vni).map_err(|err| ApiError::Validation(err.to_string()))?;
    let descriptor = QosDescriptor::new(
        request.class,
        request.bandwidth_mbps,
        request.latency_ms,
        request.jitter_ms,
        request.loss_ratio,
        request.reliability,
        request.priority,
        request.traffic_class,
    )
    .map_err(|err| ApiError::Validation(err.to_string()))?;

    let record = state
        .vxlan
        .create_tunnel(
            vni,
            slice_id,
            state.local_underlay_ip,
            request.remote_underlay_ips,
            &state.phys_interface,
        )
        .await?;

    state.tc.update_shaping(&state.phys_interface, slice_id, &descriptor).await?;
    state.bind(slice_id, crate::state::SliceBinding { vni, descriptor });

    Ok(Json(SliceCreatedResponse {
        slice_id: slice_id.to_string(),
        vni: vni.get(),
        state: record.state,
    }))
}

#[instrument(skip(state), fields(slice_id = %slice_id))]
async fn remove_slice(
    Path(slice_id): Path<SliceId>,
    State(state): State<Arc<AgentState>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(binding) = state.unbind(slice_id) else {
        return Ok(Json(json!({ "removed": false })));
    };
    state.vxlan.delete_tunnel(binding.vni, &state.phys_interface).await?;
    state.tc.remove_shaping(&state.phys_interface, slice_id).await?;
    Ok(Json(json!({ "removed": true })))
}

#[instrument(skip(state), fields(slice_id = %slice_id))]
async fn slice_status(
    Path(slice_id): Path<SliceId>,
    State(state): State<Arc<AgentState>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(binding) = state.binding(slice_id) else {
        return Err(ApiError::NotFound(format!("no binding for slice {slice_id}")));
    };
    let tunnel = state.vxlan.status(binding.vni);
    let tc = state.tc.status(&state.phys_interface, slice_id);
    Ok(Json(json!({
        "slice_id": slice_id.to_string(),
        "vni": binding.vni.get(),
        "tunnel_state": tunnel.as_ref().map(|t| t.state),
        "tc_applied": tc.is_some(),
    })))
}

#[derive(Serialize)]
struct TunnelSummary {
    vni: u32,
    slice_id: String,
    state: TunnelState,
    local_underlay_ip: Ipv4Addr,
    remote_underlay_ips: Vec<Ipv4Addr>,
    counters: TunnelCounters,
}

#[instrument(skip_all)]
async fn vxlan_status(State(state): State<Arc<AgentState>>) -> impl IntoResponse {
    let tunnels: Vec<TunnelSummary> = state
        .vxlan
        .list_active()
        .into_iter()
        .map(|record| TunnelSummary {
            vni: record.vni.get(),
            slice_id: record.slice_id.to_string(),
            state: record.state,
            local_underlay_ip: record.local_underlay_ip,
            remote_underlay_ips: record.remote_underlay_ips,
            counters: record.counters,
        })
        .collect();
    Json(json!({ "tunnels": tunnels }))
}

#[derive(Debug, Deserialize)]
struct UpdatePeersRequest {
    vni: u32,
    remote_underlay_ips: Vec<Ipv4Addr>,
}

#[instrument(skip(state, request))]
async fn update_peers(
    State(state): State<Arc<AgentState>>,
    Json(request): Json<UpdatePeersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let vni = Vni::new(request.vni).map_err(|err| ApiError::Validation(err.to_string()))?;
    state.vxlan.update_peers(vni, request.remote_underlay_ips).await?;
    Ok(Json(json!({ "updated": true })))
}

#[derive(Debug, Deserialize)]
struct ConnectivityRequest {
    target_ip: String,
    #[serde(default = "default_ping_count")]
    count: u32,
}

const fn default_ping_count() -> u32 {
    4
}

#[instrument(skip(state))]
async fn connectivity_probe(
    State(state): State<Arc<AgentState>>,
    Json(request): Json<ConnectivityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _ = &state;
    let executor = mano_subprocess::SecureExecutor::new();
    let result = probes::run_ping(&executor, &request.target_ip, request.count).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct TcStatusQuery {
    slice_id: SliceId,
}

#[instrument(skip(state))]
async fn tc_status(
    State(state): State<Arc<AgentState>>,
    Query(query): Query<TcStatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(record) = state.tc.status(&state.phys_interface, query.slice_id) else {
        return Err(ApiError::NotFound(format!("no TC policy for slice {}", query.slice_id)));
    };
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct ApplyTcRuleRequest {
    slice_id: SliceId,
    class: SliceClass,
    bandwidth_mbps: f64,
    latency_ms: f64,
    jitter_ms: f64,
    loss_ratio: f64,
    #[serde(default)]
    reliability: Option<f64>,
    #[serde(default = "default_priority")]
    priority: u8,
    #[serde(default)]
    traffic_class: String,
}

#[instrument(skip(state, request))]
async fn apply_tc_rule(
    State(state): State<Arc<AgentState>>,
    Json(request): Json<ApplyTcRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let descriptor = QosDescriptor::new(
        request.class,
        request.bandwidth_mbps,
        request.latency_ms,
        request.jitter_ms,
        request.loss_ratio,
        request.reliability,
        request.priority,
        request.traffic_class,
    )
    .map_err(|err| ApiError::Validation(err.to_string()))?;
    let record = state.tc.update_shaping(&state.phys_interface, request.slice_id, &descriptor).await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct RemoveTcRuleRequest {
    slice_id: SliceId,
}

#[instrument(skip(state, request))]
async fn remove_tc_rule(
    State(state): State<Arc<AgentState>>,
    Json(request): Json<RemoveTcRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.tc.remove_shaping(&state.phys_interface, request.slice_id).await?;
    Ok(Json(json!({ "removed": true })))
}

#[instrument(skip_all)]
async fn bandwidth_snapshot(State(state): State<Arc<AgentState>>) -> impl IntoResponse {
    let counters = mano_tn_tc::read_counters(&state.phys_interface).await.unwrap_or_default();
    Json(json!({
        "interface": state.phys_interface,
        "rx_bytes": counters.rx_bytes,
        "tx_bytes": counters.tx_bytes,
    }))
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    #[serde(default = "default_stream_interval_ms")]
    interval_ms: u64,
}

const fn default_stream_interval_ms() -> u64 {
    1000
}

#[instrument(skip(state))]
async fn bandwidth_stream(
    State(state): State<Arc<AgentState>>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(query.interval_ms.max(100)));
    let stream = IntervalStream::new(interval).then(move |_| {
        let interface = state.phys_interface.clone();
        async move {
            let counters = mano_tn_tc::read_counters(&interface).await.unwrap_or_default();
            let payload = json!({
                "interface": interface,
                "rx_bytes": counters.rx_bytes,
                "tx_bytes": counters.tx_bytes,
            });
            Ok(Event::default().json_data(payload).unwrap_or_else(|_| Event::default()))
        }
    });
    Sse::new(stream)
}
