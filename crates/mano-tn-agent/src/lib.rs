//! Per-agent HTTP API: the VXLAN and TC managers on one node, exposed
//! over HTTP for the TN manager to drive (`spec.md` §4.7.2).

pub mod error;
pub mod probes;
pub mod routes;
pub mod state;

use std::{sync::Arc, time::Duration};

use tower_http::timeout::TimeoutLayer;

pub use routes::app as router;
pub use state::{AgentState, SliceBinding};

/// Per the request-lifecycle budget in `spec.md` §5: requests that run
/// longer than this are cut off rather than left to hang indefinitely.
/// The bandwidth SSE stream is exempt — it is deliberately open-ended.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[must_use]
pub fn build_router(state: Arc<AgentState>) -> axum::Router {
    routes::bounded_routes(state.clone())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .merge(routes::streaming_routes(state))
}
