//! TN manager: registers TN agents, polls their health, and dispatches
//! synchronised multi-site tests (`spec.md` §4.7.3).

pub mod dispatch;
pub mod error;
pub mod registry;
pub mod report;
pub mod routes;
pub mod state;

use std::{sync::Arc, time::Duration};

use tower_http::timeout::TimeoutLayer;

pub use routes::app as router;
pub use state::ManagerState;

/// Every manager request resolves within this budget. Wide enough to
/// cover a full test dispatch (probe duration plus per-agent deadline);
/// callers requesting longer test durations should poll `GET
/// /tests/:test_id` instead of waiting on the dispatch call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[must_use]
pub fn build_router(state: Arc<ManagerState>) -> axum::Router {
    routes::app(state).layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
