//! Slice state machine, reconciliation loop, and REST API for the
//! intent-driven control plane (`spec.md` §4.1, §4.4, §5).

pub mod error;
pub mod progress;
pub mod reconcile;
pub mod routes;
pub mod state;
pub mod tn_activation;
pub mod validation;

use std::{sync::Arc, time::Duration};

use tower_http::timeout::TimeoutLayer;

pub use state::OrchestratorState;
pub use tn_activation::{HttpTnActivator, TnActivator, TnActivationError};
pub use validation::{HttpValidationProbe, ValidationError, ValidationProbe};

/// Every handler resolves within this budget; the reconciliation loop
/// itself runs detached on its own spawned task and is unaffected by it
/// (`spec.md` §5, the intent submission handler only blocks for
/// compilation and registration).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[must_use]
pub fn build_router(state: Arc<OrchestratorState>) -> axum::Router {
    routes::app(state).layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
