//! Maps internal failures onto the HTTP status codes the agent API
//! returns (`spec.md` §4.7.2).

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

impl From<mano_tn_vxlan::VxlanError> for ApiError {
    fn from(err: mano_tn_vxlan::VxlanError) -> Self {
        match err {
            mano_tn_vxlan::VxlanError::PermissionDenied { .. } => Self::Upstream(err.to_string()),
            mano_tn_vxlan::VxlanError::ValidationFailure(_) => Self::Validation(err.to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<mano_tn_tc::TcError> for ApiError {
    fn from(err: mano_tn_tc::TcError) -> Self {
        match err {
            mano_tn_tc::TcError::ValidationFailure(_) => Self::Validation(err.to_string()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<mano_subprocess::SubprocessError> for ApiError {
    fn from(err: mano_subprocess::SubprocessError) -> Self {
        Self::Upstream(err.to_string())
    }
}
