//! Maps internal failures onto the HTTP status codes the manager API
//! returns (`spec.md` §4.7.3).

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
