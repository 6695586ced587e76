//! HTTP error responses

use ashcam_timeline::NavError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_name, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UpstreamError", msg),
        };

        let body = Json(json!({
            "error": error_name,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Convert navigation errors to API errors
impl From<NavError> for ApiError {
    fn from(err: NavError) -> Self {
        let message = err.to_string();
        match err {
            NavError::OutOfRange { .. } => ApiError::BadRequest(message),
            NavError::NotEnoughImages { .. } | NavError::Empty(_) => ApiError::NotFound(message),
            NavError::ClampNotConfirmed { .. } | NavError::NoWebcamInfo | NavError::Stale => {
                ApiError::Conflict(message)
            }
            NavError::Fetch(_) => ApiError::Upstream(message),
        }
    }
}
