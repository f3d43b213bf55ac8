//! Bridges `wayfinder_core::PlanningError` to an axum response, grounded
//! on `r2e-core::error::AppError` / `example-postgres::error::HttpError`'s
//! enum-of-status-codes-plus-`{ "error": message }"`-body shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use wayfinder_core::PlanningError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            AppError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<PlanningError> for AppError {
    fn from(err: PlanningError) -> Self {
        match err {
            PlanningError::MalformedQuery(msg) => AppError::BadRequest(msg),
            PlanningError::InvalidPlan(msg) => AppError::Internal(msg),
            PlanningError::Configuration(err) => AppError::Internal(err.to_string()),
        }
    }
}
