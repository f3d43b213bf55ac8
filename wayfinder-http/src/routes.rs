//! Route handlers (spec.md §6 external interfaces), routing logic lifted
//! from `routes.py`'s FastAPI handlers minus the framework-specific
//! framing, which this module owns instead.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use wayfinder_core::{PlanningRequest, PlanningResponse};

/// One span per request — query length, duration, cache type, confidence
/// — layered on via `tower_http::trace::TraceLayer`, the same mechanism
/// `r2e-core::layers` wires up over `tracing-subscriber`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plan", post(plan))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/debug/structural", get(debug_structural))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PlanRequestBody {
    pub query: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
}

fn default_max_alternatives() -> usize {
    3
}

impl From<PlanRequestBody> for PlanningRequest {
    fn from(body: PlanRequestBody) -> Self {
        PlanningRequest {
            query: body.query,
            user_id: body.user_id,
            user_role: body.user_role,
            context: body.context,
            max_alternatives: body.max_alternatives,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn plan(State(state): State<AppState>, Json(body): Json<PlanRequestBody>) -> Result<Json<PlanningResponse>, AppError> {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let query_length = body.query.chars().count();
    let response = state.service.handle(body.into(), timestamp).await?;
    tracing::info!(
        query_length,
        duration_ms = response.performance.duration_ms,
        cache_type = ?response.performance.cache_type,
        confidence = response.action_plan.confidence,
        "planned one request"
    );
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ClearedResponse {
    cleared: bool,
}

async fn clear_cache(State(state): State<AppState>) -> Json<ClearedResponse> {
    state.service.cache().clear_all();
    Json(ClearedResponse { cleared: true })
}

async fn cache_stats(State(state): State<AppState>) -> Json<wayfinder_core::cache::DualCacheStats> {
    Json(state.service.cache().stats())
}

#[derive(Debug, Deserialize)]
pub struct StructuralDebugParams {
    #[serde(default = "default_debug_limit")]
    pub limit: usize,
}

fn default_debug_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
struct StructuralDebugResponse {
    keys: Vec<String>,
}

async fn debug_structural(State(state): State<AppState>, Query(params): Query<StructuralDebugParams>) -> Json<StructuralDebugResponse> {
    Json(StructuralDebugResponse { keys: state.service.cache().debug_structural_keys(params.limit) })
}
