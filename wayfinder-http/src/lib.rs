//! Thin axum transport over `wayfinder_core::PlanningService`: the
//! planning request/response shape of spec.md §6, plus a cache-management
//! surface and a health check. Deliberately minimal — no auth, no rate
//! limiting; those remain this repo's non-goals.

pub mod error;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use routes::router;
pub use state::AppState;
