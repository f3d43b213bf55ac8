//! Core planning pipeline and dual cache for the Wayfinder intent
//! router: a natural-language front door that turns a free-form query
//! into a structured, confidence-scored `ActionPlan` against a
//! declarative site configuration.
//!
//! This crate is driver-free: it depends on an LLM or a tabular store
//! only through the [`Predictor`] and [`RecordSearcher`] ports. Concrete
//! backends live in `wayfinder-llm` and `wayfinder-store`.

pub mod cache;
pub mod error;
pub mod model;
pub mod normalize;
pub mod planner;
pub mod ports;
pub mod prompt;
pub mod resolver;
pub mod route_validator;
pub mod service;
pub mod structural;

pub use error::PlanningError;
pub use model::{
    ActionKind, ActionPlan, ActionPlanSummary, ColumnSpec, ConfigurationError, EntityDefinition, EntityMatch,
    ParameterSource, ParameterSpec, ParameterType, RouteParameter, RoutePattern, SchemaSpec, SiteConfiguration,
    TableSpec,
};
pub use ports::{error_output, is_error_output, Predictor, PredictorOutput, RecordRow, RecordSearcher, RecordSearcherError};
pub use service::{LatencyLevel, PlanningRequest, PlanningResponse, PlanningService};
