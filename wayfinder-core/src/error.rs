//! Error taxonomy (spec.md §7). This crate has no HTTP dependency — the
//! bridge to an axum response lives in `wayfinder-http::error` via
//! `From<PlanningError>`, mirroring `r2e-data::DataError` ->
//! `r2e_core::HttpError`.

use crate::model::ConfigurationError;

#[derive(Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// Empty or over-length query. 4xx-shaped at the transport boundary;
    /// no predictor call is made.
    MalformedQuery(String),
    /// All repair fallbacks for an invalid route failed. 5xx-shaped at
    /// the transport boundary.
    InvalidPlan(String),
    /// Startup-time configuration invariant violation. The process
    /// should abort rather than serve requests.
    Configuration(ConfigurationError),
}

impl std::fmt::Display for PlanningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanningError::MalformedQuery(msg) => write!(f, "malformed query: {msg}"),
            PlanningError::InvalidPlan(msg) => write!(f, "invalid plan: {msg}"),
            PlanningError::Configuration(err) => write!(f, "configuration error: {err}"),
        }
    }
}

impl std::error::Error for PlanningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanningError::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for PlanningError {
    fn from(err: ConfigurationError) -> Self {
        PlanningError::Configuration(err)
    }
}
