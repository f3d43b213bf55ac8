//! Capability contracts the core consumes but never implements.
//!
//! `Predictor` and `RecordSearcher` are capability ports, not inheritance
//! roots (spec.md §9): concrete backends for either live in sibling
//! crates (`wayfinder-llm`, `wayfinder-store`) and the core only ever
//! calls through `dyn Predictor` / `dyn RecordSearcher`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// A single row returned by a [`RecordSearcher`]: column name to value.
pub type RecordRow = HashMap<String, serde_json::Value>;

/// The structured object a [`Predictor`] returns. Always a JSON object —
/// on failure it carries a sentinel `"error"` key plus low-confidence
/// defaults so the caller can still build an `ActionPlan` (spec.md
/// §4.C2).
pub type PredictorOutput = serde_json::Value;

/// Build the sentinel error-shaped output a `Predictor` returns instead
/// of propagating a timeout/upstream error, per spec.md §4.C2/§7.
pub fn error_output(reason: &str) -> PredictorOutput {
    serde_json::json!({
        "error": reason,
        "intent": { "action_type": "NAVIGATE", "entities": [], "confidence": 0.1 },
        "entity_resolution": [],
        "route_matching": { "matched_pattern": "", "resolved_route": "", "parameters": [] },
        "overall_confidence": 0.1,
        "reasoning": reason,
    })
}

pub fn is_error_output(output: &PredictorOutput) -> bool {
    output.get("error").is_some()
}

/// Abstract contract over an LLM: prompt in, structured object out.
///
/// Implementations MUST honor `deadline` and release resources when it
/// elapses (cancellation-aware per spec.md §4.C2), returning
/// [`error_output`] rather than propagating the timeout.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, prompt: &str, temperature: f64, deadline: Duration) -> PredictorOutput;
}

/// Errors a [`RecordSearcher`] may raise. Per spec.md §4.C3, non-existent
/// *fields* are silently skipped by the implementation; only a
/// non-existent *table* is an error, and even that is swallowed by the
/// entity resolver (spec.md §4.C4) rather than propagated further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSearcherError {
    UnknownTable(String),
    Deadline,
    Backend(String),
}

impl std::fmt::Display for RecordSearcherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordSearcherError::UnknownTable(t) => write!(f, "unknown table '{t}'"),
            RecordSearcherError::Deadline => write!(f, "record search deadline exceeded"),
            RecordSearcherError::Backend(msg) => write!(f, "record search backend error: {msg}"),
        }
    }
}

impl std::error::Error for RecordSearcherError {}

/// Abstract contract over a tabular store: case-insensitive substring
/// match of `query` against any of `fields` in any of `tables`,
/// returning at most `limit` rows total (spec.md §4.C3).
#[async_trait]
pub trait RecordSearcher: Send + Sync {
    async fn search(
        &self,
        query: &str,
        tables: &[String],
        fields: &[String],
        limit: usize,
    ) -> Result<Vec<RecordRow>, RecordSearcherError>;
}
