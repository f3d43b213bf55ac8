//! Fixture-driven `Predictor` for tests and local demos — no network
//! call, no nondeterminism. Matches a query against registered
//! substrings in insertion order; the first match wins.

use async_trait::async_trait;
use std::time::Duration;
use wayfinder_core::{error_output, Predictor, PredictorOutput};

pub struct MockPredictor {
    fixtures: Vec<(String, PredictorOutput)>,
    default: PredictorOutput,
}

impl MockPredictor {
    /// A predictor whose every response is the given output, regardless
    /// of prompt content.
    pub fn always(output: PredictorOutput) -> Self {
        Self { fixtures: Vec::new(), default: output }
    }

    /// A predictor with no fixtures at all: every call degrades to the
    /// low-confidence error-shaped output, useful for exercising a
    /// caller's failure path without a real timeout.
    pub fn unconfigured() -> Self {
        Self::always(error_output("mock predictor has no matching fixture"))
    }

    /// Register a fixture: any prompt containing `contains_query`
    /// (case-insensitive) returns `output`.
    pub fn with_fixture(mut self, contains_query: impl Into<String>, output: PredictorOutput) -> Self {
        self.fixtures.push((contains_query.into().to_lowercase(), output));
        self
    }
}

#[async_trait]
impl Predictor for MockPredictor {
    async fn predict(&self, prompt: &str, _temperature: f64, _deadline: Duration) -> PredictorOutput {
        let lowered = prompt.to_lowercase();
        for (needle, output) in &self.fixtures {
            if lowered.contains(needle.as_str()) {
                return output.clone();
            }
        }
        self.default.clone()
    }
}
