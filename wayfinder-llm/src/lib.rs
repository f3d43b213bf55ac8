//! `Predictor` backends for Wayfinder: an HTTP client against any
//! chat-completion-shaped endpoint, and a fixture-driven mock for tests.

pub mod extract;
pub mod http_predictor;
pub mod mock_predictor;

pub use extract::extract_json_object;
pub use http_predictor::HttpPredictor;
pub use mock_predictor::MockPredictor;
