//! HTTP-backed `Predictor` against a chat-completion-shaped endpoint,
//! grounded on `adapters/llm/openai.py::OpenAILLMClient.analyze` — the
//! request shape, the `asyncio.wait_for` deadline, and the
//! parse-then-extract-then-give-up fallback ladder all carry over.

use crate::extract::extract_json_object;
use async_trait::async_trait;
use std::time::Duration;
use wayfinder_core::{error_output, Predictor, PredictorOutput};

const DEFAULT_MAX_TOKENS: u32 = 1000;
const SYSTEM_PROMPT: &str =
    "You are an expert at analyzing user intents and returning structured JSON responses. Always respond with valid JSON only, no extra text.";

/// Calls a chat-completion endpoint (anything speaking the OpenAI
/// `/chat/completions` request/response shape) over `reqwest`.
pub struct HttpPredictor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl HttpPredictor {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn request_body(&self, prompt: &str, temperature: f64) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "temperature": temperature,
            "max_tokens": self.max_tokens,
            "response_format": {"type": "json_object"},
        })
    }

    async fn call(&self, prompt: &str, temperature: f64) -> Result<String, String> {
        let mut request = self.client.post(&self.endpoint).json(&self.request_body(prompt, temperature));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| format!("predictor request failed: {e}"))?;
        let response = response.error_for_status().map_err(|e| format!("predictor returned an error status: {e}"))?;
        let body: serde_json::Value = response.json().await.map_err(|e| format!("predictor response was not JSON: {e}"))?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| "predictor response missing choices[0].message.content".to_string())
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, prompt: &str, temperature: f64, deadline: Duration) -> PredictorOutput {
        let content = match tokio::time::timeout(deadline, self.call(prompt, temperature)).await {
            Ok(Ok(content)) => content,
            Ok(Err(reason)) => {
                tracing::warn!(reason = %reason, "predictor call failed");
                return error_output(&reason);
            }
            Err(_) => {
                tracing::warn!(?deadline, "predictor call exceeded its deadline");
                return error_output("predictor deadline exceeded");
            }
        };

        if let Ok(parsed) = serde_json::from_str::<PredictorOutput>(&content) {
            return parsed;
        }
        if let Some(parsed) = extract_json_object(&content) {
            tracing::debug!("predictor output was not bare JSON; recovered via brace extraction");
            return parsed;
        }
        tracing::warn!("predictor output could not be parsed as JSON even with brace extraction");
        error_output("predictor output was not parseable JSON")
    }
}
