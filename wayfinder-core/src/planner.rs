//! Single-Call Planner (spec.md §4.C6): one Predictor invocation, fed
//! through the Entity Resolver and Route Validator, yields an
//! `ActionPlan`.

use crate::error::PlanningError;
use crate::model::{
    ActionKind, ActionPlan, EntityMatch, ParameterSource, ParameterType, RouteParameter, SiteConfiguration,
};
use crate::ports::{is_error_output, Predictor, PredictorOutput, RecordSearcher};
use crate::prompt::{PromptBuilder, ENTITY_ID_PLACEHOLDER};
use crate::resolver::{EntityResolver, ResolveRequest};
use crate::route_validator::{RouteValidator, Validation};
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for one Predictor call (spec.md §5).
pub const DEFAULT_PREDICTOR_DEADLINE: Duration = Duration::from_secs(60);
const PREDICTOR_TEMPERATURE: f64 = 0.1;

pub struct SingleCallPlanner {
    predictor: Arc<dyn Predictor>,
    resolver: EntityResolver,
    validator: Arc<RouteValidator>,
    predictor_deadline: Duration,
}

impl SingleCallPlanner {
    pub fn new(predictor: Arc<dyn Predictor>, searcher: Arc<dyn RecordSearcher>, validator: Arc<RouteValidator>) -> Self {
        Self {
            predictor,
            resolver: EntityResolver::new(searcher),
            validator,
            predictor_deadline: DEFAULT_PREDICTOR_DEADLINE,
        }
    }

    pub async fn plan(&self, config: &SiteConfiguration, query: &str) -> Result<ActionPlan, PlanningError> {
        let prompt = PromptBuilder::new(config).build(query);
        let output = self.predictor.predict(&prompt, PREDICTOR_TEMPERATURE, self.predictor_deadline).await;

        let degraded = is_error_output(&output);
        let reasoning_prefix = if degraded { "" } else { "LLM analysis: " };

        let entities = self.resolve_entities(&output).await;
        let (route, parameters) = self.assemble_route(&output, &entities);

        let action_kind = output
            .get("intent")
            .and_then(|i| i.get("action_type"))
            .and_then(|v| v.as_str())
            .map(ActionKind::from_wire)
            .unwrap_or_default();

        let mut confidence = output
            .get("overall_confidence")
            .and_then(|v| v.as_f64())
            .filter(|c| (0.0..=1.0).contains(c))
            .unwrap_or(0.5);

        let reasoning = output
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or("no reasoning provided")
            .to_string();

        let (route, matched_pattern) = match self.validator.validate(&route, &entities) {
            Validation::Valid { matched_pattern } => (route, matched_pattern),
            Validation::Repaired { route, matched_pattern, confidence_penalty } => {
                confidence = (confidence - confidence_penalty).max(0.1);
                (route, matched_pattern)
            }
            Validation::Failed => {
                return Err(PlanningError::InvalidPlan(format!(
                    "route '{route}' does not match any declared pattern and no repair fallback applied"
                )));
            }
        };

        Ok(ActionPlan {
            action_kind,
            route,
            confidence,
            parameters,
            entities,
            matched_pattern,
            reasoning: format!("{reasoning_prefix}{reasoning}"),
            alternatives: vec![],
        })
    }

    async fn resolve_entities(&self, output: &PredictorOutput) -> Vec<EntityMatch> {
        let Some(directives) = output.get("entity_resolution").and_then(|v| v.as_array()) else {
            return Vec::new();
        };
        let mut entities = Vec::new();
        for directive in directives {
            let Some(name) = directive.get("entity_name").and_then(|v| v.as_str()) else {
                continue;
            };
            let tables = string_array(directive.get("search_tables"));
            let fields = string_array(directive.get("search_fields"));
            if tables.is_empty() || fields.is_empty() {
                continue;
            }
            let req = ResolveRequest::new(name, tables, fields);
            entities.extend(self.resolver.search_entity(&req).await);
        }
        entities
    }

    /// Read `route_matching`, substituting the first resolved entity's
    /// id wherever the model emitted the literal placeholder.
    fn assemble_route(&self, output: &PredictorOutput, entities: &[EntityMatch]) -> (String, Vec<RouteParameter>) {
        let route_matching = output.get("route_matching");
        let mut route = route_matching
            .and_then(|r| r.get("resolved_route"))
            .and_then(|v| v.as_str())
            .unwrap_or("/")
            .to_string();

        let substitute_id = entities.first().map(|e| e.id.as_str());
        if let Some(id) = substitute_id {
            route = route.replace(ENTITY_ID_PLACEHOLDER, id);
        }

        let mut parameters = Vec::new();
        if let Some(params) = route_matching.and_then(|r| r.get("parameters")).and_then(|v| v.as_array()) {
            for p in params {
                let name = p.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                let mut value = p.get("value").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                let mut source = p
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(ParameterSource::from_wire)
                    .unwrap_or_default();
                if value == ENTITY_ID_PLACEHOLDER {
                    if let Some(id) = substitute_id {
                        value = id.to_string();
                        source = ParameterSource::Entity;
                    }
                }
                let param_type = p
                    .get("type")
                    .and_then(|v| v.as_str())
                    .map(ParameterType::from_wire)
                    .unwrap_or_default();
                parameters.push(RouteParameter { name, value, param_type, source });
            }
        }

        (route, parameters)
    }
}

fn string_array(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{error_output, RecordRow, RecordSearcherError};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FixedPredictor(PredictorOutput);

    #[async_trait]
    impl Predictor for FixedPredictor {
        async fn predict(&self, _prompt: &str, _temperature: f64, _deadline: Duration) -> PredictorOutput {
            self.0.clone()
        }
    }

    struct TimeoutPredictor;

    #[async_trait]
    impl Predictor for TimeoutPredictor {
        async fn predict(&self, _prompt: &str, _temperature: f64, _deadline: Duration) -> PredictorOutput {
            error_output("predictor deadline exceeded")
        }
    }

    struct EmptySearcher;

    #[async_trait]
    impl RecordSearcher for EmptySearcher {
        async fn search(&self, _q: &str, _t: &[String], _f: &[String], _l: usize) -> Result<Vec<RecordRow>, RecordSearcherError> {
            Ok(vec![])
        }
    }

    struct OneRowSearcher;

    #[async_trait]
    impl RecordSearcher for OneRowSearcher {
        async fn search(&self, _q: &str, _t: &[String], _f: &[String], _l: usize) -> Result<Vec<RecordRow>, RecordSearcherError> {
            let mut row = RecordRow::new();
            row.insert("id".into(), serde_json::json!("u-42"));
            row.insert("name".into(), serde_json::json!("james smith"));
            Ok(vec![row])
        }
    }

    fn validator() -> Arc<RouteValidator> {
        use crate::model::{ParameterSpec, RoutePattern};
        let mut parameters = HashMap::new();
        parameters.insert(
            "entity_type".to_string(),
            ParameterSpec { param_type: ParameterType::String, required: true, enum_values: None, examples: vec![] },
        );
        parameters.insert(
            "entity_id".to_string(),
            ParameterSpec { param_type: ParameterType::Uuid, required: true, enum_values: None, examples: vec![] },
        );
        Arc::new(RouteValidator::new(vec![RoutePattern {
            name: "overview".into(),
            template: "/{entity_type}/{entity_id}/overview".into(),
            description: String::new(),
            intent_patterns: vec![],
            parameters,
            required_roles: None,
        }]))
    }

    fn config() -> SiteConfiguration {
        SiteConfiguration {
            domain: "test".into(),
            base_url: "http://localhost".into(),
            entities: HashMap::new(),
            route_patterns: vec![],
            database_schema: Default::default(),
            semantic_mappings: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn happy_path_substitutes_placeholder_with_resolved_entity() {
        let output = serde_json::json!({
            "intent": {"action_type": "navigate"},
            "entity_resolution": [{"entity_name": "james smith", "search_tables": ["users"], "search_fields": ["name"]}],
            "route_matching": {
                "resolved_route": format!("/person/{ENTITY_ID_PLACEHOLDER}/overview"),
                "parameters": [{"name": "entity_id", "value": ENTITY_ID_PLACEHOLDER, "type": "uuid", "source": "entity"}]
            },
            "overall_confidence": 0.9,
            "reasoning": "matched person overview",
        });
        let planner = SingleCallPlanner::new(Arc::new(FixedPredictor(output)), Arc::new(OneRowSearcher), validator());
        let plan = planner.plan(&config(), "show james smith").await.unwrap();
        assert_eq!(plan.route, "/person/u-42/overview");
        assert!(plan.reasoning.starts_with("LLM analysis: "));
        assert!(plan.entity_parameters_are_resolved());
    }

    #[tokio::test]
    async fn predictor_error_output_yields_low_confidence_navigate() {
        let planner = SingleCallPlanner::new(Arc::new(TimeoutPredictor), Arc::new(EmptySearcher), validator());
        let plan = planner.plan(&config(), "anything").await.unwrap();
        assert_eq!(plan.action_kind, ActionKind::Navigate);
        assert!(plan.confidence <= 0.1 + f64::EPSILON);
        assert!(!plan.reasoning.starts_with("LLM analysis: "));
    }

    #[tokio::test]
    async fn hallucinated_route_is_repaired_and_penalized() {
        let output = serde_json::json!({
            "intent": {"action_type": "navigate"},
            "entity_resolution": [{"entity_name": "james smith", "search_tables": ["users"], "search_fields": ["name"]}],
            "route_matching": {"resolved_route": "/totally/unknown/path", "parameters": []},
            "overall_confidence": 0.9,
            "reasoning": "confident but wrong",
        });
        let planner = SingleCallPlanner::new(Arc::new(FixedPredictor(output)), Arc::new(OneRowSearcher), validator());
        let plan = planner.plan(&config(), "show james smith").await.unwrap();
        assert_eq!(plan.route, "/person/u-42/overview");
        assert!((plan.confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn exhausted_repair_ladder_surfaces_invalid_plan() {
        let output = serde_json::json!({
            "intent": {"action_type": "navigate"},
            "entity_resolution": [],
            "route_matching": {"resolved_route": "/totally/unknown/path", "parameters": []},
            "overall_confidence": 0.9,
            "reasoning": "confident but wrong",
        });
        let planner = SingleCallPlanner::new(Arc::new(FixedPredictor(output)), Arc::new(EmptySearcher), Arc::new(RouteValidator::new(vec![])));
        let err = planner.plan(&config(), "anything").await.unwrap_err();
        assert!(matches!(err, PlanningError::InvalidPlan(_)));
    }
}
