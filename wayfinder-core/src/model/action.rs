use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of action kinds the router can suggest.
///
/// Unknown wire values at the Predictor boundary coerce to `Navigate`
/// rather than raising — see [`ActionKind::from_wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Navigate,
    Query,
    Create,
    Edit,
    Delete,
}

impl ActionKind {
    /// Coerce an arbitrary, possibly-uppercase wire string into a closed
    /// variant, defaulting to `Navigate` for anything unrecognized.
    pub fn from_wire(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "navigate" => ActionKind::Navigate,
            "query" => ActionKind::Query,
            "create" => ActionKind::Create,
            "edit" => ActionKind::Edit,
            "delete" => ActionKind::Delete,
            _ => ActionKind::Navigate,
        }
    }
}

impl Default for ActionKind {
    fn default() -> Self {
        ActionKind::Navigate
    }
}

/// Closed set of route parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Uuid,
    Slug,
    Enum,
}

impl ParameterType {
    pub fn from_wire(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "integer" | "int" => ParameterType::Integer,
            "uuid" => ParameterType::Uuid,
            "slug" => ParameterType::Slug,
            "enum" => ParameterType::Enum,
            _ => ParameterType::String,
        }
    }
}

impl Default for ParameterType {
    fn default() -> Self {
        ParameterType::String
    }
}

/// How a resolved [`RouteParameter`]'s value was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterSource {
    Entity,
    Literal,
    Inferred,
    Llm,
}

impl Default for ParameterSource {
    fn default() -> Self {
        ParameterSource::Llm
    }
}

impl ParameterSource {
    pub fn from_wire(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "entity" => ParameterSource::Entity,
            "literal" => ParameterSource::Literal,
            "inferred" => ParameterSource::Inferred,
            _ => ParameterSource::Llm,
        }
    }
}

/// One filled route parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteParameter {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub source: ParameterSource,
}

/// One entity resolved from persistent storage and folded into an
/// `ActionPlan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub id: String,
    pub name: String,
    pub table: String,
    pub entity_type: String,
    pub confidence: f64,
    pub matched_fields: Vec<String>,
    #[serde(default)]
    pub raw_data: HashMap<String, serde_json::Value>,
}

/// A shallow `ActionPlan` used for `alternatives`: by contract it carries
/// no further nested alternatives (spec.md §9, "Recursive alternatives").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlanSummary {
    pub action_kind: ActionKind,
    pub route: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// The unit of planning output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub action_kind: ActionKind,
    pub route: String,
    pub confidence: f64,
    pub parameters: Vec<RouteParameter>,
    pub entities: Vec<EntityMatch>,
    pub matched_pattern: String,
    pub reasoning: String,
    #[serde(default)]
    pub alternatives: Vec<ActionPlanSummary>,
}

impl ActionPlan {
    pub fn to_summary(&self) -> ActionPlanSummary {
        ActionPlanSummary {
            action_kind: self.action_kind,
            route: self.route.clone(),
            confidence: self.confidence,
            reasoning: self.reasoning.clone(),
        }
    }

    /// Invariant check from spec.md §3: every entity referenced by a
    /// parameter with `source = entity` must appear in `entities`.
    pub fn entity_parameters_are_resolved(&self) -> bool {
        let known_ids: std::collections::HashSet<&str> =
            self.entities.iter().map(|e| e.id.as_str()).collect();
        self.parameters
            .iter()
            .filter(|p| p.source == ParameterSource::Entity)
            .all(|p| known_ids.contains(p.value.as_str()))
    }
}
