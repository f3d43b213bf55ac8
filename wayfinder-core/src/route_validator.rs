//! Route Validator (spec.md §4.C7): compiles declared route patterns to
//! anchored regexes and repairs routes a predictor hallucinated.

use crate::model::{EntityMatch, RoutePattern};
use regex::Regex;
use std::collections::HashMap;

/// A `RoutePattern` plus its compiled, anchored matcher. Every `{name}`
/// segment becomes `[^/]+`.
pub struct CompiledPattern {
    pub pattern: RoutePattern,
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(pattern: RoutePattern) -> Self {
        let mut re = String::from("^");
        let mut chars = pattern.template.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    for c2 in chars.by_ref() {
                        if c2 == '}' {
                            break;
                        }
                    }
                    re.push_str("[^/]+");
                }
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');
        let regex = Regex::new(&re).expect("route template compiles to a valid regex");
        Self { pattern, regex }
    }

    pub fn is_match(&self, route: &str) -> bool {
        self.regex.is_match(route)
    }
}

/// Holds every declared pattern, pre-compiled once at startup.
pub struct RouteValidator {
    compiled: Vec<CompiledPattern>,
}

/// Outcome of validating a candidate route.
pub enum Validation {
    /// The route matched a declared pattern as-is.
    Valid { matched_pattern: String },
    /// The route did not match; a repair produced a valid substitute.
    /// `confidence_penalty` is always `0.3` per spec.md §4.C7/§4.C6.
    Repaired {
        route: String,
        matched_pattern: String,
        confidence_penalty: f64,
    },
    /// No repair produced a valid route.
    Failed,
}

impl RouteValidator {
    pub fn new(patterns: Vec<RoutePattern>) -> Self {
        Self {
            compiled: patterns.into_iter().map(CompiledPattern::compile).collect(),
        }
    }

    fn find_matching(&self, route: &str) -> Option<&CompiledPattern> {
        self.compiled.iter().find(|c| c.is_match(route))
    }

    /// Validate `route`, running the repair ladder on failure.
    /// `entities` is the set of entities resolved for this plan, used by
    /// repair step 1; `primary_entity_type` feeds repair step 2.
    pub fn validate(&self, route: &str, entities: &[EntityMatch]) -> Validation {
        if route.starts_with('/') {
            if let Some(compiled) = self.find_matching(route) {
                return Validation::Valid {
                    matched_pattern: compiled.pattern.name.clone(),
                };
            }
        }
        self.repair(entities)
    }

    fn repair(&self, entities: &[EntityMatch]) -> Validation {
        // Step 1: `/{entity_type}/{entity_id}/overview` for the primary
        // (first-resolved) entity.
        if let Some(primary) = entities.first() {
            let candidate = format!("/{}/{}/overview", primary.entity_type, primary.id);
            if let Some(compiled) = self.find_matching(&candidate) {
                return Validation::Repaired {
                    route: candidate,
                    matched_pattern: compiled.pattern.name.clone(),
                    confidence_penalty: 0.3,
                };
            }
        }

        // Step 2: first declared pattern whose name contains "search",
        // filled with the primary entity type.
        if let Some(compiled) = self
            .compiled
            .iter()
            .find(|c| c.pattern.name.contains("search"))
        {
            let primary_type = entities.first().map(|e| e.entity_type.as_str()).unwrap_or("item");
            let mut values = HashMap::new();
            for slot in compiled.pattern.template_slots() {
                values.insert(slot, primary_type.to_string());
            }
            let candidate = compiled.pattern.fill(&values);
            if compiled.is_match(&candidate) {
                return Validation::Repaired {
                    route: candidate,
                    matched_pattern: compiled.pattern.name.clone(),
                    confidence_penalty: 0.3,
                };
            }
        }

        // Step 3: first declared pattern, filled with each parameter's
        // first static example.
        if let Some(compiled) = self.compiled.first() {
            let mut values = HashMap::new();
            for slot in compiled.pattern.template_slots() {
                let example = compiled
                    .pattern
                    .parameters
                    .get(&slot)
                    .and_then(|spec| spec.examples.first())
                    .cloned()
                    .unwrap_or_else(|| "default".to_string());
                values.insert(slot, example);
            }
            let candidate = compiled.pattern.fill(&values);
            if compiled.is_match(&candidate) {
                return Validation::Repaired {
                    route: candidate,
                    matched_pattern: compiled.pattern.name.clone(),
                    confidence_penalty: 0.3,
                };
            }
        }

        Validation::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParameterSpec;
    use crate::model::ParameterType;
    use std::collections::HashMap as Map;

    fn pattern(name: &str, template: &str, params: &[(&str, Vec<&str>)]) -> RoutePattern {
        let mut parameters = Map::new();
        for (p, examples) in params {
            parameters.insert(
                p.to_string(),
                ParameterSpec {
                    param_type: ParameterType::String,
                    required: true,
                    enum_values: None,
                    examples: examples.iter().map(|s| s.to_string()).collect(),
                },
            );
        }
        RoutePattern {
            name: name.to_string(),
            template: template.to_string(),
            description: String::new(),
            intent_patterns: vec![],
            parameters,
            required_roles: None,
        }
    }

    fn entity(entity_type: &str, id: &str) -> EntityMatch {
        EntityMatch {
            id: id.to_string(),
            name: "whoever".to_string(),
            table: "users".to_string(),
            entity_type: entity_type.to_string(),
            confidence: 0.9,
            matched_fields: vec![],
            raw_data: Default::default(),
        }
    }

    #[test]
    fn valid_route_matches_without_repair() {
        let validator = RouteValidator::new(vec![pattern(
            "person_overview",
            "/{entity_type}/{entity_id}/overview",
            &[("entity_type", vec![]), ("entity_id", vec![])],
        )]);
        match validator.validate("/person/u-1/overview", &[]) {
            Validation::Valid { matched_pattern } => assert_eq!(matched_pattern, "person_overview"),
            _ => panic!("expected Valid"),
        }
    }

    #[test]
    fn hallucinated_route_repairs_via_entity_overview() {
        let validator = RouteValidator::new(vec![pattern(
            "overview",
            "/{entity_type}/{entity_id}/overview",
            &[("entity_type", vec![]), ("entity_id", vec![])],
        )]);
        let entities = vec![entity("landlord", "l-9")];
        match validator.validate("/weird/path", &entities) {
            Validation::Repaired { route, confidence_penalty, .. } => {
                assert_eq!(route, "/landlord/l-9/overview");
                assert_eq!(confidence_penalty, 0.3);
            }
            _ => panic!("expected Repaired"),
        }
    }

    #[test]
    fn falls_back_to_search_pattern_when_no_entity() {
        let validator = RouteValidator::new(vec![
            pattern("overview", "/{entity_type}/{entity_id}/overview", &[("entity_type", vec![]), ("entity_id", vec![])]),
            pattern("landlord_search", "/{entity_type}/search", &[("entity_type", vec![])]),
        ]);
        match validator.validate("/nonsense", &[]) {
            Validation::Repaired { route, matched_pattern, .. } => {
                assert_eq!(matched_pattern, "landlord_search");
                assert_eq!(route, "/item/search");
            }
            _ => panic!("expected Repaired via search fallback"),
        }
    }

    #[test]
    fn falls_back_to_static_examples_as_last_resort() {
        let validator = RouteValidator::new(vec![pattern(
            "only_pattern",
            "/{x}/static",
            &[("x", vec!["fallback"])],
        )]);
        match validator.validate("/nonsense", &[]) {
            Validation::Repaired { route, .. } => assert_eq!(route, "/fallback/static"),
            _ => panic!("expected Repaired via static defaults"),
        }
    }

    #[test]
    fn fails_when_no_pattern_can_be_satisfied() {
        let validator = RouteValidator::new(vec![]);
        assert!(matches!(validator.validate("/nonsense", &[]), Validation::Failed));
    }
}
