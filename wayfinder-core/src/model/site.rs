use crate::model::action::ParameterType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Declarative description of one route parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
    #[serde(default)]
    pub examples: Vec<String>,
}

fn default_required() -> bool {
    true
}

/// A URL shape with typed `{name}` parameter slots, plus the natural
/// language exemplars used to teach a predictor that shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePattern {
    pub name: String,
    pub template: String,
    pub description: String,
    #[serde(default)]
    pub intent_patterns: Vec<String>,
    #[serde(default)]
    pub parameters: HashMap<String, ParameterSpec>,
    #[serde(default)]
    pub required_roles: Option<Vec<String>>,
}

impl RoutePattern {
    /// `{name}` segments referenced by the template string, in order of
    /// appearance.
    pub fn template_slots(&self) -> Vec<String> {
        let mut slots = Vec::new();
        let mut chars = self.template.char_indices().peekable();
        while let Some((_, c)) = chars.next() {
            if c == '{' {
                let mut name = String::new();
                for (_, c2) in chars.by_ref() {
                    if c2 == '}' {
                        break;
                    }
                    name.push(c2);
                }
                slots.push(name);
            }
        }
        slots
    }

    pub fn allows_role(&self, role: Option<&str>) -> bool {
        match &self.required_roles {
            None => true,
            Some(roles) => match role {
                Some(r) => roles.iter().any(|allowed| allowed == r),
                None => false,
            },
        }
    }

    /// Render the template with the given substitutions, leaving any
    /// unfilled `{name}` slot as-is.
    pub fn fill(&self, values: &HashMap<String, String>) -> String {
        let mut out = self.template.clone();
        for slot in self.template_slots() {
            if let Some(v) = values.get(&slot) {
                out = out.replace(&format!("{{{slot}}}"), v);
            }
        }
        out
    }
}

/// A named logical entity backed by a row (or join of rows) in the
/// tabular store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub table: String,
    pub description: String,
    pub search_fields: Vec<String>,
    pub display_field: String,
    pub unique_identifier: String,
    #[serde(default)]
    pub related_entities: HashMap<String, String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Structural description of the backing store: tables with typed
/// columns, primary keys, and foreign-key relationships expressed as
/// `"tableA.col" -> "tableB.col"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub tables: HashMap<String, TableSpec>,
    #[serde(default)]
    pub relationships: HashMap<String, String>,
}

/// Top-level, immutable application configuration. Loaded once at
/// startup (see `wayfinder-config`) and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfiguration {
    pub domain: String,
    pub base_url: String,
    pub entities: HashMap<String, EntityDefinition>,
    pub route_patterns: Vec<RoutePattern>,
    pub database_schema: SchemaSpec,
    #[serde(default)]
    pub semantic_mappings: HashMap<String, Vec<String>>,
}

/// Startup-time invariant violations (spec.md §4.C1). These abort the
/// process — see `wayfinder-config::loader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    UnknownTemplateParameter { pattern: String, name: String },
    DuplicatePatternName(String),
    EnumParameterMissingValues { pattern: String, parameter: String },
    UnknownEntityTable { entity: String, table: String },
    RestrictedIdentifierColumn { entity: String, column: String },
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::UnknownTemplateParameter { pattern, name } => write!(
                f,
                "route pattern '{pattern}' references undeclared parameter '{name}'"
            ),
            ConfigurationError::DuplicatePatternName(name) => {
                write!(f, "duplicate route pattern name '{name}'")
            }
            ConfigurationError::EnumParameterMissingValues { pattern, parameter } => write!(
                f,
                "route pattern '{pattern}' parameter '{parameter}' is type enum but has no enum_values"
            ),
            ConfigurationError::UnknownEntityTable { entity, table } => write!(
                f,
                "entity '{entity}' references unknown table '{table}'"
            ),
            ConfigurationError::RestrictedIdentifierColumn { entity, column } => write!(
                f,
                "entity '{entity}' unique identifier column '{column}' cannot be a restricted column"
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl SiteConfiguration {
    /// Validate every invariant named in spec.md §4.C1. Does not check
    /// restricted-columns interaction with identifier columns — that
    /// check runs once a `RecordSearcher` backend (which owns the
    /// restricted-columns policy) is attached, via
    /// [`SiteConfiguration::validate_against_restricted_columns`].
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen_names = HashSet::new();
        for pattern in &self.route_patterns {
            if !seen_names.insert(pattern.name.clone()) {
                return Err(ConfigurationError::DuplicatePatternName(pattern.name.clone()));
            }
            for slot in pattern.template_slots() {
                if !pattern.parameters.contains_key(&slot) {
                    return Err(ConfigurationError::UnknownTemplateParameter {
                        pattern: pattern.name.clone(),
                        name: slot,
                    });
                }
            }
            for (name, spec) in &pattern.parameters {
                if spec.param_type == ParameterType::Enum && spec.enum_values.is_none() {
                    return Err(ConfigurationError::EnumParameterMissingValues {
                        pattern: pattern.name.clone(),
                        parameter: name.clone(),
                    });
                }
            }
        }
        for (name, entity) in &self.entities {
            if !self.database_schema.tables.contains_key(&entity.table) {
                return Err(ConfigurationError::UnknownEntityTable {
                    entity: name.clone(),
                    table: entity.table.clone(),
                });
            }
        }
        Ok(())
    }

    /// spec.md §9 Open Question 2: reject configurations where an
    /// entity's unique identifier column is itself restricted by a
    /// backend's restricted-columns policy.
    pub fn validate_against_restricted_columns(
        &self,
        restricted: &HashMap<String, HashSet<String>>,
    ) -> Result<(), ConfigurationError> {
        for (name, entity) in &self.entities {
            if let Some(cols) = restricted.get(&entity.table) {
                if cols.contains(&entity.unique_identifier) {
                    return Err(ConfigurationError::RestrictedIdentifierColumn {
                        entity: name.clone(),
                        column: entity.unique_identifier.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn find_pattern(&self, name: &str) -> Option<&RoutePattern> {
        self.route_patterns.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(template: &str, params: &[&str]) -> RoutePattern {
        let mut parameters = HashMap::new();
        for p in params {
            parameters.insert(
                p.to_string(),
                ParameterSpec {
                    param_type: ParameterType::String,
                    required: true,
                    enum_values: None,
                    examples: vec![],
                },
            );
        }
        RoutePattern {
            name: template.to_string(),
            template: template.to_string(),
            description: String::new(),
            intent_patterns: vec![],
            parameters,
            required_roles: None,
        }
    }

    #[test]
    fn template_slots_extracts_names_in_order() {
        let p = pattern("/{entity_type}/{entity_id}/{view_type}", &[]);
        assert_eq!(p.template_slots(), vec!["entity_type", "entity_id", "view_type"]);
    }

    #[test]
    fn validate_rejects_unknown_template_parameter() {
        let mut cfg = empty_config();
        cfg.route_patterns.push(pattern("/{entity_type}/overview", &[]));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigurationError::UnknownTemplateParameter { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_pattern_names() {
        let mut cfg = empty_config();
        let mut a = pattern("/a", &[]);
        a.name = "dup".into();
        let mut b = pattern("/b", &[]);
        b.name = "dup".into();
        cfg.route_patterns.push(a);
        cfg.route_patterns.push(b);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigurationError::DuplicatePatternName(_))
        ));
    }

    #[test]
    fn allows_role_with_no_restriction() {
        let p = pattern("/open", &[]);
        assert!(p.allows_role(None));
        assert!(p.allows_role(Some("anyone")));
    }

    #[test]
    fn allows_role_enforces_required_roles() {
        let mut p = pattern("/admin/{x}", &["x"]);
        p.required_roles = Some(vec!["admin".into()]);
        assert!(!p.allows_role(Some("user")));
        assert!(!p.allows_role(None));
        assert!(p.allows_role(Some("admin")));
    }

    fn empty_config() -> SiteConfiguration {
        SiteConfiguration {
            domain: "test".into(),
            base_url: "http://localhost".into(),
            entities: HashMap::new(),
            route_patterns: vec![],
            database_schema: SchemaSpec::default(),
            semantic_mappings: HashMap::new(),
        }
    }
}
