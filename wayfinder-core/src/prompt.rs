//! Prompt Builder (spec.md §4.C5): renders a `SiteConfiguration` and the
//! user query into a single deterministic prompt.

use crate::model::SiteConfiguration;

/// Literal placeholder a predictor is told to emit wherever it cannot
/// yet know a real identifier. The planner substitutes this with a
/// resolved entity id (spec.md §4.C6 step 3).
pub const ENTITY_ID_PLACEHOLDER: &str = "ENTITY_ID_PLACEHOLDER";

/// Column names listed per table in the schema summary, beyond which
/// columns are elided with a trailing `...`.
const SCHEMA_COLUMN_LIMIT: usize = 8;

pub struct PromptBuilder<'a> {
    config: &'a SiteConfiguration,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(config: &'a SiteConfiguration) -> Self {
        Self { config }
    }

    fn schema_summary(&self) -> String {
        let mut tables: Vec<_> = self.config.database_schema.tables.values().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        let mut out = String::new();
        for table in tables {
            let mut cols: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
            let truncated = cols.len() > SCHEMA_COLUMN_LIMIT;
            cols.truncate(SCHEMA_COLUMN_LIMIT);
            out.push_str(&format!("  - {} ({})", table.name, cols.join(", ")));
            if truncated {
                out.push_str(", ...");
            }
            out.push('\n');
        }
        out
    }

    fn route_patterns_summary(&self) -> String {
        let mut out = String::new();
        for pattern in &self.config.route_patterns {
            out.push_str(&format!("  - {} : {}\n", pattern.name, pattern.template));
            out.push_str(&format!("    description: {}\n", pattern.description));
            if !pattern.intent_patterns.is_empty() {
                out.push_str(&format!("    examples: {}\n", pattern.intent_patterns.join(" | ")));
            }
            for (name, spec) in &pattern.parameters {
                let enum_note = spec
                    .enum_values
                    .as_ref()
                    .map(|v| format!(" one of [{}]", v.join(", ")))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "    param {name}: {:?}{enum_note}{}\n",
                    spec.param_type,
                    if spec.required { " (required)" } else { " (optional)" }
                ));
            }
        }
        out
    }

    /// Render the deterministic prompt for `query`. Two calls with the
    /// same `(config, query)` always produce byte-identical output.
    pub fn build(&self, query: &str) -> String {
        format!(
            "You are routing a natural language request for the \"{domain}\" application.\n\
             User query: \"{query}\"\n\n\
             Database schema (truncated):\n{schema}\n\
             Declared route patterns:\n{patterns}\n\
             Respond with a single JSON object with exactly these keys: \
             intent, entity_resolution, route_matching, overall_confidence, reasoning.\n\
             `route_matching.resolved_route` MUST conform to one of the route patterns above, \
             or use the declared fallback for this domain.\n\
             If you cannot yet know an entity's real identifier, emit the literal token \
             \"{placeholder}\" in its place; it will be substituted after entity resolution.\n",
            domain = self.config.domain,
            query = query,
            schema = self.schema_summary(),
            patterns = self.route_patterns_summary(),
            placeholder = ENTITY_ID_PLACEHOLDER,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnSpec, EntityDefinition, ParameterSpec, ParameterType, RoutePattern, SchemaSpec, TableSpec};
    use std::collections::HashMap;

    fn config() -> SiteConfiguration {
        let mut tables = HashMap::new();
        tables.insert(
            "users".to_string(),
            TableSpec {
                name: "users".into(),
                columns: vec![ColumnSpec { name: "id".into(), column_type: "uuid".into(), nullable: false }],
                primary_key: "id".into(),
                description: None,
            },
        );
        let mut entities = HashMap::new();
        entities.insert(
            "person".to_string(),
            EntityDefinition {
                name: "person".into(),
                table: "users".into(),
                description: "a person".into(),
                search_fields: vec!["name".into()],
                display_field: "name".into(),
                unique_identifier: "id".into(),
                related_entities: HashMap::new(),
                aliases: vec![],
            },
        );
        let mut parameters = HashMap::new();
        parameters.insert(
            "entity_id".to_string(),
            ParameterSpec { param_type: ParameterType::Uuid, required: true, enum_values: None, examples: vec![] },
        );
        SiteConfiguration {
            domain: "property management".into(),
            base_url: "http://localhost".into(),
            entities,
            route_patterns: vec![RoutePattern {
                name: "person_overview".into(),
                template: "/{entity_type}/{entity_id}/overview".into(),
                description: "view a person's overview page".into(),
                intent_patterns: vec!["show me james smith".into()],
                parameters,
                required_roles: None,
            }],
            database_schema: SchemaSpec { tables, relationships: HashMap::new() },
            semantic_mappings: HashMap::new(),
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        let cfg = config();
        let builder = PromptBuilder::new(&cfg);
        assert_eq!(builder.build("find james smith"), builder.build("find james smith"));
    }

    #[test]
    fn prompt_contains_placeholder_and_query() {
        let cfg = config();
        let builder = PromptBuilder::new(&cfg);
        let prompt = builder.build("find james smith");
        assert!(prompt.contains(ENTITY_ID_PLACEHOLDER));
        assert!(prompt.contains("find james smith"));
        assert!(prompt.contains("person_overview"));
    }
}
