//! In-memory `RecordSearcher` (spec.md §4.C3): a fixed table map, useful
//! for demos and the entity-resolver unit tests that otherwise need a
//! live database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use wayfinder_core::{RecordRow, RecordSearcher, RecordSearcherError};

struct Table {
    rows: Vec<RecordRow>,
    restricted_columns: HashSet<String>,
}

/// A `RecordSearcher` backed by an in-process `HashMap` of tables. Rows
/// returned are tagged with a `"_table"` key so callers (the entity
/// resolver's `table_of`) can recover which table a row came from when
/// more than one was searched at once.
pub struct InMemoryRecordSearcher {
    tables: HashMap<String, Table>,
}

impl InMemoryRecordSearcher {
    pub fn new() -> Self {
        Self { tables: HashMap::new() }
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<RecordRow>) -> Self {
        self.tables.insert(name.into(), Table { rows, restricted_columns: HashSet::new() });
        self
    }

    /// Columns in `name` that are never searched and never returned —
    /// spec.md §4.C3's restricted-columns policy.
    pub fn with_restricted_columns(mut self, name: &str, columns: &[&str]) -> Self {
        if let Some(table) = self.tables.get_mut(name) {
            table.restricted_columns.extend(columns.iter().map(|c| c.to_string()));
        }
        self
    }
}

impl Default for InMemoryRecordSearcher {
    fn default() -> Self {
        Self::new()
    }
}

fn field_value_contains(row: &RecordRow, field: &str, needle: &str) -> bool {
    match row.get(field) {
        Some(serde_json::Value::String(s)) => s.to_lowercase().contains(needle),
        Some(other) => other.to_string().to_lowercase().contains(needle),
        None => false,
    }
}

fn field_value_equals(row: &RecordRow, field: &str, needle: &str) -> bool {
    match row.get(field) {
        Some(serde_json::Value::String(s)) => s.to_lowercase() == needle,
        Some(other) => other.to_string().trim_matches('"').to_lowercase() == needle,
        None => false,
    }
}

#[async_trait]
impl RecordSearcher for InMemoryRecordSearcher {
    async fn search(
        &self,
        query: &str,
        tables: &[String],
        fields: &[String],
        limit: usize,
    ) -> Result<Vec<RecordRow>, RecordSearcherError> {
        let needle = query.to_lowercase();
        let mut matches: Vec<(bool, RecordRow)> = Vec::new();

        for table_name in tables {
            let table = self.tables.get(table_name).ok_or_else(|| RecordSearcherError::UnknownTable(table_name.clone()))?;

            let searchable_fields: Vec<&String> = fields.iter().filter(|f| !table.restricted_columns.contains(*f)).collect();
            let first_field = searchable_fields.first().copied();

            for row in &table.rows {
                let is_match = searchable_fields.iter().any(|f| row.contains_key(f.as_str()) && field_value_contains(row, f, &needle));
                if !is_match {
                    continue;
                }
                let exact_on_first = first_field.is_some_and(|f| field_value_equals(row, f, &needle));

                let mut projected: RecordRow = row
                    .iter()
                    .filter(|(k, _)| !table.restricted_columns.contains(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                projected.insert("_table".to_string(), serde_json::Value::String(table_name.clone()));

                matches.push((exact_on_first, projected));
            }
        }

        matches.sort_by(|a, b| b.0.cmp(&a.0));
        matches.truncate(limit);
        Ok(matches.into_iter().map(|(_, row)| row).collect())
    }
}
