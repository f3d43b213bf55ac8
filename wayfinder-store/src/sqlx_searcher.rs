//! SQLite-backed `RecordSearcher` (spec.md §4.C3) assembling a dynamic
//! `LIKE`-based query per call.
//!
//! `r2e-data/src/query.rs`'s `QueryBuilder` is the grounding for the
//! identifier-validation and bind-parameter discipline here, but its
//! `Condition` list is implicitly AND-joined — this port needs "match
//! `query` against *any* of `fields`", an OR group the builder has no
//! vocabulary for, so the `WHERE` clause is assembled directly rather
//! than through `QueryBuilder` itself (see DESIGN.md).

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::collections::{HashMap, HashSet};
use wayfinder_core::{RecordRow, RecordSearcher, RecordSearcherError};

/// A conservative identifier pattern: ASCII letters, digits, underscore,
/// must not start with a digit. Table/column names come from
/// configuration and predictor output, never directly from end users,
/// but this is cheap enough to always apply before string-interpolating
/// a name into SQL.
fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct SqlxRecordSearcher {
    pool: SqlitePool,
    restricted: HashMap<String, HashSet<String>>,
}

impl SqlxRecordSearcher {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, restricted: HashMap::new() }
    }

    pub fn with_restricted_columns(mut self, table: &str, columns: &[&str]) -> Self {
        self.restricted.entry(table.to_string()).or_default().extend(columns.iter().map(|c| c.to_string()));
        self
    }

    fn restricted_for(&self, table: &str) -> &HashSet<String> {
        static EMPTY: std::sync::OnceLock<HashSet<String>> = std::sync::OnceLock::new();
        self.restricted.get(table).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    async fn search_one_table(&self, table: &str, fields: &[String], needle: &str, limit: i64) -> Result<Vec<(bool, RecordRow)>, RecordSearcherError> {
        if !valid_identifier(table) {
            return Err(RecordSearcherError::Backend(format!("invalid table identifier '{table}'")));
        }
        let restricted = self.restricted_for(table);
        let searchable: Vec<&String> = fields.iter().filter(|f| !restricted.contains(f.as_str()) && valid_identifier(f)).collect();
        if searchable.is_empty() {
            return Ok(Vec::new());
        }

        let clause = searchable.iter().map(|f| format!("{f} LIKE ?")).collect::<Vec<_>>().join(" OR ");
        let sql = format!("SELECT * FROM {table} WHERE {clause} LIMIT ?");

        let mut query = sqlx::query(&sql);
        let pattern = format!("%{needle}%");
        for _ in &searchable {
            query = query.bind(pattern.clone());
        }
        query = query.bind(limit);

        let rows = query.fetch_all(&self.pool).await.map_err(|e| classify_error(table, e))?;

        let first_field = searchable.first().map(|f| f.as_str());
        let mut out = Vec::with_capacity(rows.len());
        for sql_row in &rows {
            let mut projected = row_to_record(sql_row, restricted);
            projected.insert("_table".to_string(), serde_json::Value::String(table.to_string()));
            let exact = first_field.is_some_and(|f| {
                projected.get(f).map(|v| value_text(v).to_lowercase()) == Some(needle.to_lowercase())
            });
            out.push((exact, projected));
        }
        Ok(out)
    }
}

fn classify_error(table: &str, err: sqlx::Error) -> RecordSearcherError {
    let message = err.to_string();
    if message.contains("no such table") {
        RecordSearcherError::UnknownTable(table.to_string())
    } else {
        RecordSearcherError::Backend(message)
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow, restricted: &HashSet<String>) -> RecordRow {
    let mut record = RecordRow::new();
    for column in row.columns() {
        let name = column.name();
        if restricted.contains(name) {
            continue;
        }
        let value = decode_column(row, column);
        record.insert(name.to_string(), value);
    }
    record
}

fn decode_column(row: &sqlx::sqlite::SqliteRow, column: &sqlx::sqlite::SqliteColumn) -> serde_json::Value {
    let ordinal = column.ordinal();
    let Ok(raw) = row.try_get_raw(ordinal) else {
        return serde_json::Value::Null;
    };
    if raw.is_null() {
        return serde_json::Value::Null;
    }
    match column.type_info().name() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(ordinal).map(serde_json::Value::from).unwrap_or(serde_json::Value::Null),
        "REAL" => row.try_get::<f64, _>(ordinal).ok().and_then(serde_json::Number::from_f64).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
        _ => row.try_get::<String, _>(ordinal).map(serde_json::Value::String).unwrap_or(serde_json::Value::Null),
    }
}

#[async_trait]
impl RecordSearcher for SqlxRecordSearcher {
    async fn search(
        &self,
        query: &str,
        tables: &[String],
        fields: &[String],
        limit: usize,
    ) -> Result<Vec<RecordRow>, RecordSearcherError> {
        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        for table in tables {
            matches.extend(self.search_one_table(table, fields, &needle, limit as i64).await?);
        }
        matches.sort_by(|a, b| b.0.cmp(&a.0));
        matches.truncate(limit);
        Ok(matches.into_iter().map(|(_, row)| row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE users (id TEXT PRIMARY KEY, name TEXT, ssn TEXT)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO users (id, name, ssn) VALUES ('u-1', 'James Smith', '000-00-0000')").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO users (id, name, ssn) VALUES ('u-2', 'Jane Doe', '111-11-1111')").execute(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn substring_match_finds_rows() {
        let searcher = SqlxRecordSearcher::new(seeded_pool().await);
        let results = searcher.search("smith", &["users".to_string()], &["name".to_string()], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], "u-1");
    }

    #[tokio::test]
    async fn unknown_table_raises() {
        let searcher = SqlxRecordSearcher::new(seeded_pool().await);
        let err = searcher.search("q", &["ghost".to_string()], &["name".to_string()], 10).await.unwrap_err();
        assert_eq!(err, RecordSearcherError::UnknownTable("ghost".to_string()));
    }

    #[tokio::test]
    async fn restricted_columns_are_neither_searched_nor_returned() {
        let searcher = SqlxRecordSearcher::new(seeded_pool().await).with_restricted_columns("users", &["ssn"]);
        let results = searcher.search("000-00-0000", &["users".to_string()], &["ssn".to_string()], 10).await.unwrap();
        assert!(results.is_empty());

        let results = searcher.search("smith", &["users".to_string()], &["name".to_string()], 10).await.unwrap();
        assert!(!results[0].contains_key("ssn"));
    }

    #[tokio::test]
    async fn invalid_identifier_is_rejected_without_touching_the_database() {
        let searcher = SqlxRecordSearcher::new(seeded_pool().await);
        let err = searcher.search("x", &["users; DROP TABLE users;--".to_string()], &["name".to_string()], 10).await.unwrap_err();
        assert!(matches!(err, RecordSearcherError::Backend(_)));
    }
}
