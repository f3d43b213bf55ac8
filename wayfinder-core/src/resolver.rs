//! Entity Resolver (spec.md §4.C4): turns a fuzzy name plus table/field
//! hints into ranked [`EntityMatch`] records via four ordered strategies.

use crate::model::EntityMatch;
use crate::ports::{RecordSearcher, RecordSearcherError, RecordRow};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for one Resolver call (spec.md §5).
pub const DEFAULT_RESOLVER_DEADLINE: Duration = Duration::from_secs(30);

/// One entity-search request, as handed to the resolver by the planner
/// after reading the predictor's `entity_resolution` directives.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub entity_name: String,
    pub tables: Vec<String>,
    pub search_fields: Vec<String>,
    /// Informational only; no strategy currently joins across tables.
    pub join_hint: Option<String>,
    pub max_results: usize,
    pub min_confidence: f64,
    pub deadline: Duration,
}

impl ResolveRequest {
    pub fn new(entity_name: impl Into<String>, tables: Vec<String>, search_fields: Vec<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            tables,
            search_fields,
            join_hint: None,
            max_results: 5,
            min_confidence: 0.5,
            deadline: DEFAULT_RESOLVER_DEADLINE,
        }
    }
}

/// A small, hand-coded map from table name to an informational entity
/// type, with pluralization stripped as a fallback (spec.md §4.C4).
fn infer_entity_type(table: &str) -> String {
    let known: &[(&str, &str)] = &[
        ("users", "person"),
        ("landlords", "landlord"),
        ("tenants", "tenant"),
        ("properties", "property"),
        ("leases", "lease"),
        ("organizations", "organization"),
        ("documents", "document"),
    ];
    if let Some((_, kind)) = known.iter().find(|(t, _)| *t == table) {
        return kind.to_string();
    }
    table
        .strip_suffix("ies")
        .map(|s| format!("{s}y"))
        .or_else(|| table.strip_suffix('s').map(|s| s.to_string()))
        .unwrap_or_else(|| table.to_string())
}

/// Confidence scoring for a single (field value, query) pair, both
/// already lowercased by the caller. spec.md §4.C4:
/// `v == q -> 0.95`; `q ⊂ v` or `v ⊂ q -> 0.8`; shared token -> `0.6`;
/// else `0`.
fn confidence_score(value: &str, query: &str) -> f64 {
    if value == query {
        return 0.95;
    }
    if !query.is_empty() && (value.contains(query) || query.contains(value)) {
        return 0.8;
    }
    let value_tokens: HashSet<&str> = value.split_whitespace().collect();
    let query_tokens: HashSet<&str> = query.split_whitespace().collect();
    if value_tokens.intersection(&query_tokens).next().is_some() {
        return 0.6;
    }
    0.0
}

/// Best confidence for `query` across the searched fields of one row,
/// returning the matched field names alongside the score.
fn score_row(row: &RecordRow, fields: &[String], query: &str) -> (f64, Vec<String>) {
    let query = query.to_lowercase();
    let mut best = 0.0f64;
    let mut matched = Vec::new();
    for field in fields {
        let Some(value) = row.get(field).and_then(|v| v.as_str()) else {
            continue;
        };
        let score = confidence_score(&value.to_lowercase(), &query);
        if score > 0.0 {
            if score > best {
                best = score;
            }
            matched.push(field.clone());
        }
    }
    (best, matched)
}

fn row_id(row: &RecordRow) -> Option<String> {
    for key in ["id", "uuid", "pk"] {
        if let Some(v) = row.get(key) {
            return Some(match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string().trim_matches('"').to_string(),
            });
        }
    }
    None
}

fn row_display_name(row: &RecordRow, fields: &[String]) -> String {
    for field in fields {
        if let Some(v) = row.get(field).and_then(|v| v.as_str()) {
            return v.to_string();
        }
    }
    row_id(row).unwrap_or_default()
}

pub struct EntityResolver {
    searcher: Arc<dyn RecordSearcher>,
}

impl EntityResolver {
    pub fn new(searcher: Arc<dyn RecordSearcher>) -> Self {
        Self { searcher }
    }

    async fn run_search(&self, query: &str, req: &ResolveRequest) -> Vec<RecordRow> {
        let call = self
            .searcher
            .search(query, &req.tables, &req.search_fields, req.max_results.max(10));
        let result = match tokio::time::timeout(req.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(RecordSearcherError::Deadline),
        };
        match result {
            Ok(rows) => rows,
            Err(err) => {
                match &err {
                    RecordSearcherError::UnknownTable(table) => {
                        tracing::warn!(table, "entity resolver: unknown table, strategy skipped");
                    }
                    _ => tracing::debug!(%err, "entity resolver: strategy search failed"),
                }
                Vec::new()
            }
        }
    }

    fn build_match(&self, table: &str, row: &RecordRow, confidence: f64, matched: Vec<String>, fields: &[String]) -> Option<EntityMatch> {
        let id = row_id(row)?;
        Some(EntityMatch {
            id,
            name: row_display_name(row, fields),
            table: table.to_string(),
            entity_type: infer_entity_type(table),
            confidence,
            matched_fields: matched,
            raw_data: row.clone(),
        })
    }

    /// Strategy 1: exact match. Confidence fixed at 0.95.
    async fn exact_match(&self, req: &ResolveRequest) -> Vec<EntityMatch> {
        let rows = self.run_search(&req.entity_name, req).await;
        let query = req.entity_name.to_lowercase();
        let mut out = Vec::new();
        for row in &rows {
            let (score, matched) = score_row(row, &req.search_fields, &query);
            if score >= 0.95 {
                if let Some(m) = self.build_match(&table_of(row, &req.tables), row, 0.95, matched, &req.search_fields) {
                    out.push(m);
                }
            }
        }
        out
    }

    /// Strategy 2: fuzzy match, probing the name lowercased, with
    /// whitespace removed, and by first token only.
    async fn fuzzy_match(&self, req: &ResolveRequest) -> Vec<EntityMatch> {
        let lowered = req.entity_name.to_lowercase();
        let no_whitespace: String = lowered.split_whitespace().collect();
        let first_token = lowered.split_whitespace().next().unwrap_or(&lowered).to_string();

        let mut out = Vec::new();
        for probe in [lowered.clone(), no_whitespace, first_token] {
            if probe.is_empty() {
                continue;
            }
            let rows = self.run_search(&probe, req).await;
            for row in &rows {
                let (score, matched) = score_row(row, &req.search_fields, &lowered);
                if (0.6..0.95).contains(&score) {
                    if let Some(m) =
                        self.build_match(&table_of(row, &req.tables), row, score, matched, &req.search_fields)
                    {
                        out.push(m);
                    }
                }
            }
        }
        out
    }

    /// Strategy 3: semantic match. No embedding backend is wired in this
    /// repo, so this always yields nothing (spec.md §4.C4).
    async fn semantic_match(&self, _req: &ResolveRequest) -> Vec<EntityMatch> {
        Vec::new()
    }

    /// Strategy 4: full-text match over tokens of length > 2, confidence
    /// capped at `0.7 * fuzzy_score`.
    async fn full_text_match(&self, req: &ResolveRequest) -> Vec<EntityMatch> {
        let lowered = req.entity_name.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().filter(|t| t.len() > 2).collect();
        let mut out = Vec::new();
        for token in tokens {
            let rows = self.run_search(token, req).await;
            for row in &rows {
                let (fuzzy_score, matched) = score_row(row, &req.search_fields, token);
                let capped = 0.7 * fuzzy_score;
                if capped > 0.0 {
                    if let Some(m) = self.build_match(&table_of(row, &req.tables), row, capped, matched, &req.search_fields) {
                        out.push(m);
                    }
                }
            }
        }
        out
    }

    /// Run strategies 1..4 in order, stopping early once a strategy
    /// yields a match with confidence > 0.8. Results are deduplicated by
    /// `(table, id)`, sorted by descending confidence, and truncated to
    /// `max_results`.
    pub async fn search_entity(&self, req: &ResolveRequest) -> Vec<EntityMatch> {
        let mut all = Vec::new();

        let exact = self.exact_match(req).await;
        let exact_has_strong = exact.iter().any(|m| m.confidence > 0.8);
        all.extend(exact);

        if !exact_has_strong {
            let fuzzy = self.fuzzy_match(req).await;
            let fuzzy_has_strong = fuzzy.iter().any(|m| m.confidence > 0.8);
            all.extend(fuzzy);

            if !fuzzy_has_strong {
                let semantic = self.semantic_match(req).await;
                let semantic_has_strong = semantic.iter().any(|m| m.confidence > 0.8);
                all.extend(semantic);

                if !semantic_has_strong {
                    all.extend(self.full_text_match(req).await);
                }
            }
        }

        let mut seen = HashSet::new();
        all.retain(|m| seen.insert((m.table.clone(), m.id.clone())));
        all.retain(|m| m.confidence >= req.min_confidence);
        all.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        all.truncate(req.max_results);
        all
    }
}

/// `RecordSearcher::search` does not tell us which table a row came
/// from when multiple tables are searched at once; for a single-table
/// request (the common case) we can name it directly, otherwise we fall
/// back to the row's own `table`/`_table` hint if the backend set one.
fn table_of(row: &RecordRow, tables: &[String]) -> String {
    if let Some(serde_json::Value::String(t)) = row.get("_table") {
        return t.clone();
    }
    if tables.len() == 1 {
        return tables[0].clone();
    }
    tables.first().cloned().unwrap_or_default()
}
