//! Structural pattern derivation for the Tier-2 cache (spec.md §4.C9).
//!
//! An entity-bearing `ActionPlan` is still eligible for structural
//! caching: every `RouteParameter` with `source = entity` is rewritten
//! to an `{ENTITY_ID_i}` placeholder paired with the query token that
//! named it (table + matched fields carried along), so a structural hit
//! re-resolves that token through the Entity Resolver instead of reusing
//! the original entity's id for a differently-named query.

use crate::model::{ActionPlan, EntityMatch, ParameterSource};
use crate::resolver::{EntityResolver, ResolveRequest};
use regex::Regex;
use std::collections::HashMap;

fn strip_possessive(token: &str) -> &str {
    token.strip_suffix("'s").unwrap_or(token)
}

/// One query token rewritten to a typed placeholder, in the order it
/// was encountered.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderSlot {
    pub token: String,
    pub original: String,
}

/// Classify one token into the priority-ordered families
/// `routes.py::_extract_structural_pattern` uses: numbers, possessive
/// names, bare-capitalized names, then lowercase words.
/// `templatize_query` only ever runs on normalizer output, which C8
/// lowercases unconditionally — so a trailing `'s` is the strongest
/// signal left that a token names a person rather than a common noun;
/// the bare-capitalized branch below only fires for callers (tests, or
/// callers that bypass `normalize_query`) that hand it mixed-case text.
fn classify_token(token: &str) -> Option<&'static str> {
    if token.chars().all(|c| c.is_ascii_digit()) && !token.is_empty() {
        return Some("NUMBER");
    }
    if let Some(base) = token.strip_suffix("'s") {
        if !base.is_empty() && base.chars().all(|c| c.is_ascii_alphabetic()) {
            return Some("PERSON");
        }
    }
    if token.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        return Some("PERSON");
    }
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_lowercase()) {
        return Some("WORD");
    }
    None
}

/// Rewrite `normalized_query` token-by-token into a templated string
/// with typed placeholders, recording each slot's original value.
pub fn templatize_query(normalized_query: &str) -> (String, Vec<PlaceholderSlot>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut slots = Vec::new();
    let mut out_tokens = Vec::new();

    for token in normalized_query.split_whitespace() {
        match classify_token(token) {
            Some(kind) => {
                let idx = counts.entry(kind).or_insert(0);
                let placeholder = format!("{{{kind}_{idx}}}");
                *idx += 1;
                slots.push(PlaceholderSlot {
                    token: placeholder.clone(),
                    original: token.to_string(),
                });
                out_tokens.push(placeholder);
            }
            None => out_tokens.push(token.to_string()),
        }
    }

    (out_tokens.join(" "), slots)
}

fn replace_literal_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let re = Regex::new(&format!("(?i){}", regex::escape(needle))).expect("escaped literal compiles");
    re.replace_all(haystack, replacement).into_owned()
}

/// One entity-sourced parameter rewritten to a placeholder, paired with
/// everything needed to re-resolve it through the Entity Resolver (C4)
/// at reconstruction time: which query placeholder named it, and the
/// table/fields the original resolution searched.
#[derive(Debug, Clone)]
pub struct EntityResolutionSlot {
    pub entity_id_token: String,
    pub query_token: String,
    pub table: String,
    pub search_fields: Vec<String>,
}

/// A stored Tier-2 entry: the templated query/route key plus an
/// `ActionPlan` with the same placeholders substituted into its route
/// and non-entity parameter values, plus the entity slots (if any)
/// needed to refill entity-sourced parameters on reconstruction.
#[derive(Debug, Clone)]
pub struct StructuralEntry {
    pub templated_query: String,
    pub templated_route: String,
    pub plan: ActionPlan,
    pub entity_slots: Vec<EntityResolutionSlot>,
}

/// Returns `None` when `plan` is not eligible for structural caching: an
/// unresolved route, or an entity-sourced parameter that can't be
/// confidently paired with the query token that named it (matched by
/// comparing the entity's resolved name against each possessive/person
/// query slot, case-insensitively).
pub fn derive_entry(normalized_query: &str, plan: &ActionPlan) -> Option<StructuralEntry> {
    if !plan.route.starts_with('/') || plan.route.contains('{') {
        return None;
    }

    let (templated_query, slots) = templatize_query(normalized_query);
    let person_slots: Vec<&PlaceholderSlot> = slots.iter().filter(|s| s.token.starts_with("{PERSON_")).collect();

    let mut templated_route = plan.route.clone();
    let mut stored_plan = plan.clone();
    let mut entity_slots = Vec::new();
    let mut used_person_slots: Vec<&str> = Vec::new();
    let mut consumed_entity_ids: Vec<String> = Vec::new();

    for param in &mut stored_plan.parameters {
        if param.source != ParameterSource::Entity {
            continue;
        }
        let entity = plan.entities.iter().find(|e| e.id == param.value)?;
        let query_slot = person_slots
            .iter()
            .find(|s| !used_person_slots.contains(&s.token.as_str()) && strip_possessive(&s.original).eq_ignore_ascii_case(&entity.name))
            .or_else(|| {
                person_slots.iter().find(|s| {
                    !used_person_slots.contains(&s.token.as_str())
                        && entity.name.to_lowercase().split_whitespace().next() == Some(strip_possessive(&s.original))
                })
            })?;
        used_person_slots.push(query_slot.token.as_str());

        let id_token = format!("{{ENTITY_ID_{}}}", entity_slots.len());
        if templated_route.contains(&param.value) {
            templated_route = templated_route.replace(&param.value, &id_token);
        }
        entity_slots.push(EntityResolutionSlot {
            entity_id_token: id_token.clone(),
            query_token: query_slot.token.clone(),
            table: entity.table.clone(),
            search_fields: entity.matched_fields.clone(),
        });
        consumed_entity_ids.push(entity.id.clone());
        param.value = id_token;
    }

    stored_plan.entities.retain(|e| !consumed_entity_ids.contains(&e.id));

    for slot in &slots {
        if entity_slots.iter().any(|es| es.query_token == slot.token) {
            continue;
        }
        if templated_route.to_lowercase().contains(&slot.original.to_lowercase()) {
            templated_route = replace_literal_case_insensitive(&templated_route, &slot.original, &slot.token);
        }
        for param in &mut stored_plan.parameters {
            if param.source != ParameterSource::Entity && param.value.eq_ignore_ascii_case(&slot.original) {
                param.value = slot.token.clone();
            }
        }
    }
    stored_plan.route = templated_route.clone();

    Some(StructuralEntry {
        templated_query,
        templated_route,
        plan: stored_plan,
        entity_slots,
    })
}

impl StructuralEntry {
    pub fn key(&self) -> String {
        format!("{}|{}", self.templated_query, self.templated_route)
    }

    /// Attempt to match `normalized_query` against this entry's
    /// templated query: token-length-equal, all non-placeholder tokens
    /// identical. On success, returns a reconstructed `ActionPlan` with
    /// every non-entity placeholder substituted by the corresponding
    /// token from `normalized_query`, and every entity slot re-resolved
    /// through `resolver` against its corresponding new query token
    /// (rather than reusing the id baked in when the entry was stored).
    pub async fn try_reconstruct(&self, normalized_query: &str, resolver: &EntityResolver) -> Option<ActionPlan> {
        let template_tokens: Vec<&str> = self.templated_query.split_whitespace().collect();
        let query_tokens: Vec<&str> = normalized_query.split_whitespace().collect();
        if template_tokens.len() != query_tokens.len() {
            return None;
        }

        let mut substitutions: HashMap<String, String> = HashMap::new();
        for (t, q) in template_tokens.iter().zip(query_tokens.iter()) {
            if t.starts_with('{') && t.ends_with('}') {
                substitutions.insert(t.to_string(), q.to_string());
            } else if t != q {
                return None;
            }
        }

        let mut plan = self.plan.clone();

        for entity_slot in &self.entity_slots {
            let word = substitutions.get(&entity_slot.query_token)?;
            let entity_name = strip_possessive(word);
            if entity_name.is_empty() {
                return None;
            }
            let req = ResolveRequest::new(entity_name, vec![entity_slot.table.clone()], entity_slot.search_fields.clone());
            let best = resolver.search_entity(&req).await.into_iter().next()?;
            if plan.route.contains(entity_slot.entity_id_token.as_str()) {
                plan.route = plan.route.replace(entity_slot.entity_id_token.as_str(), &best.id);
            }
            for param in &mut plan.parameters {
                if param.value == entity_slot.entity_id_token {
                    param.value = best.id.clone();
                }
            }
            plan.entities.push(best);
        }

        for (placeholder, value) in &substitutions {
            if plan.route.contains(placeholder.as_str()) {
                plan.route = plan.route.replace(placeholder.as_str(), value);
            }
            for param in &mut plan.parameters {
                if param.value == *placeholder {
                    param.value = value.clone();
                }
            }
        }

        if plan.route.contains('{') {
            return None;
        }
        Some(plan)
    }
}
