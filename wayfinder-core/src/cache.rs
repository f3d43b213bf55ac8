//! Dual Cache (spec.md §4.C9): an exact-request tier and a structural
//! tier, each a `wayfinder_cache::TtlCache` keyed differently.

use crate::model::ActionPlan;
use crate::normalize::normalize_query;
use crate::resolver::EntityResolver;
use crate::route_validator::{RouteValidator, Validation};
use crate::structural::{derive_entry, StructuralEntry};
use md5::{Digest, Md5};
use std::time::Duration;
use wayfinder_cache::{CacheStats, TtlCache};

pub const DEFAULT_REQUEST_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_STRUCTURAL_TTL: Duration = Duration::from_secs(30 * 60);

/// How a response was produced, surfaced in `performance.cache_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    Request,
    Structural,
    None,
}

fn request_key(normalized_query: &str, user_id: Option<&str>, role: Option<&str>) -> String {
    let mut hasher = Md5::new();
    hasher.update(normalized_query.as_bytes());
    hasher.update(b":");
    hasher.update(user_id.unwrap_or("").as_bytes());
    hasher.update(b":");
    hasher.update(role.unwrap_or("").as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct DualCache {
    request: TtlCache<String, ActionPlan>,
    structural: TtlCache<String, StructuralEntry>,
}

/// Combined entry + tier counts for `stats()`.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct DualCacheStats {
    pub request: CacheStats,
    pub structural: CacheStats,
}

impl DualCache {
    pub fn new() -> Self {
        Self::with_ttls(DEFAULT_REQUEST_TTL, DEFAULT_STRUCTURAL_TTL)
    }

    pub fn with_ttls(request_ttl: Duration, structural_ttl: Duration) -> Self {
        Self {
            request: TtlCache::new(request_ttl),
            structural: TtlCache::new(structural_ttl),
        }
    }

    /// Tier-1 lookup, per spec.md §4.C10 step 2. Returns the cached
    /// plan verbatim; the caller stamps `performance` fields.
    pub fn lookup_request(&self, normalized_query: &str, user_id: Option<&str>, role: Option<&str>) -> Option<ActionPlan> {
        self.request.get(&request_key(normalized_query, user_id, role))
    }

    /// Tier-2 lookup, per spec.md §4.C10 step 3. Walks live structural
    /// entries; on the first whose shape matches `normalized_query`,
    /// reconstructs a plan (re-resolving any entity slot through
    /// `resolver`) and re-validates its route. An entry whose
    /// reconstruction still carries an unresolved `{…}`, or whose entity
    /// slot can't be re-resolved, is rejected and the walk continues.
    pub async fn lookup_structural(&self, normalized_query: &str, validator: &RouteValidator, resolver: &EntityResolver) -> Option<ActionPlan> {
        for key in self.structural.keys() {
            let Some(entry) = self.structural.get(&key) else {
                continue;
            };
            let Some(mut plan) = entry.try_reconstruct(normalized_query, resolver).await else {
                continue;
            };
            match validator.validate(&plan.route, &plan.entities) {
                Validation::Valid { matched_pattern } => {
                    plan.matched_pattern = matched_pattern;
                    return Some(plan);
                }
                Validation::Repaired { route, matched_pattern, confidence_penalty } => {
                    plan.route = route;
                    plan.matched_pattern = matched_pattern;
                    plan.confidence = (plan.confidence - confidence_penalty).max(0.1);
                    return Some(plan);
                }
                Validation::Failed => continue,
            }
        }
        None
    }

    /// Populate both tiers for a freshly-planned response, per spec.md
    /// §4.C10 step 8. Structural storage is skipped silently when the
    /// plan is ineligible (see `structural::derive_entry`).
    pub fn store(&self, normalized_query: &str, user_id: Option<&str>, role: Option<&str>, plan: &ActionPlan) {
        self.request.insert(request_key(normalized_query, user_id, role), plan.clone());
        if let Some(entry) = derive_entry(normalized_query, plan) {
            self.structural.insert(entry.key(), entry);
        }
    }

    /// Empties both tiers. Per spec.md §4.C9, atomic with respect to new
    /// inserts racing in: each tier's own map-level atomicity is
    /// sufficient since a cleared map can only be re-populated by a
    /// `store` that happens strictly after this call observes it empty.
    pub fn clear_all(&self) {
        self.request.clear();
        self.structural.clear();
    }

    pub fn stats(&self) -> DualCacheStats {
        DualCacheStats {
            request: self.request.stats(),
            structural: self.structural.stats(),
        }
    }

    /// Read-only inspection of the first `limit` live structural keys,
    /// for the `/cache/debug/structural` endpoint.
    pub fn debug_structural_keys(&self, limit: usize) -> Vec<String> {
        self.structural.keys().into_iter().take(limit).collect()
    }
}

impl Default for DualCache {
    fn default() -> Self {
        Self::new()
    }
}
