//! Planning Service (spec.md §4.C10): the top-level entry point —
//! normalize, cache-probe, plan, validate, cache-store.

use crate::cache::{CacheType, DualCache};
use crate::error::PlanningError;
use crate::model::{ActionPlanSummary, SiteConfiguration};
use crate::normalize::normalize_query;
use crate::planner::SingleCallPlanner;
use crate::ports::{Predictor, RecordSearcher};
use crate::resolver::EntityResolver;
use crate::route_validator::{RouteValidator, Validation};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_QUERY_LEN: usize = 500;
const DEFAULT_MAX_ALTERNATIVES: usize = 3;
const MAX_ALTERNATIVES_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyLevel {
    Excellent,
    Good,
    Acceptable,
    Slow,
}

impl LatencyLevel {
    /// Classify at thresholds 1000 / 3000 / 5000 ms (spec.md §4.C10).
    pub fn classify(duration_ms: u64) -> Self {
        if duration_ms < 1000 {
            LatencyLevel::Excellent
        } else if duration_ms < 3000 {
            LatencyLevel::Good
        } else if duration_ms < 5000 {
            LatencyLevel::Acceptable
        } else {
            LatencyLevel::Slow
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub duration_ms: u64,
    pub level: LatencyLevel,
    pub llm_calls: u32,
    pub cache_hits: u32,
    pub cache_type: CacheType,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMetadata {
    pub query_length: usize,
    pub user_id: Option<String>,
    pub user_role: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct PlanningRequest {
    pub query: String,
    pub user_id: Option<String>,
    pub user_role: Option<String>,
    pub context: Option<serde_json::Value>,
    pub max_alternatives: usize,
}

impl PlanningRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            user_role: None,
            context: None,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanningResponse {
    pub success: bool,
    pub action_plan: crate::model::ActionPlan,
    pub alternatives: Vec<ActionPlanSummary>,
    pub performance: Performance,
    pub metadata: RequestMetadata,
}

pub struct PlanningService {
    config: SiteConfiguration,
    cache: DualCache,
    validator: Arc<RouteValidator>,
    planner: SingleCallPlanner,
    /// Its own resolver, separate from the one `SingleCallPlanner` owns
    /// internally: a structural-cache hit re-resolves an entity slot
    /// (spec.md §4.C9) without ever calling the planner.
    resolver: EntityResolver,
    /// Injected by the caller (HTTP layer) rather than computed here —
    /// this crate has no wall-clock or OS-time dependency of its own.
    now: fn() -> Instant,
}

impl PlanningService {
    pub fn new(config: SiteConfiguration, predictor: Arc<dyn Predictor>, searcher: Arc<dyn RecordSearcher>) -> Self {
        let validator = Arc::new(RouteValidator::new(config.route_patterns.clone()));
        let resolver = EntityResolver::new(searcher.clone());
        let planner = SingleCallPlanner::new(predictor, searcher, validator.clone());
        Self {
            config,
            cache: DualCache::new(),
            validator,
            planner,
            resolver,
            now: Instant::now,
        }
    }

    pub fn config(&self) -> &SiteConfiguration {
        &self.config
    }

    pub fn cache(&self) -> &DualCache {
        &self.cache
    }

    /// Execute one planning request end-to-end.
    pub async fn handle(&self, request: PlanningRequest, timestamp: impl Into<String>) -> Result<PlanningResponse, PlanningError> {
        if request.query.trim().is_empty() {
            return Err(PlanningError::MalformedQuery("query must not be empty".into()));
        }
        if request.query.chars().count() > MAX_QUERY_LEN {
            return Err(PlanningError::MalformedQuery(format!(
                "query exceeds {MAX_QUERY_LEN} characters"
            )));
        }
        let max_alternatives = request.max_alternatives.min(MAX_ALTERNATIVES_CAP);

        let started = (self.now)();
        let normalized = normalize_query(&request.query);
        let timestamp = timestamp.into();

        let metadata = RequestMetadata {
            query_length: request.query.chars().count(),
            user_id: request.user_id.clone(),
            user_role: request.user_role.clone(),
            timestamp,
        };

        let (mut plan, llm_calls, cache_hits, cache_type) =
            if let Some(p) = self.cache.lookup_request(&normalized, request.user_id.as_deref(), request.user_role.as_deref()) {
                (p, 0, 1, CacheType::Request)
            } else if let Some(p) = self.cache.lookup_structural(&normalized, &self.validator, &self.resolver).await {
                (p, 0, 1, CacheType::Structural)
            } else {
                let p = self.planner.plan(&self.config, &normalized).await?;
                self.cache.store(&normalized, request.user_id.as_deref(), request.user_role.as_deref(), &p);
                (p, 1, 0, CacheType::None)
            };

        // RBAC is applied fresh to every response rather than baked into
        // a cached value: the structural tier has no user/role component
        // in its key, so a clamp applied before storing would leak a
        // denial (or an authorization) across unrelated callers.
        self.apply_rbac_for_role(&mut plan, request.user_role.as_deref());

        let alternatives: Vec<ActionPlanSummary> = Vec::new();
        let _ = max_alternatives; // single-call planner emits no alternatives (spec.md §4.C6 step 6)

        Ok(self.finish(plan, alternatives, started, llm_calls, cache_hits, cache_type, metadata))
    }

    /// RBAC clamp (spec.md §4.C6 "RBAC check", applied by the service):
    /// if the matched pattern declares required roles the caller's role
    /// is not among, clamp confidence to 0 and append a denial note.
    /// The route itself is left unchanged (spec.md §9 Open Question 3).
    pub fn apply_rbac_for_role(&self, plan: &mut crate::model::ActionPlan, role: Option<&str>) {
        if let Some(pattern) = self.config.find_pattern(&plan.matched_pattern) {
            if !pattern.allows_role(role) {
                plan.confidence = 0.0;
                plan.reasoning = format!(
                    "{} [access denied: role '{}' not in required roles]",
                    plan.reasoning,
                    role.unwrap_or("anonymous")
                );
            }
        }
    }

    fn finish(
        &self,
        plan: crate::model::ActionPlan,
        alternatives: Vec<ActionPlanSummary>,
        started: Instant,
        llm_calls: u32,
        cache_hits: u32,
        cache_type: CacheType,
        metadata: RequestMetadata,
    ) -> PlanningResponse {
        let duration_ms = started.elapsed().as_millis() as u64;
        PlanningResponse {
            success: true,
            action_plan: plan,
            alternatives,
            performance: Performance {
                duration_ms,
                level: LatencyLevel::classify(duration_ms),
                llm_calls,
                cache_hits,
                cache_type,
            },
            metadata,
        }
    }
}
