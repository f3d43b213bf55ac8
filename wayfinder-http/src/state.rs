use std::sync::Arc;
use wayfinder_core::PlanningService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PlanningService>,
}

impl AppState {
    pub fn new(service: PlanningService) -> Self {
        Self { service: Arc::new(service) }
    }
}
