use std::sync::Arc;
use wayfinder_core::PlanningService;
use wayfinder_http::{router, AppState};
use wayfinder_llm::{HttpPredictor, MockPredictor};
use wayfinder_store::InMemoryRecordSearcher;

pub struct ServeOpts {
    pub config: std::path::PathBuf,
    pub addr: String,
}

pub async fn run(opts: ServeOpts) -> Result<(), String> {
    let config = wayfinder_config::load(&opts.config).map_err(|e| e.to_string())?;

    let predictor: Arc<dyn wayfinder_core::Predictor> = match std::env::var("WAYFINDER_PREDICTOR_ENDPOINT") {
        Ok(endpoint) => {
            let model = std::env::var("WAYFINDER_PREDICTOR_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
            let mut predictor = HttpPredictor::new(endpoint, model);
            if let Ok(key) = std::env::var("WAYFINDER_PREDICTOR_API_KEY") {
                predictor = predictor.with_api_key(key);
            }
            Arc::new(predictor)
        }
        Err(_) => {
            tracing::warn!("WAYFINDER_PREDICTOR_ENDPOINT not set; serving with an unconfigured mock predictor");
            Arc::new(MockPredictor::unconfigured())
        }
    };

    let searcher: Arc<dyn wayfinder_core::RecordSearcher> = match std::env::var("WAYFINDER_SQLITE_PATH") {
        Ok(path) => {
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .connect(&format!("sqlite://{path}"))
                .await
                .map_err(|e| format!("connecting to sqlite database '{path}': {e}"))?;
            Arc::new(wayfinder_store::SqlxRecordSearcher::new(pool))
        }
        Err(_) => {
            tracing::warn!("WAYFINDER_SQLITE_PATH not set; serving with an empty in-memory record store");
            Arc::new(InMemoryRecordSearcher::new())
        }
    };

    let service = PlanningService::new(config, predictor, searcher);
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&opts.addr).await.map_err(|e| format!("binding '{}': {e}", opts.addr))?;
    tracing::info!(addr = %opts.addr, "wayfinder listening");
    axum::serve(listener, app).await.map_err(|e| e.to_string())
}
