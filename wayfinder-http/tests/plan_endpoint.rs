use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use wayfinder_core::{ParameterSpec, ParameterType, RoutePattern, SiteConfiguration, PlanningService};
use wayfinder_http::{router, AppState};
use wayfinder_llm::MockPredictor;
use wayfinder_store::InMemoryRecordSearcher;

fn test_config() -> SiteConfiguration {
    let mut parameters = HashMap::new();
    parameters.insert(
        "entity_id".to_string(),
        ParameterSpec { param_type: ParameterType::Uuid, required: true, enum_values: None, examples: vec![] },
    );
    SiteConfiguration {
        domain: "test".into(),
        base_url: "http://localhost".into(),
        entities: HashMap::new(),
        route_patterns: vec![RoutePattern {
            name: "person_overview".into(),
            template: "/person/{entity_id}/overview".into(),
            description: String::new(),
            intent_patterns: vec![],
            parameters,
            required_roles: None,
        }],
        database_schema: Default::default(),
        semantic_mappings: HashMap::new(),
    }
}

fn app() -> axum::Router {
    let predictor = MockPredictor::always(serde_json::json!({
        "intent": {"action_type": "navigate"},
        "entity_resolution": [],
        "route_matching": {"resolved_route": "/person/u-1/overview", "parameters": []},
        "overall_confidence": 0.8,
        "reasoning": "matched",
    }));
    let searcher = InMemoryRecordSearcher::new();
    let service = PlanningService::new(test_config(), Arc::new(predictor), Arc::new(searcher));
    router(AppState::new(service))
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let response = app().oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn plan_endpoint_returns_a_successful_response() {
    let body = serde_json::json!({ "query": "show me james smith" }).to_string();
    let request = Request::builder().method("POST").uri("/plan").header("content-type", "application/json").body(Body::from(body)).unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["action_plan"]["route"], "/person/u-1/overview");
}

#[tokio::test]
async fn plan_endpoint_rejects_empty_query() {
    let body = serde_json::json!({ "query": "" }).to_string();
    let request = Request::builder().method("POST").uri("/plan").header("content-type", "application/json").body(Body::from(body)).unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cache_stats_then_clear_round_trip() {
    let app = app();
    let body = serde_json::json!({ "query": "show me james smith" }).to_string();
    let request = Request::builder().method("POST").uri("/plan").header("content-type", "application/json").body(Body::from(body)).unwrap();
    app.clone().oneshot(request).await.unwrap();

    let response = app.clone().oneshot(Request::builder().uri("/cache/stats").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let stats: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(stats["request"]["total_entries"].as_u64().unwrap() >= 1);

    let response = app.clone().oneshot(Request::builder().method("POST").uri("/cache/clear").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(Request::builder().uri("/cache/stats").body(Body::empty()).unwrap()).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let stats: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["request"]["total_entries"], 0);
}

#[tokio::test]
async fn debug_structural_endpoint_respects_limit() {
    let response = app().oneshot(Request::builder().uri("/cache/debug/structural?limit=1").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["keys"].as_array().unwrap().len() <= 1);
}
