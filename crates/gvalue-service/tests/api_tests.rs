//! Integration tests for the service API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gvalue_core::{
    cache::{CacheStore, InMemoryCacheStore},
    health::components,
    predictor::{GaussianProcess, ModelFitter, TrainingSet},
    CacheError, CacheResult, GpRegressor, ModelError, PredictionService, RegressorConfig,
};
use gvalue_service::api::{create_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_config() -> RegressorConfig {
    RegressorConfig {
        training_samples: 40,
        iterations: 15,
        training_seed: Some(5),
        ..Default::default()
    }
}

struct FailingFitter;

impl ModelFitter for FailingFitter {
    fn fit(&self, _data: &TrainingSet) -> Result<GaussianProcess, ModelError> {
        Err(ModelError::TrainingFailure("injected".into()))
    }
}

struct UnavailableStore;

#[async_trait::async_trait]
impl CacheStore for UnavailableStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    fn backend(&self) -> &'static str {
        "unavailable"
    }
}

async fn app_with(regressor: GpRegressor, cache: Arc<dyn CacheStore>) -> (Router, Arc<AppState>) {
    let service = Arc::new(PredictionService::new(Arc::new(regressor), cache));
    let state = Arc::new(AppState::new(service));
    state.health_registry.register(components::REGRESSOR).await;
    state.health_registry.register(components::CACHE).await;
    (create_router(state.clone()), state)
}

async fn setup_test_app() -> (Router, Arc<AppState>, Arc<InMemoryCacheStore>) {
    let cache = Arc::new(InMemoryCacheStore::new());
    let (router, state) = app_with(GpRegressor::new(test_config()), cache.clone()).await;
    (router, state, cache)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn predict_body(worker: &str, order: &str) -> serde_json::Value {
    serde_json::json!({
        "worker_id": worker,
        "order_id": order,
        "features": {
            "pickup": "123 Main St",
            "dropoff": "456 Oak Ave",
            "eta": 15,
            "time_of_day": 14,
            "day_of_week": 1
        }
    })
}

#[tokio::test]
async fn test_root_and_health() {
    let (app, _state, _cache) = setup_test_app().await;

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["service"], "g-value-service");

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_predict_caches_and_repeats() {
    let (app, _state, cache) = setup_test_app().await;

    let (status, first) = send(&app, post_json("/predict", predict_body("w1", "o1"))).await;
    assert_eq!(status, StatusCode::OK);
    let g_mean = first["g_mean"].as_f64().unwrap();
    let g_var = first["g_var"].as_f64().unwrap();
    assert!((0.1..=1.0).contains(&g_mean));
    assert!((0.01..=0.5).contains(&g_var));
    assert!(cache.get("g_value:w1:o1").await.unwrap().is_some());

    let (_, second) = send(&app, post_json("/predict", predict_body("w1", "o1"))).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_without_features_uses_defaults() {
    let (app, _state, _cache) = setup_test_app().await;

    let body = serde_json::json!({ "worker_id": "w2", "order_id": "o2" });
    let (status, prediction) = send(&app, post_json("/predict", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(prediction["g_mean"].is_f64());
}

#[tokio::test]
async fn test_predict_rejects_malformed_body() {
    let (app, _state, _cache) = setup_test_app().await;

    let (status, _) = send(&app, post_json("/predict", serde_json::json!({ "order_id": "o1" }))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_invalidate_then_recompute() {
    let (app, _state, cache) = setup_test_app().await;
    send(&app, post_json("/predict", predict_body("w1", "o1"))).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/predict/w1/o1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    assert!(cache.get("g_value:w1:o1").await.unwrap().is_none());

    let (status, _) = send(&app, post_json("/predict", predict_body("w1", "o1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cache.get("g_value:w1:o1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_train_success() {
    let (app, state, _cache) = setup_test_app().await;

    let (status, body) = send(&app, post_json("/train", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Model training completed successfully");
    assert_eq!(state.service.regressor_state().as_str(), "ready");
}

#[tokio::test]
async fn test_train_failure_reports_state() {
    let regressor = GpRegressor::with_fitter(test_config(), Arc::new(FailingFitter));
    let (app, _state) = app_with(regressor, Arc::new(InMemoryCacheStore::new())).await;

    let (status, body) = send(&app, post_json("/train", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["state"], "degraded");
    assert!(body["error"].as_str().unwrap().contains("injected"));

    // Predictions keep flowing from the heuristic
    let (status, prediction) = send(&app, post_json("/predict", predict_body("w1", "o1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(prediction["g_mean"].as_f64().is_some());

    let (status, health) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_unavailable_cache() {
    let (app, _state) = app_with(GpRegressor::new(test_config()), Arc::new(UnavailableStore)).await;

    let (status, _) = send(&app, post_json("/predict", predict_body("w1", "o1"))).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method("DELETE")
        .uri("/predict/w1/o1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());

    let (_, health) = send(&app, get("/healthz")).await;
    assert_eq!(health["components"]["cache"]["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state, _cache) = setup_test_app().await;

    let (status, health) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state, _cache) = setup_test_app().await;
    state
        .health_registry
        .set_unhealthy(components::CACHE, "Connection lost")
        .await;

    let (status, health) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_readiness() {
    let (app, state, _cache) = setup_test_app().await;

    let (status, body) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    state.health_registry.set_ready(true).await;
    let (status, body) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state, _cache) = setup_test_app().await;
    send(&app, post_json("/predict", predict_body("w9", "o9"))).await;

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("gvalue_prediction_latency_seconds"));
}
