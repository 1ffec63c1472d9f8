//! HTTP API for predictions, training, health checks and Prometheus metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use gvalue_core::{
    health::{ComponentStatus, HealthRegistry},
    FeatureBundle, PredictionService,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "g-value-service";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>) -> Self {
        let health_registry = service.health().clone();
        Self {
            service,
            health_registry,
        }
    }
}

/// Body of `POST /predict`
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub worker_id: String,
    pub order_id: String,
    #[serde(default)]
    pub features: FeatureBundle,
}

async fn root() -> impl IntoResponse {
    Json(json!({ "status": "running", "service": SERVICE_NAME }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

/// Always answers with a prediction for a well-formed body
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> impl IntoResponse {
    let prediction = state
        .service
        .predict(&request.worker_id, &request.order_id, &request.features)
        .await;
    Json(prediction)
}

async fn train(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.service.train().await {
        Ok(report) => {
            info!(loss = report.loss, samples = report.samples, "Training triggered via API");
            (
                StatusCode::OK,
                Json(json!({ "message": "Model training completed successfully" })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": e.to_string(),
                "state": state.service.regressor_state().as_str(),
            })),
        ),
    }
}

async fn invalidate(
    State(state): State<Arc<AppState>>,
    Path((worker_id, order_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.service.invalidate(&worker_id, &order_id).await {
        Ok(deleted) => (StatusCode::OK, Json(json!({ "deleted": deleted }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // Heuristic predictions and cache bypass still answer requests
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/predict/:worker_id/:order_id", delete(invalidate))
        .route("/train", post(train))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
