//! Core library for worker-order g-value prediction
//!
//! This crate provides:
//! - Feature encoding of raw pickup/dropoff/ETA/time bundles
//! - A Gaussian process regressor with a deterministic heuristic fallback
//! - Cache stores with per-entry TTL (in-memory, Redis, no-op)
//! - The cache-aside `PredictionService`
//! - Health checks and observability

pub mod cache;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;

pub use cache::{prediction_cache_key, CacheStore, InMemoryCacheStore, NoOpCacheStore, PREDICTION_TTL};
pub use error::{CacheError, CacheResult, ModelError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{FeatureEncoder, GpRegressor, Predictor, RegressorConfig};
pub use service::PredictionService;
