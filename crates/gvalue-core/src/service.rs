//! Cache-aside prediction service
//!
//! Single entry point for callers: looks the pairing up in the cache, and on a
//! miss encodes the features, asks the regressor, and writes the result back
//! with a 5 minute TTL. `predict` always returns a prediction; cache and model
//! failures are absorbed here and only show up in logs, metrics and health.

use crate::cache::{prediction_cache_key, CacheStore, PREDICTION_TTL};
use crate::error::{CacheResult, ModelError};
use crate::health::{components, HealthRegistry};
use crate::models::{FeatureBundle, Prediction, PredictionSource, RegressorState, TrainingReport};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::{FallbackPredictor, FeatureEncoder, Predictor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Orchestrates cache lookup, encoding, regression and cache population
pub struct PredictionService {
    encoder: FeatureEncoder,
    regressor: Arc<dyn Predictor>,
    cache: Arc<dyn CacheStore>,
    health: HealthRegistry,
    cache_degraded: AtomicBool,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(regressor: Arc<dyn Predictor>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            encoder: FeatureEncoder::new(),
            regressor,
            cache,
            health: HealthRegistry::new(),
            cache_degraded: AtomicBool::new(false),
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::new("g-value-service"),
        }
    }

    /// Report component health into a shared registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Cache handle for a worker-order pairing
    pub fn cache_key(worker_id: &str, order_id: &str) -> String {
        prediction_cache_key(worker_id, order_id)
    }

    pub fn regressor_state(&self) -> RegressorState {
        self.regressor.state()
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// G-value for a worker-order pairing. Cached values are returned as
    /// stored; fresh values are clamped and cached for `PREDICTION_TTL`.
    pub async fn predict(
        &self,
        worker_id: &str,
        order_id: &str,
        features: &FeatureBundle,
    ) -> Prediction {
        let start = Instant::now();
        let key = Self::cache_key(worker_id, order_id);

        if let Some(cached) = self.lookup(&key).await {
            self.metrics.inc_cache_hits();
            self.metrics.observe_prediction_latency(start.elapsed());
            self.logger.log_cache_hit(worker_id, order_id);
            return cached;
        }
        self.metrics.inc_cache_misses();

        let vector = self.encoder.encode(features);
        let regressor = Arc::clone(&self.regressor);
        let (prediction, source) =
            match tokio::task::spawn_blocking(move || regressor.predict_with_source(&vector)).await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Prediction task failed, using heuristic");
                    self.metrics.inc_heuristic_fallbacks();
                    (FallbackPredictor::predict(&vector), PredictionSource::Heuristic)
                }
            };

        self.store(&key, &prediction).await;
        self.health
            .record_regressor_state(self.regressor.state())
            .await;

        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed);
        self.logger
            .log_prediction(worker_id, order_id, &prediction, source, elapsed);
        prediction
    }

    /// Force a retraining run. Cached predictions are left untouched.
    pub async fn train(&self) -> Result<TrainingReport, ModelError> {
        let regressor = Arc::clone(&self.regressor);
        let result = tokio::task::spawn_blocking(move || regressor.train())
            .await
            .unwrap_or_else(|e| Err(ModelError::TrainingFailure(format!("training task failed: {}", e))));

        self.health
            .record_regressor_state(self.regressor.state())
            .await;
        result
    }

    /// Drop the cached prediction for a pairing, e.g. after the order changed
    pub async fn invalidate(&self, worker_id: &str, order_id: &str) -> CacheResult<bool> {
        let key = Self::cache_key(worker_id, order_id);
        let result = self.cache.delete(&key).await;
        match &result {
            Ok(removed) => {
                debug!(key = %key, removed = removed, "Cache entry invalidated");
                self.mark_cache(true).await;
            }
            Err(e) => {
                self.metrics.inc_cache_errors();
                self.logger.log_cache_error("delete", &key, e);
                self.mark_cache(false).await;
            }
        }
        result
    }

    async fn lookup(&self, key: &str) -> Option<Prediction> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => {
                self.mark_cache(true).await;
                raw?
            }
            Err(e) => {
                self.metrics.inc_cache_errors();
                self.logger.log_cache_error("get", key, &e);
                self.mark_cache(false).await;
                return None;
            }
        };

        match serde_json::from_str::<Prediction>(&raw) {
            Ok(prediction) => Some(prediction),
            Err(e) => {
                self.metrics.inc_cache_errors();
                self.logger.log_cache_error("decode", key, &e);
                None
            }
        }
    }

    async fn store(&self, key: &str, prediction: &Prediction) {
        let payload = match serde_json::to_string(prediction) {
            Ok(payload) => payload,
            Err(e) => {
                self.logger.log_cache_error("encode", key, &e);
                return;
            }
        };
        match self.cache.set(key, &payload, PREDICTION_TTL).await {
            Ok(()) => self.mark_cache(true).await,
            Err(e) => {
                self.metrics.inc_cache_errors();
                self.logger.log_cache_error("set", key, &e);
                self.mark_cache(false).await;
            }
        }
    }

    /// Update cache health only when availability flips
    async fn mark_cache(&self, available: bool) {
        let was_degraded = self.cache_degraded.swap(!available, Ordering::SeqCst);
        if was_degraded == !available {
            return;
        }
        if available {
            self.health.set_healthy(components::CACHE).await;
        } else {
            self.health
                .set_degraded(components::CACHE, "cache unavailable, predicting without it")
                .await;
        }
    }
}
