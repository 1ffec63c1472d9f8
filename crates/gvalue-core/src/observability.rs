//! Observability infrastructure for the g-value service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, cache outcomes, fallbacks, training runs)
//! - Structured JSON logging with tracing

use crate::models::{Prediction, PredictionSource, RegressorState, TrainingReport};
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Buckets for training run durations (in seconds)
const TRAINING_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    training_duration_seconds: Histogram,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    cache_errors: IntCounter,
    heuristic_fallbacks: IntCounter,
    predictions_served: IntCounter,
    training_runs: IntCounter,
    training_failures: IntCounter,
    regressor_state: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "gvalue_prediction_latency_seconds",
                "Time spent answering a g-value prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            training_duration_seconds: register_histogram!(
                "gvalue_training_duration_seconds",
                "Time spent in a regressor training run",
                TRAINING_BUCKETS.to_vec()
            )
            .expect("Failed to register training_duration_seconds"),

            cache_hits: register_int_counter!(
                "gvalue_cache_hits_total",
                "Predictions answered from the cache"
            )
            .expect("Failed to register cache_hits"),

            cache_misses: register_int_counter!(
                "gvalue_cache_misses_total",
                "Predictions not found in the cache"
            )
            .expect("Failed to register cache_misses"),

            cache_errors: register_int_counter!(
                "gvalue_cache_errors_total",
                "Cache operations that failed and were bypassed"
            )
            .expect("Failed to register cache_errors"),

            heuristic_fallbacks: register_int_counter!(
                "gvalue_heuristic_fallbacks_total",
                "Predictions produced by the deterministic heuristic"
            )
            .expect("Failed to register heuristic_fallbacks"),

            predictions_served: register_int_counter!(
                "gvalue_predictions_served_total",
                "Total number of predictions returned to callers"
            )
            .expect("Failed to register predictions_served"),

            training_runs: register_int_counter!(
                "gvalue_training_runs_total",
                "Completed regressor training runs"
            )
            .expect("Failed to register training_runs"),

            training_failures: register_int_counter!(
                "gvalue_training_failures_total",
                "Training runs that left the regressor degraded"
            )
            .expect("Failed to register training_failures"),

            regressor_state: register_int_gauge!(
                "gvalue_regressor_state",
                "Regressor state (0 uninitialized, 1 training, 2 ready, 3 degraded)"
            )
            .expect("Failed to register regressor_state"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, elapsed: Duration) {
        self.inner().prediction_latency_seconds.observe(elapsed.as_secs_f64());
        self.inner().predictions_served.inc();
    }

    pub fn observe_training(&self, elapsed: Duration, success: bool) {
        self.inner().training_duration_seconds.observe(elapsed.as_secs_f64());
        self.inner().training_runs.inc();
        if !success {
            self.inner().training_failures.inc();
        }
    }

    pub fn inc_cache_hits(&self) {
        self.inner().cache_hits.inc();
    }

    pub fn inc_cache_misses(&self) {
        self.inner().cache_misses.inc();
    }

    pub fn inc_cache_errors(&self) {
        self.inner().cache_errors.inc();
    }

    pub fn inc_heuristic_fallbacks(&self) {
        self.inner().heuristic_fallbacks.inc();
    }

    pub fn set_regressor_state(&self, state: RegressorState) {
        self.inner().regressor_state.set(state.code());
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions,
/// cache outcomes, and training runs.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log a freshly computed prediction
    pub fn log_prediction(
        &self,
        worker_id: &str,
        order_id: &str,
        prediction: &Prediction,
        source: PredictionSource,
        elapsed: Duration,
    ) {
        info!(
            event = "prediction_computed",
            service = %self.service,
            worker_id = %worker_id,
            order_id = %order_id,
            g_mean = prediction.g_mean,
            g_var = prediction.g_var,
            source = source.as_str(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Prediction computed"
        );
    }

    pub fn log_cache_hit(&self, worker_id: &str, order_id: &str) {
        debug!(
            event = "cache_hit",
            service = %self.service,
            worker_id = %worker_id,
            order_id = %order_id,
            "Cache hit"
        );
    }

    /// Log a cache failure that was bypassed
    pub fn log_cache_error(&self, operation: &str, key: &str, error: &dyn std::fmt::Display) {
        warn!(
            event = "cache_error",
            service = %self.service,
            operation = %operation,
            key = %key,
            error = %error,
            "Cache operation failed, continuing without cache"
        );
    }

    pub fn log_training_completed(&self, report: &TrainingReport) {
        info!(
            event = "training_completed",
            service = %self.service,
            samples = report.samples,
            iterations = report.iterations,
            loss = report.loss,
            lengthscale = report.lengthscale,
            outputscale = report.outputscale,
            noise = report.noise,
            duration_ms = report.duration_ms,
            "Regressor trained"
        );
    }

    pub fn log_training_failed(&self, error: &dyn std::fmt::Display) {
        warn!(
            event = "training_failed",
            service = %self.service,
            error = %error,
            "Regressor training failed, serving heuristic predictions"
        );
    }

    pub fn log_startup(&self, version: &str, cache_backend: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            cache_backend = %cache_backend,
            "G-value service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "G-value service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        let metrics = ServiceMetrics::new();
        let again = ServiceMetrics::new();

        metrics.observe_prediction_latency(Duration::from_micros(300));
        metrics.observe_training(Duration::from_millis(40), true);
        metrics.inc_cache_hits();
        metrics.inc_cache_misses();
        again.inc_cache_errors();
        again.inc_heuristic_fallbacks();
        again.set_regressor_state(RegressorState::Ready);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("g-value-service");
        assert_eq!(logger.service, "g-value-service");
    }
}
