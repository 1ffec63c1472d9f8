//! Gaussian process regressor with a lazy training lifecycle
//!
//! The regressor owns its fitted model and state machine. Training runs are
//! serialized by a mutex; callers that queued behind a run reuse its outcome.
//! When no fitted model is available the deterministic heuristic answers.

use super::gp::GaussianProcess;
use super::output::OutputFormatter;
use super::training::{
    GaussianProcessFitter, ModelFitter, TrainingSet, DEFAULT_TRAINING_SAMPLES,
};
use super::Predictor;
use crate::error::ModelError;
use crate::models::{EncodedVector, Prediction, PredictionSource, RegressorState, TrainingReport};
use crate::observability::{ServiceMetrics, StructuredLogger};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, warn};

/// Default number of Adam iterations per training run
pub const DEFAULT_TRAINING_ITERATIONS: usize = 50;

/// Default Adam learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Configuration for the regressor
#[derive(Debug, Clone)]
pub struct RegressorConfig {
    /// Synthetic samples drawn per training run
    pub training_samples: usize,
    /// Optimizer iterations per training run
    pub iterations: usize,
    pub learning_rate: f64,
    /// Fixed seed for the synthetic dataset; fresh entropy when absent
    pub training_seed: Option<u64>,
}

impl Default for RegressorConfig {
    fn default() -> Self {
        Self {
            training_samples: DEFAULT_TRAINING_SAMPLES,
            iterations: DEFAULT_TRAINING_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            training_seed: None,
        }
    }
}

struct RegressorInner {
    state: RegressorState,
    model: Option<Arc<GaussianProcess>>,
    last_report: Option<TrainingReport>,
    /// Bumped every time a training run finishes
    generation: u64,
}

/// Probabilistic regressor producing (mean, variance) g-value predictions
pub struct GpRegressor {
    config: RegressorConfig,
    fitter: Arc<dyn ModelFitter>,
    output_formatter: OutputFormatter,
    inner: RwLock<RegressorInner>,
    training_lock: Mutex<()>,
    training_runs: AtomicU64,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl GpRegressor {
    /// Create an untrained regressor with the default GP fitter
    pub fn new(config: RegressorConfig) -> Self {
        let fitter = GaussianProcessFitter::new(config.iterations, config.learning_rate);
        Self::with_fitter(config, Arc::new(fitter))
    }

    /// Create an untrained regressor with a custom fitting step
    pub fn with_fitter(config: RegressorConfig, fitter: Arc<dyn ModelFitter>) -> Self {
        let metrics = ServiceMetrics::new();
        metrics.set_regressor_state(RegressorState::Uninitialized);
        Self {
            config,
            fitter,
            output_formatter: OutputFormatter::new(),
            inner: RwLock::new(RegressorInner {
                state: RegressorState::Uninitialized,
                model: None,
                last_report: None,
                generation: 0,
            }),
            training_lock: Mutex::new(()),
            training_runs: AtomicU64::new(0),
            metrics,
            logger: StructuredLogger::new("g-value-service"),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state() == RegressorState::Ready
    }

    /// Number of finished training runs, successful or not
    pub fn training_runs(&self) -> u64 {
        self.training_runs.load(Ordering::SeqCst)
    }

    pub fn last_report(&self) -> Option<TrainingReport> {
        self.read_inner().last_report.clone()
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, RegressorInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, RegressorInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: RegressorState) {
        self.write_inner().state = state;
        self.metrics.set_regressor_state(state);
    }

    /// Train unless a run finished since `observed_generation` was read
    fn train_if_unchanged(&self, observed_generation: u64) {
        let _guard = self.training_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.read_inner().generation != observed_generation {
            debug!("Reusing outcome of a concurrent training run");
            return;
        }
        // Failure is recorded as Degraded; the caller falls back to the heuristic
        let _ = self.run_training();
    }

    /// One training run. Caller must hold `training_lock`.
    fn run_training(&self) -> Result<TrainingReport, ModelError> {
        let start = Instant::now();
        self.set_state(RegressorState::Training);

        let mut rng = match self.config.training_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let data = TrainingSet::synthetic(self.config.training_samples, &mut rng);

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.fitter.fit(&data)))
            .unwrap_or_else(|_| Err(ModelError::TrainingFailure("model fitter panicked".into())));

        let elapsed = start.elapsed();
        self.training_runs.fetch_add(1, Ordering::SeqCst);
        self.metrics.observe_training(elapsed, result.is_ok());

        let mut inner = self.write_inner();
        inner.generation += 1;
        match result {
            Ok(model) => {
                let params = *model.params();
                let report = TrainingReport {
                    samples: model.num_samples(),
                    iterations: self.config.iterations,
                    loss: model.loss(),
                    lengthscale: params.lengthscale(),
                    outputscale: params.outputscale(),
                    noise: params.noise(),
                    duration_ms: elapsed.as_millis() as u64,
                };
                inner.state = RegressorState::Ready;
                inner.model = Some(Arc::new(model));
                inner.last_report = Some(report.clone());
                drop(inner);

                self.metrics.set_regressor_state(RegressorState::Ready);
                self.logger.log_training_completed(&report);
                Ok(report)
            }
            Err(e) => {
                inner.state = RegressorState::Degraded;
                inner.model = None;
                drop(inner);

                self.metrics.set_regressor_state(RegressorState::Degraded);
                self.logger.log_training_failed(&e);
                Err(e)
            }
        }
    }

    fn evaluate(&self, model: &GaussianProcess, vector: &EncodedVector) -> Result<Prediction, ModelError> {
        let (mean, variance) = model.posterior(&vector.as_array())?;
        Ok(self.output_formatter.format(mean, variance))
    }

    fn fallback(&self, vector: &EncodedVector) -> (Prediction, PredictionSource) {
        self.metrics.inc_heuristic_fallbacks();
        (FallbackPredictor::predict(vector), PredictionSource::Heuristic)
    }
}

impl Predictor for GpRegressor {
    fn predict_with_source(&self, vector: &EncodedVector) -> (Prediction, PredictionSource) {
        let (state, generation) = {
            let inner = self.read_inner();
            (inner.state, inner.generation)
        };
        if state != RegressorState::Ready {
            self.train_if_unchanged(generation);
        }

        let model = {
            let inner = self.read_inner();
            match inner.state {
                RegressorState::Ready => inner.model.clone(),
                _ => None,
            }
        };

        let Some(model) = model else {
            debug!("No trained model available, using heuristic");
            return self.fallback(vector);
        };

        match self.evaluate(&model, vector) {
            Ok(prediction) => (prediction, PredictionSource::Model),
            Err(e) => {
                warn!(error = %e, "Model evaluation failed, using heuristic");
                self.fallback(vector)
            }
        }
    }

    fn train(&self) -> Result<TrainingReport, ModelError> {
        let _guard = self.training_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_training()
    }

    fn state(&self) -> RegressorState {
        self.read_inner().state
    }
}

/// Deterministic heuristic used when no trained model is available
pub struct FallbackPredictor;

impl FallbackPredictor {
    /// Shorter ETAs score higher; noise and variance come from a stream
    /// seeded by the raw pickup, dropoff and ETA, so equal inputs always
    /// reproduce the same prediction.
    pub fn predict(vector: &EncodedVector) -> Prediction {
        let formatter = OutputFormatter::new();
        let mut rng = ChaCha8Rng::seed_from_u64(vector.fallback_seed);

        let base = 0.4 + 0.4 * (1.0 - (vector.eta_minutes() / 60.0).min(1.0));
        let noise: f64 = StandardNormal.sample(&mut rng);
        let noise = (noise * 0.1).clamp(-0.3, 0.3);
        let variance = 0.05 + rng.gen_range(0.0..0.15);

        formatter.format(base + noise, variance)
    }
}
