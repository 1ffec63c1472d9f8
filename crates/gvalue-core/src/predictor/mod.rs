//! G-value prediction engine

mod features;
mod gp;
mod inference;
mod output;
mod training;

pub use features::{
    fallback_seed, locality_code, FeatureEncoder, DEFAULT_DAY_OF_WEEK, DEFAULT_ETA_MINUTES,
    DEFAULT_TIME_OF_DAY, MAX_ETA_MINUTES,
};
pub use gp::{AdamConfig, GaussianProcess, Hyperparameters, Input};
pub use inference::{
    FallbackPredictor, GpRegressor, RegressorConfig, DEFAULT_LEARNING_RATE,
    DEFAULT_TRAINING_ITERATIONS,
};
pub use output::{OutputFormatter, MAX_G_MEAN, MAX_G_VAR, MIN_G_MEAN, MIN_G_VAR};
pub use training::{
    target_score, GaussianProcessFitter, ModelFitter, TrainingSet, DEFAULT_TRAINING_SAMPLES,
};

use crate::error::ModelError;
use crate::models::{EncodedVector, Prediction, PredictionSource, RegressorState, TrainingReport};

/// Trait for regressor implementations
pub trait Predictor: Send + Sync {
    /// Predict and report which path produced the value. Never fails.
    fn predict_with_source(&self, vector: &EncodedVector) -> (Prediction, PredictionSource);

    /// Generate a g-value prediction for an encoded vector
    fn predict(&self, vector: &EncodedVector) -> Prediction {
        self.predict_with_source(vector).0
    }

    /// Force a training run
    fn train(&self) -> Result<TrainingReport, ModelError>;

    /// Current lifecycle state
    fn state(&self) -> RegressorState;
}
