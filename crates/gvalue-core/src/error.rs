//! Error kinds recovered inside the core

use std::time::Duration;
use thiserror::Error;

/// Failures of the probabilistic regressor
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// Fitting the model failed; the regressor is left degraded
    #[error("training failed: {0}")]
    TrainingFailure(String),

    /// A fitted model could not produce a prediction
    #[error("evaluation failed: {0}")]
    EvaluationFailure(String),
}

/// Failures of a cache backend
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cache value could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
