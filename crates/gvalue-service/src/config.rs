//! Service configuration

use anyhow::{Context, Result};
use gvalue_core::RegressorConfig;
use serde::Deserialize;
use std::time::Duration;

/// Which cache backend the service talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
    None,
}

/// Service configuration, read from `GVALUE_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP port for predictions, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Report an unreachable Redis as unhealthy instead of degraded
    #[serde(default)]
    pub cache_required: bool,

    /// Upper bound on every cache call in milliseconds
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    #[serde(default = "default_training_samples")]
    pub training_samples: usize,

    #[serde(default = "default_training_iterations")]
    pub training_iterations: usize,

    /// Fixes the synthetic training data; fresh data per run when unset
    #[serde(default)]
    pub training_seed: Option<u64>,

    /// Train before serving instead of on the first request
    #[serde(default)]
    pub train_on_startup: bool,
}

fn default_api_port() -> u16 {
    5001
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Redis
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_cache_timeout_ms() -> u64 {
    250
}

fn default_training_samples() -> usize {
    gvalue_core::predictor::DEFAULT_TRAINING_SAMPLES
}

fn default_training_iterations() -> usize {
    gvalue_core::predictor::DEFAULT_TRAINING_ITERATIONS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            cache_backend: default_cache_backend(),
            redis_url: default_redis_url(),
            cache_required: false,
            cache_timeout_ms: default_cache_timeout_ms(),
            training_samples: default_training_samples(),
            training_iterations: default_training_iterations(),
            training_seed: None,
            train_on_startup: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("GVALUE").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid GVALUE_* configuration")
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn regressor_config(&self) -> RegressorConfig {
        RegressorConfig {
            training_samples: self.training_samples,
            iterations: self.training_iterations,
            training_seed: self.training_seed,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("GVALUE")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_source(env(&[])).unwrap();
        assert_eq!(config.api_port, 5001);
        assert_eq!(config.cache_backend, CacheBackend::Redis);
        assert_eq!(config.redis_url, "redis://localhost:6379/0");
        assert!(!config.cache_required);
        assert_eq!(config.cache_timeout(), Duration::from_millis(250));
        assert_eq!(config.training_samples, 100);
        assert_eq!(config.training_iterations, 50);
        assert_eq!(config.training_seed, None);
        assert!(!config.train_on_startup);
    }

    #[test]
    fn test_environment_overrides() {
        let config = ServiceConfig::from_source(env(&[
            ("GVALUE_API_PORT", "6001"),
            ("GVALUE_CACHE_BACKEND", "memory"),
            ("GVALUE_TRAINING_SEED", "42"),
            ("GVALUE_TRAIN_ON_STARTUP", "true"),
            ("GVALUE_CACHE_REQUIRED", "true"),
        ]))
        .unwrap();

        assert_eq!(config.api_port, 6001);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.training_seed, Some(42));
        assert!(config.train_on_startup);
        assert!(config.cache_required);
        assert_eq!(config.regressor_config().training_seed, Some(42));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(ServiceConfig::from_source(env(&[("GVALUE_CACHE_BACKEND", "memcached")])).is_err());
    }
}
