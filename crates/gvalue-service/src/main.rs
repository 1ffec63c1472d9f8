//! G-value service - worker/order desirability predictions over HTTP
//!
//! Serves cache-aside g-value predictions backed by a Gaussian process
//! regressor, with a heuristic fallback whenever no trained model exists.

use anyhow::Result;
use gvalue_core::{
    health::{components, HealthRegistry},
    GpRegressor, PredictionService, StructuredLogger,
};
use gvalue_service::{api, backend::connect_cache, config::ServiceConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting g-value-service");

    let config = ServiceConfig::load()?;
    info!(
        api_port = config.api_port,
        cache_backend = ?config.cache_backend,
        cache_required = config.cache_required,
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::REGRESSOR).await;
    health_registry.register(components::CACHE).await;

    let cache = connect_cache(&config, &health_registry).await;
    let logger = StructuredLogger::new(api::SERVICE_NAME);
    logger.log_startup(SERVICE_VERSION, cache.backend());

    let regressor = Arc::new(GpRegressor::new(config.regressor_config()));
    let service = Arc::new(
        PredictionService::new(regressor, cache)
            .with_health(health_registry.clone())
            .with_logger(logger.clone()),
    );

    if config.train_on_startup {
        // A failed run leaves the regressor degraded; requests still get heuristic values
        if let Err(e) = service.train().await {
            warn!(error = %e, "Startup training failed, serving heuristic predictions");
        }
    }

    let app_state = Arc::new(api::AppState::new(service));

    // Mark service as ready after initialization
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => return Err(e.context("API server failed")),
                Err(e) => return Err(anyhow::anyhow!("API server task failed: {}", e)),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
