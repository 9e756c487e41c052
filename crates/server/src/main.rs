//! Prediction server - breast cancer classifier over HTTP
//!
//! Loads the artifact bundle once at startup, then serves the JSON API and
//! form UI on one port and Prometheus metrics on another.

use anyhow::{Context, Result};
use classifier_lib::{
    ArtifactStore, PredictionServiceBuilder, ServiceMetrics, StructuredLogger,
};
use prediction_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting prediction-server");

    let config = ServerConfig::load()?;
    let model_dir = config.resolved_model_dir();

    let logger = StructuredLogger::new("prediction-server");
    logger.log_startup(config.version.as_deref(), &model_dir.display().to_string());

    // Fatal: never bind a port without a consistent bundle
    let bundle = match ArtifactStore::new(&model_dir).load() {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(
                dir = %model_dir.display(),
                error = %e,
                "Failed to load artifact bundle"
            );
            return Err(e).context("Cannot start without a valid artifact bundle");
        }
    };
    logger.log_artifacts_loaded(
        &model_dir.display().to_string(),
        bundle.n_features(),
        bundle.model.n_support(),
        bundle.manifest.is_some(),
    );

    let metrics = ServiceMetrics::new().context("Failed to register metrics")?;
    let service = PredictionServiceBuilder::new()
        .bundle(bundle)
        .metrics(metrics.clone())
        .logger(logger.clone())
        .build()?;

    let state = Arc::new(api::AppState::new(
        Arc::new(service),
        metrics.clone(),
        logger.clone(),
        config.version.clone(),
    ));

    let api_handle = tokio::spawn(api::serve(config.api_addr(), state));
    let metrics_handle = tokio::spawn(api::serve_metrics(config.metrics_addr(), metrics));

    tokio::select! {
        result = api_handle => {
            result.context("API server task failed")??;
            warn!("API server stopped");
        }
        result = metrics_handle => {
            result.context("Metrics server task failed")??;
            warn!("Metrics server stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
