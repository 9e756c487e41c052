//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (request counts, prediction counts by diagnosis, inference latency)
//! - Structured JSON logging with tracing

use crate::models::Diagnosis;
use crate::training::TrainingReport;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

struct ServiceMetricsInner {
    registry: Registry,
    requests_total: IntCounterVec,
    predictions_total: IntCounterVec,
    prediction_latency_seconds: Histogram,
}

/// Service metrics for Prometheus exposition
///
/// Each instance owns its registry. Clones share the same counters.
#[derive(Clone)]
pub struct ServiceMetrics {
    inner: Arc<ServiceMetricsInner>,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("app_requests_total", "Total number of requests"),
            &["endpoint", "method"],
        )?;
        let predictions_total = IntCounterVec::new(
            Opts::new("app_predictions_total", "Total predictions by diagnosis"),
            &["prediction"],
        )?;
        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "app_prediction_latency_seconds",
                "Time spent scaling features and running inference",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;

        // Expose both diagnoses from the start, even at zero
        for diagnosis in [Diagnosis::Malignant, Diagnosis::Benign] {
            predictions_total.with_label_values(&[diagnosis.as_str()]);
        }

        Ok(Self {
            inner: Arc::new(ServiceMetricsInner {
                registry,
                requests_total,
                predictions_total,
                prediction_latency_seconds,
            }),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Count an incoming request, whatever its outcome
    pub fn inc_request(&self, endpoint: &str, method: &str) {
        self.inner
            .requests_total
            .with_label_values(&[endpoint, method])
            .inc();
    }

    /// Count a successful prediction
    pub fn inc_prediction(&self, diagnosis: Diagnosis) {
        self.inner
            .predictions_total
            .with_label_values(&[diagnosis.as_str()])
            .inc();
    }

    /// Record a scaling + inference latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner.prediction_latency_seconds.observe(duration_secs);
    }

    pub fn request_count(&self, endpoint: &str, method: &str) -> u64 {
        self.inner
            .requests_total
            .with_label_values(&[endpoint, method])
            .get()
    }

    pub fn prediction_count(&self, diagnosis: Diagnosis) -> u64 {
        self.inner
            .predictions_total
            .with_label_values(&[diagnosis.as_str()])
            .get()
    }

    pub fn total_predictions(&self) -> u64 {
        self.prediction_count(Diagnosis::Malignant) + self.prediction_count(Diagnosis::Benign)
    }

    pub fn latency_sample_count(&self) -> u64 {
        self.inner.prediction_latency_seconds.get_sample_count()
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for startup, predictions
/// and training runs.
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

    /// Log service startup
    pub fn log_startup(&self, version: Option<&str>, model_dir: &str) {
        info!(
            event = "startup",
            service = %self.service,
            version = version.unwrap_or("unset"),
            model_dir = %model_dir,
            "Prediction service starting"
        );
    }

    /// Log a successfully loaded artifact bundle
    pub fn log_artifacts_loaded(
        &self,
        model_dir: &str,
        features: usize,
        support_vectors: usize,
        verified: bool,
    ) {
        if !verified {
            warn!(
                event = "artifacts_loaded",
                service = %self.service,
                model_dir = %model_dir,
                features = features,
                support_vectors = support_vectors,
                verified = false,
                "Artifact bundle loaded without manifest verification"
            );
            return;
        }
        info!(
            event = "artifacts_loaded",
            service = %self.service,
            model_dir = %model_dir,
            features = features,
            support_vectors = support_vectors,
            verified = true,
            "Artifact bundle loaded"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(
        &self,
        source: &str,
        diagnosis: Diagnosis,
        probability_benign: f64,
        latency_secs: f64,
    ) {
        info!(
            event = "prediction_served",
            service = %self.service,
            source = %source,
            diagnosis = %diagnosis,
            probability_benign = probability_benign,
            latency_ms = latency_secs * 1000.0,
            "Prediction served"
        );
    }

    /// Log a rejected or failed prediction
    pub fn log_prediction_failed(&self, source: &str, error: &str, client_error: bool) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            source = %source,
            client_error = client_error,
            error = %error,
            "Prediction failed"
        );
    }

    /// Log the outcome of a training run
    pub fn log_training_completed(&self, model_dir: &str, report: &TrainingReport) {
        info!(
            event = "training_completed",
            service = %self.service,
            model_dir = %model_dir,
            seed = report.seed,
            test_accuracy = report.test_accuracy,
            support_vectors = report.support_vectors,
            train_samples = report.train_samples,
            test_samples = report.test_samples,
            duration_ms = report.duration_ms,
            "Training completed"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            service = %self.service,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_are_isolated() {
        let a = ServiceMetrics::new().unwrap();
        let b = ServiceMetrics::new().unwrap();

        a.inc_prediction(Diagnosis::Benign);
        assert_eq!(a.total_predictions(), 1);
        assert_eq!(b.total_predictions(), 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = ServiceMetrics::new().unwrap();
        let clone = metrics.clone();

        clone.inc_request("/predict", "POST");
        clone.inc_request("/predict", "POST");
        metrics.inc_request("/health", "GET");

        assert_eq!(metrics.request_count("/predict", "POST"), 2);
        assert_eq!(metrics.request_count("/health", "GET"), 1);
    }

    #[test]
    fn test_encode_exposes_metric_names() {
        let metrics = ServiceMetrics::new().unwrap();
        metrics.inc_request("/predict", "POST");
        metrics.inc_prediction(Diagnosis::Malignant);
        metrics.observe_prediction_latency(0.002);

        let text = metrics.encode().unwrap();
        assert!(text.contains("app_requests_total{endpoint=\"/predict\",method=\"POST\"} 1"));
        assert!(text.contains("app_predictions_total{prediction=\"malignant\"} 1"));
        assert!(text.contains("app_predictions_total{prediction=\"benign\"} 0"));
        assert!(text.contains("app_prediction_latency_seconds_count 1"));
        assert_eq!(metrics.latency_sample_count(), 1);
    }

    #[test]
    fn test_structured_logger_does_not_panic() {
        let logger = StructuredLogger::new("test");
        logger.log_startup(None, "model");
        logger.log_artifacts_loaded("model", 30, 100, false);
        logger.log_prediction("api", Diagnosis::Benign, 0.98, 0.001);
        logger.log_prediction_failed("form", "bad input", true);
        logger.log_shutdown("test");
    }
}
