//! HTTP API: health, prediction, form UI and Prometheus metrics

use crate::ui;
use axum::{
    extract::{rejection::JsonRejection, MatchedPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use classifier_lib::{FeatureInput, PredictError, Predictor, ServiceMetrics, StructuredLogger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Reported by `/health` once the bundle is loaded
pub const MODEL_STATUS: &str = "SVM loaded";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub version: Option<String>,
}

impl AppState {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        version: Option<String>,
    ) -> Self {
        Self {
            predictor,
            metrics,
            logger,
            version,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: FeatureInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

const CODE_INVALID: &str = "invalid_features";
const CODE_INFERENCE: &str = "inference_error";

fn error_response(status: StatusCode, error: String, code: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
        .into_response()
}

/// Liveness plus model status; only reachable once artifacts are loaded
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model: MODEL_STATUS.to_string(),
        version: state.version.clone(),
    })
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let message = rejection.body_text();
            state.logger.log_prediction_failed("api", &message, true);
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, message, CODE_INVALID);
        }
    };

    match state.predictor.predict(&request.features) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            let client_error = e.is_client_error();
            state
                .logger
                .log_prediction_failed("api", &e.to_string(), client_error);
            match &e {
                PredictError::Invalid(_) => {
                    error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string(), CODE_INVALID)
                }
                PredictError::Inference(_) => error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    e.to_string(),
                    CODE_INFERENCE,
                ),
            }
        }
    }
}

/// Count every routed request by endpoint and method
async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    state
        .metrics
        .inc_request(&endpoint, request.method().as_str());

    next.run(request).await
}

/// Prometheus metrics endpoint
async fn metrics(State(metrics): State<ServiceMetrics>) -> Response {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Create the API router (JSON API and form UI)
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/", get(ui::form_page).post(ui::submit_form))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

/// Create the metrics router served on its own port
pub fn metrics_router(metrics_handle: ServiceMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(metrics_handle)
}

/// Serve a router on an already bound listener
pub async fn serve_listener(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    info!(addr = %addr, "Starting API server");
    let listener = TcpListener::bind(&addr).await?;
    serve_listener(listener, create_router(state)).await
}

/// Start the metrics exporter
pub async fn serve_metrics(addr: String, metrics_handle: ServiceMetrics) -> anyhow::Result<()> {
    info!(addr = %addr, "Starting metrics server");
    let listener = TcpListener::bind(&addr).await?;
    serve_listener(listener, metrics_router(metrics_handle)).await
}
