//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use classifier_lib::{
    dataset::load_breast_cancer,
    scaler::StandardScaler,
    svm::{PlattScaling, SvcModel},
    ArtifactBundle, ArtifactStore, Diagnosis, FeatureSchema, FeatureVector, PredictError,
    PredictionResult, PredictionServiceBuilder, Predictor, ServiceMetrics, StructuredLogger,
    NUM_FEATURES,
};
use ndarray::Array2;
use prediction_server::api::{self, AppState};
use std::sync::Arc;
use tower::ServiceExt;

/// 30-feature bundle whose decision depends on the sign of the first feature
fn synthetic_bundle() -> ArtifactBundle {
    let names = load_breast_cancer().unwrap().feature_names;
    let scaler = StandardScaler::from_parts(vec![0.0; NUM_FEATURES], vec![1.0; NUM_FEATURES])
        .unwrap();

    let mut support_vectors = Array2::zeros((2, NUM_FEATURES));
    support_vectors[[0, 0]] = -1.0;
    support_vectors[[1, 0]] = 1.0;
    let model = SvcModel::from_parts(
        0.5,
        support_vectors,
        vec![-1.0, 1.0],
        0.0,
        PlattScaling { a: -3.0, b: 0.0 },
    )
    .unwrap();

    ArtifactBundle::new(scaler, model, FeatureSchema::new(names)).unwrap()
}

fn setup_test_app_with(predictor: Arc<dyn Predictor>, metrics: ServiceMetrics) -> Router {
    let state = Arc::new(AppState::new(
        predictor,
        metrics,
        StructuredLogger::new("test"),
        None,
    ));
    api::create_router(state)
}

fn setup_test_app() -> (Router, ServiceMetrics) {
    let metrics = ServiceMetrics::new().unwrap();
    let service = PredictionServiceBuilder::new()
        .bundle(synthetic_bundle())
        .metrics(metrics.clone())
        .build()
        .unwrap();
    (setup_test_app_with(Arc::new(service), metrics.clone()), metrics)
}

fn features_with_first(first: f64) -> Vec<f64> {
    let mut values = vec![0.0; NUM_FEATURES];
    values[0] = first;
    values
}

fn predict_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let (app, metrics) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model"], "SVM loaded");
    assert!(health.get("version").is_none());
    assert_eq!(metrics.request_count("/health", "GET"), 1);
}

#[tokio::test]
async fn test_health_includes_version_when_set() {
    let metrics = ServiceMetrics::new().unwrap();
    let service = PredictionServiceBuilder::new()
        .bundle(synthetic_bundle())
        .metrics(metrics.clone())
        .build()
        .unwrap();
    let state = Arc::new(AppState::new(
        Arc::new(service),
        metrics,
        StructuredLogger::new("test"),
        Some("1.4.2".to_string()),
    ));

    let response = api::create_router(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(body_json(response).await["version"], "1.4.2");
}

#[tokio::test]
async fn test_predict_valid_vector() {
    let (app, metrics) = setup_test_app();

    let response = app
        .oneshot(predict_request(
            serde_json::json!({ "features": features_with_first(2.0) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["prediction"], 1);
    assert_eq!(body["diagnosis"], "benign");
    let p = body["probability_benign"].as_f64().unwrap();
    assert!(p > 0.5 && p <= 1.0);

    assert_eq!(metrics.prediction_count(Diagnosis::Benign), 1);
    assert_eq!(metrics.request_count("/predict", "POST"), 1);
}

#[tokio::test]
async fn test_predict_malignant_side() {
    let (app, _metrics) = setup_test_app();

    let response = app
        .oneshot(predict_request(
            serde_json::json!({ "features": features_with_first(-2.0) }),
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["prediction"], 0);
    assert_eq!(body["diagnosis"], "malignant");
    assert!(body["probability_benign"].as_f64().unwrap() < 0.5);
}

#[tokio::test]
async fn test_predict_named_features() {
    let (app, _metrics) = setup_test_app();
    let names = load_breast_cancer().unwrap().feature_names;

    let mut features = serde_json::Map::new();
    for (i, name) in names.iter().enumerate() {
        let value = if i == 0 { 2.0 } else { 0.0 };
        features.insert(name.clone(), serde_json::json!(value));
    }

    let response = app
        .oneshot(predict_request(serde_json::json!({ "features": features })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["diagnosis"], "benign");
}

#[tokio::test]
async fn test_predict_rejects_29_values() {
    let (app, metrics) = setup_test_app();

    let response = app
        .oneshot(predict_request(
            serde_json::json!({ "features": vec![1.0; NUM_FEATURES - 1] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_features");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Exactly 30 features are required, got 29"));

    assert_eq!(metrics.total_predictions(), 0);
    assert_eq!(metrics.latency_sample_count(), 0);
    assert_eq!(metrics.request_count("/predict", "POST"), 1);
}

#[tokio::test]
async fn test_predict_rejects_malformed_json() {
    let (app, metrics) = setup_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"features": [1.0, "abc"]"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "invalid_features");
    assert_eq!(metrics.total_predictions(), 0);
}

#[tokio::test]
async fn test_prediction_counter_matches_successes() {
    let (app, metrics) = setup_test_app();

    for i in 0..5 {
        let first = if i % 2 == 0 { 1.5 } else { -1.5 };
        let response = app
            .clone()
            .oneshot(predict_request(
                serde_json::json!({ "features": features_with_first(first) }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(metrics.total_predictions(), 5);
    assert_eq!(metrics.prediction_count(Diagnosis::Benign), 3);
    assert_eq!(metrics.prediction_count(Diagnosis::Malignant), 2);
    assert_eq!(metrics.request_count("/predict", "POST"), 5);
}

#[tokio::test]
async fn test_zero_vector_is_reproducible() {
    let (app, _metrics) = setup_test_app();

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(predict_request(
                serde_json::json!({ "features": vec![0.0; NUM_FEATURES] }),
            ))
            .await
            .unwrap();
        bodies.push(body_json(response).await);
    }
    assert_eq!(bodies[0], bodies[1]);
}

struct FailingPredictor {
    schema: FeatureSchema,
}

impl Predictor for FailingPredictor {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_vector(&self, _features: &FeatureVector) -> Result<PredictionResult, PredictError> {
        Err(PredictError::Inference("model exploded".to_string()))
    }
}

#[tokio::test]
async fn test_inference_failure_returns_500() {
    let metrics = ServiceMetrics::new().unwrap();
    let predictor = Arc::new(FailingPredictor {
        schema: synthetic_bundle().schema,
    });
    let app = setup_test_app_with(predictor, metrics.clone());

    let response = app
        .clone()
        .oneshot(predict_request(
            serde_json::json!({ "features": vec![0.0; NUM_FEATURES] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Prediction error: model exploded");
    assert_eq!(body["code"], "inference_error");

    // The service keeps answering after a failure
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, metrics) = setup_test_app();
    app.oneshot(predict_request(
        serde_json::json!({ "features": features_with_first(1.0) }),
    ))
    .await
    .unwrap();

    let response = api::metrics_router(metrics)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("app_requests_total{endpoint=\"/predict\",method=\"POST\"} 1"));
    assert!(text.contains("app_predictions_total{prediction=\"benign\"} 1"));
    assert!(text.contains("app_prediction_latency_seconds_count 1"));
}

#[tokio::test]
async fn test_form_page_lists_every_feature() {
    let (app, _metrics) = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("name=\"feature0\""));
    assert!(html.contains("name=\"feature29\""));
    assert!(html.contains("mean radius"));
    assert!(html.contains("worst fractal dimension"));
}

fn form_body(values: &[String]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("feature{}={}", i, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn form_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_form_submission_renders_diagnosis() {
    let (app, metrics) = setup_test_app();
    let values: Vec<String> = features_with_first(-2.0).iter().map(|v| v.to_string()).collect();

    let response = app.oneshot(form_request(form_body(&values))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(">Malignant<"));
    assert!(html.contains("Probability benign:"));
    assert!(html.contains("value=\"-2\""));
    assert_eq!(metrics.prediction_count(Diagnosis::Malignant), 1);
    assert_eq!(metrics.request_count("/", "POST"), 1);
}

#[tokio::test]
async fn test_form_error_is_escaped() {
    let (app, metrics) = setup_test_app();
    let mut values: Vec<String> = vec!["0".to_string(); NUM_FEATURES];
    values[3] = "%3Cscript%3E".to_string();

    let response = app.oneshot(form_request(form_body(&values))).await.unwrap();

    let html = body_text(response).await;
    assert!(html.contains("Error: "));
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
    assert_eq!(metrics.total_predictions(), 0);
}

#[tokio::test]
async fn test_missing_artifacts_fail_before_serving() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = ArtifactStore::new(dir.path()).load();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("scaler.json"));
}

#[tokio::test]
async fn test_served_over_tcp() {
    let (app, _metrics) = setup_test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(api::serve_listener(listener, app));

    let client = reqwest::Client::new();
    let health: serde_json::Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    let response = client
        .post(format!("http://{}/predict", addr))
        .json(&serde_json::json!({ "features": features_with_first(3.0) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let result: PredictionResult = response.json().await.unwrap();
    assert_eq!(result.diagnosis, Diagnosis::Benign);
}
