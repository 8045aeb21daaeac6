//! Integration tests for the predictor API endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use insurance_server::{
    api::{create_router, AppState},
    config::ServiceConfig,
};
use predictor_lib::{
    generator::{generate, write_csv},
    models::round_cents,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_config(dir: &TempDir) -> ServiceConfig {
    ServiceConfig {
        dataset_path: dir.path().join("insurance.csv"),
        model_path: dir.path().join("insurance_model.bin"),
        encoders_path: dir.path().join("label_encoders.bin"),
        n_estimators: 8,
        max_depth: 6,
        ..ServiceConfig::default()
    }
}

fn write_dataset(dir: &TempDir) {
    write_csv(&dir.path().join("insurance.csv"), &generate(300, 42)).unwrap();
}

fn setup(config: &ServiceConfig) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, "test"));
    (create_router(state.clone()), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn predict(app: &Router, payload: Value) -> (StatusCode, Value) {
    send(app, "POST", "/predict", Body::from(payload.to_string())).await
}

fn young_non_smoker() -> Value {
    json!({
        "age": 25,
        "sex": "female",
        "bmi": 22.0,
        "children": 0,
        "smoker": "no",
        "region": "southwest"
    })
}

fn older_smoker() -> Value {
    json!({
        "age": 45,
        "sex": "male",
        "bmi": 35.0,
        "children": 2,
        "smoker": "yes",
        "region": "northeast"
    })
}

#[tokio::test]
async fn test_health_before_initialization() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup(&test_config(&dir));

    let (status, health) = send(&app, "GET", "/health", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["model_loaded"], false);
    assert_eq!(health["state"], "unloaded");
    assert!(health["timestamp"].is_string());
    assert!(health["version"].is_string());
}

#[tokio::test]
async fn test_readyz_tracks_initialization() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let (app, state) = setup(&test_config(&dir));

    let (status, _) = send(&app, "GET", "/readyz", Body::empty()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    state.initialize().await;

    let (status, readiness) = send(&app, "GET", "/readyz", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);

    let (_, health) = send(&app, "GET", "/health", Body::empty()).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["state"], "loaded");
    assert_eq!(health["training_rows"], 300);
}

#[tokio::test]
async fn test_failed_initialization_is_not_ready() {
    let dir = TempDir::new().unwrap();
    let (app, state) = setup(&test_config(&dir));

    state.initialize().await;

    let (status, readiness) = send(&app, "GET", "/readyz", Body::empty()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(readiness["reason"].as_str().unwrap().contains("model"));

    let (status, health) = send(&app, "GET", "/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["model_loaded"], false);
}

#[tokio::test]
async fn test_predict_success() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let (app, state) = setup(&test_config(&dir));
    state.initialize().await;

    let (status, body) = predict(&app, young_non_smoker()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Prediction successful");
    let usd = body["predicted_charges_usd"].as_f64().unwrap();
    let inr = body["predicted_charges_inr"].as_f64().unwrap();
    assert!(usd > 0.0);
    assert_eq!(inr, round_cents(usd * 83.0));
}

#[tokio::test]
async fn test_predict_orders_profiles() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let (app, state) = setup(&test_config(&dir));
    state.initialize().await;

    let (_, low) = predict(&app, young_non_smoker()).await;
    let (_, high) = predict(&app, older_smoker()).await;

    assert!(
        low["predicted_charges_usd"].as_f64().unwrap()
            < high["predicted_charges_usd"].as_f64().unwrap()
    );
}

#[tokio::test]
async fn test_predict_trains_lazily() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let (app, state) = setup(&test_config(&dir));

    let (status, _) = predict(&app, older_smoker()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(state.lifecycle.is_loaded().await);
}

#[tokio::test]
async fn test_predict_missing_field() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let (app, _state) = setup(&test_config(&dir));

    for field in ["age", "sex", "bmi", "children", "smoker", "region"] {
        let mut payload = young_non_smoker();
        payload.as_object_mut().unwrap().remove(field);

        let (status, body) = predict(&app, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "field {field}");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing field");
        assert_eq!(
            body["message"],
            format!("Missing required field: {field}")
        );
    }
}

#[tokio::test]
async fn test_predict_invalid_values_are_client_errors() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let (app, _state) = setup(&test_config(&dir));

    let (status, body) = predict(
        &app,
        json!({
            "age": "invalid",
            "sex": "unknown",
            "bmi": -5,
            "children": "many",
            "smoker": "maybe",
            "region": "mars"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 6);
    assert_eq!(details[0]["field"], "age");
    assert_eq!(details[0]["kind"], "type");
}

#[tokio::test]
async fn test_predict_out_of_range() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let (app, _state) = setup(&test_config(&dir));

    for (field, value) in [
        ("age", json!(17)),
        ("age", json!(101)),
        ("bmi", json!(9.9)),
        ("bmi", json!(50.5)),
        ("children", json!(11)),
        ("children", json!(-1)),
        ("sex", json!("Male")),
        ("smoker", json!("true")),
        ("region", json!("north")),
    ] {
        let mut payload = older_smoker();
        payload[field] = value;

        let (status, body) = predict(&app, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{field}");
        assert_eq!(body["details"][0]["field"], field);
    }
}

#[tokio::test]
async fn test_predict_invalid_json() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup(&test_config(&dir));

    let (status, body) = send(&app, "POST", "/predict", Body::from("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON");

    let (status, body) = send(&app, "POST", "/predict", Body::from("[1, 2]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON");
}

#[tokio::test]
async fn test_predict_without_model_or_dataset() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup(&test_config(&dir));

    // Validation runs first, so bad input is still a 400
    let (status, _) = predict(&app, json!({"age": 30})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = predict(&app, young_non_smoker()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Model not loaded");
    // Paths and causes stay in the logs
    assert!(!body["message"].as_str().unwrap().contains("insurance.csv"));
}

#[tokio::test]
async fn test_train_endpoint() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let config = test_config(&dir);
    let (app, _state) = setup(&config);

    let (status, body) = send(&app, "POST", "/train", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Model trained successfully");
    assert_eq!(body["training_rows"], 300);
    assert!(config.model_path.exists());
    assert!(config.encoders_path.exists());
}

#[tokio::test]
async fn test_failed_train_keeps_serving() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let config = test_config(&dir);
    let (app, state) = setup(&config);
    state.initialize().await;
    let (_, before) = predict(&app, older_smoker()).await;

    std::fs::remove_file(&config.dataset_path).unwrap();
    let (status, body) = send(&app, "POST", "/train", Body::empty()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Training error");
    assert_eq!(body["message"], "Error training model");
    assert!(!body.to_string().contains("insurance.csv"));

    let (status, after) = predict(&app, older_smoker()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        before["predicted_charges_usd"],
        after["predicted_charges_usd"]
    );

    let (_, health) = send(&app, "GET", "/health", Body::empty()).await;
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["model_loaded"], true);
}

#[tokio::test]
async fn test_retrain_is_reproducible() {
    let dir = TempDir::new().unwrap();
    write_dataset(&dir);
    let (app, _state) = setup(&test_config(&dir));

    send(&app, "POST", "/train", Body::empty()).await;
    let (_, first) = predict(&app, older_smoker()).await;
    send(&app, "POST", "/train", Body::empty()).await;
    let (_, second) = predict(&app, older_smoker()).await;

    assert_eq!(
        first["predicted_charges_usd"],
        second["predicted_charges_usd"]
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup(&test_config(&dir));

    // Populate the request counter first
    send(&app, "GET", "/health", Body::empty()).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("insurance_predictor_http_requests_total"));
}

#[tokio::test]
async fn test_metrics_disabled() {
    let dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        enable_metrics: false,
        ..test_config(&dir)
    };
    let (app, _state) = setup(&config);

    let (status, body) = send(&app, "GET", "/metrics", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Metrics disabled");
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup(&test_config(&dir));

    let (status, body) = send(&app, "GET", "/nope", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_security_headers() {
    let dir = TempDir::new().unwrap();
    let request = || {
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap()
    };

    let (plain, _) = setup(&test_config(&dir));
    let response = plain.oneshot(request()).await.unwrap();
    assert!(response.headers().get(header::X_FRAME_OPTIONS).is_none());

    let config = ServiceConfig {
        security_headers: true,
        ..test_config(&dir)
    };
    let (hardened, _) = setup(&config);
    let response = hardened.oneshot(request()).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
    assert!(headers.contains_key(header::REFERRER_POLICY));
    assert!(headers.contains_key(header::X_XSS_PROTECTION));
}
