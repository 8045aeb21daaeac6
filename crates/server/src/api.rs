//! HTTP API: prediction, training, health and Prometheus metrics

use crate::config::ServiceConfig;
use axum::{
    body::Bytes,
    extract::{MatchedPath, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    health::{ComponentHealth, ComponentStatus, HealthRegistry},
    lifecycle::{LifecycleSnapshot, ModelLifecycle},
    observability::{error_chain, render_metrics, ServiceMetrics, StructuredLogger},
    predictor::{PredictError, PredictionPipeline},
    ArtifactStore, ChargeEstimate,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
pub struct AppState {
    pub lifecycle: ModelLifecycle,
    pub pipeline: PredictionPipeline,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub enable_metrics: bool,
    pub security_headers: bool,
}

impl AppState {
    pub fn new(config: &ServiceConfig, instance: &str) -> Self {
        let health_registry = HealthRegistry::new();
        let metrics = ServiceMetrics::new();
        let logger = StructuredLogger::new(instance);
        let store = ArtifactStore::new(&config.model_path, &config.encoders_path);
        let lifecycle = ModelLifecycle::new(
            config.lifecycle(),
            store,
            health_registry.clone(),
            metrics.clone(),
            logger.clone(),
        );

        Self {
            lifecycle,
            pipeline: PredictionPipeline::new(config.usd_to_inr_rate),
            health_registry,
            metrics,
            logger,
            enable_metrics: config.enable_metrics,
            security_headers: config.security_headers,
        }
    }

    /// Load or train the model, then mark the service initialized
    ///
    /// Failure is logged and leaves the service unloaded; predictions will
    /// retry lazily.
    pub async fn initialize(&self) {
        match self.lifecycle.initialize().await {
            Ok(outcome) => info!(?outcome, "Model ready"),
            Err(e) => error!(
                error = %error_chain(&e),
                "Model initialization failed; service starts without a model"
            ),
        }
        self.health_registry.set_initialized(true).await;
    }
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: ComponentStatus,
    #[serde(flatten)]
    model: LifecycleSnapshot,
    timestamp: String,
    version: &'static str,
    components: BTreeMap<String, ComponentHealth>,
}

/// Health check; always 200, the body carries the verdict
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.health_registry.report().await;

    Json(HealthBody {
        status: report.status,
        model: state.lifecycle.snapshot().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: SERVICE_VERSION,
        components: report.components,
    })
}

/// Readiness check - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut readiness = state.health_registry.readiness().await;
    if readiness.ready && !state.lifecycle.is_loaded().await {
        readiness.ready = false;
        readiness.reason = Some("No model loaded".to_string());
    }

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let start = Instant::now();

    match run_prediction(&state, &body).await {
        Ok(estimate) => {
            let elapsed = start.elapsed();
            state.metrics.observe_prediction(elapsed.as_secs_f64());
            state
                .logger
                .log_prediction(estimate.usd, estimate.inr, elapsed.as_micros() as u64);

            Json(json!({
                "success": true,
                "predicted_charges_usd": estimate.usd,
                "predicted_charges_inr": estimate.inr,
                "message": "Prediction successful",
            }))
            .into_response()
        }
        Err(e) if e.is_client_error() => {
            state.metrics.inc_validation_failures();
            let mut body = json!({
                "success": false,
                "error": e.label(),
                "message": e.public_message(),
            });
            if let PredictError::Validation(validation) = &e {
                body["details"] = json!(validation.errors());
            }
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
        Err(e) => {
            state.metrics.inc_prediction_errors();
            state.logger.log_prediction_failure(e.label(), &e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.label(),
                    "message": e.public_message(),
                })),
            )
                .into_response()
        }
    }
}

/// Validation happens before the model is touched, so a bad request is a
/// 400 even while no model is loaded
async fn run_prediction(
    state: &AppState,
    body: &[u8],
) -> Result<ChargeEstimate, PredictError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| {
        PredictError::InvalidJson("Request must contain valid JSON data".to_string())
    })?;
    let request = state.pipeline.validate(&value)?;
    let artifact = state.lifecycle.ensure_loaded().await?;
    state
        .pipeline
        .predict(&request, &artifact.model, &artifact.encoders)
}

async fn train(State(state): State<Arc<AppState>>) -> Response {
    match state.lifecycle.retrain().await {
        Ok(report) => Json(json!({
            "success": true,
            "message": "Model trained successfully",
            "training_rows": report.rows,
            "duration_ms": report.duration_ms,
        }))
        .into_response(),
        // The lifecycle has already logged the cause; callers get a fixed label
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "Training error",
                "message": "Error training model",
            })),
        )
            .into_response(),
    }
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    if !state.enable_metrics {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Metrics disabled",
                "message": "Metrics collection is disabled",
            })),
        )
            .into_response();
    }

    match render_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "message": "Something went wrong",
                })),
            )
                .into_response()
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "message": "The requested resource was not found",
        })),
    )
}

const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=31536000; includeSubDomains",
    ),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
];

/// Log and count every request, and attach security headers when enabled
async fn track_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    // Unmatched paths share one label to keep metric cardinality bounded
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    info!(
        method = %method,
        path = %path,
        status = status,
        duration_secs = elapsed.as_secs_f64(),
        "{} {} - {} - {:.3}s",
        method,
        path,
        status,
        elapsed.as_secs_f64()
    );
    state
        .metrics
        .observe_request(method.as_str(), &endpoint, status, elapsed.as_secs_f64());

    if state.security_headers {
        let headers = response.headers_mut();
        for (name, value) in SECURITY_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }

    response
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/predict", post(predict))
        .route("/train", post(train))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
