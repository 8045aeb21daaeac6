//! Observability infrastructure for the insurance predictor
//!
//! Provides:
//! - Prometheus metrics (HTTP traffic, prediction latency, training runs, model state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Buckets for training runs, which take seconds to minutes
const TRAINING_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    http_requests: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    predictions: IntCounter,
    prediction_errors: IntCounter,
    validation_failures: IntCounter,
    prediction_latency_seconds: Histogram,
    training_duration_seconds: Histogram,
    training_runs: IntCounterVec,
    model_loaded: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            http_requests: register_int_counter_vec!(
                "insurance_predictor_http_requests_total",
                "Total HTTP requests",
                &["method", "endpoint", "status"]
            )
            .expect("Failed to register http_requests_total"),

            http_request_duration_seconds: register_histogram_vec!(
                "insurance_predictor_http_request_duration_seconds",
                "HTTP request duration",
                &["endpoint"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register http_request_duration_seconds"),

            predictions: register_int_counter!(
                "insurance_predictor_predictions_total",
                "Total predictions made"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter!(
                "insurance_predictor_prediction_errors_total",
                "Predictions that failed on the server side"
            )
            .expect("Failed to register prediction_errors_total"),

            validation_failures: register_int_counter!(
                "insurance_predictor_validation_failures_total",
                "Prediction requests rejected by validation"
            )
            .expect("Failed to register validation_failures_total"),

            prediction_latency_seconds: register_histogram!(
                "insurance_predictor_prediction_latency_seconds",
                "Time spent encoding and running the model for one prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            training_duration_seconds: register_histogram!(
                "insurance_predictor_training_duration_seconds",
                "Time spent training and persisting a model",
                TRAINING_BUCKETS.to_vec()
            )
            .expect("Failed to register training_duration_seconds"),

            training_runs: register_int_counter_vec!(
                "insurance_predictor_training_runs_total",
                "Training runs by outcome",
                &["outcome"]
            )
            .expect("Failed to register training_runs_total"),

            model_loaded: register_int_gauge!(
                "insurance_predictor_model_loaded",
                "1 when a model artifact is loaded and serving"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    /// Record a completed HTTP request
    pub fn observe_request(&self, method: &str, endpoint: &str, status: u16, duration_secs: f64) {
        self.inner()
            .http_requests
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.inner()
            .http_request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    /// Record a successful prediction and its latency
    pub fn observe_prediction(&self, duration_secs: f64) {
        self.inner().predictions.inc();
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn inc_validation_failures(&self) {
        self.inner().validation_failures.inc();
    }

    /// Record a training run
    pub fn observe_training(&self, duration_secs: f64, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.inner().training_runs.with_label_values(&[outcome]).inc();
        self.inner().training_duration_seconds.observe(duration_secs);
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }
}

/// Render every registered metric in the Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions, training
/// runs and lifecycle transitions.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a successful prediction
    pub fn log_prediction(&self, usd: f64, inr: f64, duration_us: u64) {
        info!(
            event = "prediction_made",
            instance = %self.instance,
            predicted_charges_usd = usd,
            predicted_charges_inr = inr,
            duration_us = duration_us,
            "Prediction successful"
        );
    }

    /// Log a server-side prediction failure with its full error chain
    pub fn log_prediction_failure(&self, label: &str, error: &dyn std::error::Error) {
        error!(
            event = "prediction_failed",
            instance = %self.instance,
            error_kind = %label,
            error = %error_chain(error),
            "Prediction failed"
        );
    }

    /// Log a completed training run
    pub fn log_model_trained(&self, rows: usize, duration_ms: u64, checksum: &str) {
        info!(
            event = "model_trained",
            instance = %self.instance,
            rows = rows,
            duration_ms = duration_ms,
            checksum = %checksum,
            "Model trained and saved"
        );
    }

    /// Log a failed training run
    pub fn log_training_failure(&self, error: &dyn std::error::Error, kept_previous: bool) {
        error!(
            event = "training_failed",
            instance = %self.instance,
            error = %error_chain(error),
            kept_previous = kept_previous,
            "Model training failed"
        );
    }

    /// Log an artifact loaded from disk
    pub fn log_model_loaded(&self, checksum: &str, training_rows: usize) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            checksum = %checksum,
            training_rows = training_rows,
            "Model and encoders loaded"
        );
    }

    /// Log an artifact that could not be used
    pub fn log_artifact_rejected(&self, error: &dyn std::error::Error) {
        warn!(
            event = "artifact_rejected",
            instance = %self.instance,
            error = %error_chain(error),
            "Persisted artifact unusable, retraining"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            port = port,
            "Insurance predictor started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Insurance predictor shutting down"
        );
    }
}

/// Join an error and its sources into one line
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
