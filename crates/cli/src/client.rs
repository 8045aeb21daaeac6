//! API client for communicating with the insurance predictor service

use anyhow::{Context, Result};
use predictor_lib::health::ComponentHealth;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// A non-success response from the service
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service answered with its JSON error envelope
    #[error("{error} ({status}): {message}")]
    Rejected {
        status: StatusCode,
        error: String,
        message: String,
        details: Vec<FieldDetail>,
    },

    #[error("API error ({status}): {body}")]
    Unexpected { status: StatusCode, body: String },
}

impl ApiError {
    pub fn is_client_error(&self) -> bool {
        match self {
            ApiError::Rejected { status, .. } | ApiError::Unexpected { status, .. } => {
                status.is_client_error()
            }
        }
    }
}

/// API client for the predictor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// Training can take minutes, so the request timeout is generous.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &body).into());
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("health").await
    }

    pub async fn predict(&self, request: &PredictRequest) -> Result<PredictResponse> {
        self.post("predict", request).await
    }

    pub async fn train(&self) -> Result<TrainResponse> {
        self.post("train", &serde_json::json!({})).await
    }
}

fn error_from_body(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(envelope) => ApiError::Rejected {
            status,
            error: envelope.error,
            message: envelope.message.unwrap_or_default(),
            details: envelope.details.unwrap_or_default(),
        },
        Err(_) => ApiError::Unexpected {
            status,
            body: body.to_string(),
        },
    }
}

// API request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub age: f64,
    pub sex: String,
    pub bmi: f64,
    pub children: i64,
    pub smoker: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub predicted_charges_usd: f64,
    pub predicted_charges_inr: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub state: String,
    pub timestamp: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_checksum: Option<String>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDetail {
    pub field: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldDetail>>,
}
