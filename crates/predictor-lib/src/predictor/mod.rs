//! Prediction pipeline: request validation, encoding and inference

mod pipeline;
mod validation;


pub use pipeline::{PredictionPipeline, DEFAULT_USD_TO_INR_RATE};
pub use validation::{
    validate_request, FieldError, FieldErrorKind, ValidationError, AGE_RANGE, BMI_RANGE,
    CHILDREN_RANGE, REQUIRED_FIELDS,
};

use crate::error::EncodingError;
use crate::models::EncodedFeatureVector;

/// Trait for charge model implementations
pub trait ChargeModel: Send + Sync {
    /// Predicted charge in USD for one encoded row
    fn predict(&self, features: &EncodedFeatureVector) -> f64;
}

/// Prediction failures
///
/// `InvalidJson` and `Validation` are caused by the caller; the rest point at
/// the service or its artifact.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("{0}")]
    InvalidJson(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A validated label is absent from the loaded encoders.
    #[error("encoder does not match the request domain: {0}")]
    Encoding(#[from] EncodingError),

    #[error("model is not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("model produced a non-finite prediction")]
    NonFinitePrediction,
}

impl PredictError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::InvalidJson(_) | PredictError::Validation(_))
    }

    /// Short error label for API responses
    pub fn label(&self) -> &'static str {
        match self {
            PredictError::InvalidJson(_) => "Invalid JSON",
            PredictError::Validation(e) => e.label(),
            PredictError::Encoding(_) => "Encoding error",
            PredictError::ModelNotLoaded(_) => "Model not loaded",
            PredictError::NonFinitePrediction => "Prediction error",
        }
    }

    /// Message safe to show callers; server-side details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            PredictError::InvalidJson(msg) => msg.clone(),
            PredictError::Validation(e) => e.to_string(),
            PredictError::Encoding(_) => "Error processing categorical data".to_string(),
            PredictError::ModelNotLoaded(_) => "Model is not available".to_string(),
            PredictError::NonFinitePrediction => "Error generating prediction".to_string(),
        }
    }
}
