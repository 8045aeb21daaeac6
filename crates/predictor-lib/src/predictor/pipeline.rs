//! Validation → encoding → inference → currency conversion

use super::validation::validate_request;
use super::{ChargeModel, PredictError};
use crate::encoder::EncoderSet;
use crate::models::{round_cents, CategoryLabel, ChargeEstimate, EncodedFeatureVector, PredictionRequest};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Default USD → INR conversion rate
pub const DEFAULT_USD_TO_INR_RATE: f64 = 83.0;

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

/// Stateless prediction pipeline parameterised by the conversion rate
#[derive(Debug, Clone, Copy)]
pub struct PredictionPipeline {
    usd_to_inr_rate: f64,
}

impl Default for PredictionPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_USD_TO_INR_RATE)
    }
}

impl PredictionPipeline {
    pub fn new(usd_to_inr_rate: f64) -> Self {
        Self { usd_to_inr_rate }
    }

    pub fn usd_to_inr_rate(&self) -> f64 {
        self.usd_to_inr_rate
    }

    /// Parse and validate a raw request body
    pub fn validate(&self, body: &Value) -> Result<PredictionRequest, PredictError> {
        let Value::Object(map) = body else {
            return Err(PredictError::InvalidJson(
                "Request must contain a JSON object".to_string(),
            ));
        };
        Ok(validate_request(map)?)
    }

    /// Encode a validated request with the artifact's encoders
    pub fn encode(
        &self,
        request: &PredictionRequest,
        encoders: &EncoderSet,
    ) -> Result<EncodedFeatureVector, PredictError> {
        Ok(EncodedFeatureVector::new(
            request.age,
            encoders.sex.transform(request.sex.as_str())?,
            request.bmi,
            u32::from(request.children),
            encoders.smoker.transform(request.smoker.as_str())?,
            encoders.region.transform(request.region.as_str())?,
        ))
    }

    /// Run the model and convert its output
    pub fn estimate(
        &self,
        model: &dyn ChargeModel,
        features: &EncodedFeatureVector,
    ) -> Result<ChargeEstimate, PredictError> {
        let start = Instant::now();
        let raw_usd = model.predict(features);

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        if !raw_usd.is_finite() {
            return Err(PredictError::NonFinitePrediction);
        }

        // INR derives from the rounded USD so the two returned figures agree
        let usd = round_cents(raw_usd);
        let inr = round_cents(usd * self.usd_to_inr_rate);
        Ok(ChargeEstimate { usd, inr })
    }

    /// Predict for an already validated request
    pub fn predict(
        &self,
        request: &PredictionRequest,
        model: &dyn ChargeModel,
        encoders: &EncoderSet,
    ) -> Result<ChargeEstimate, PredictError> {
        let features = self.encode(request, encoders)?;
        self.estimate(model, &features)
    }

    /// Validate, encode and predict in one step
    pub fn run(
        &self,
        body: &Value,
        model: &dyn ChargeModel,
        encoders: &EncoderSet,
    ) -> Result<ChargeEstimate, PredictError> {
        let request = self.validate(body)?;
        self.predict(&request, model, encoders)
    }
}
