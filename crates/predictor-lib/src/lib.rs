//! Core library for the insurance charge predictor
//!
//! This crate provides the core functionality for:
//! - Dataset loading and synthetic dataset generation
//! - Categorical encoding and random forest training
//! - Artifact persistence with checksum pairing
//! - Request validation and prediction
//! - Model lifecycle management
//! - Health checks and observability

pub mod artifact;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod generator;
pub mod health;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod training;

pub use artifact::ArtifactStore;
pub use encoder::{CategoryEncoding, EncoderSet, ForestConfig};
pub use error::{ArtifactError, EncodingError, TrainingError};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthReport, ReadinessResponse};
pub use lifecycle::{InitOutcome, LifecycleConfig, LifecycleSnapshot, LifecycleState, ModelLifecycle};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{ChargeModel, PredictError, PredictionPipeline};
pub use training::{TrainedArtifact, TrainingReport};
