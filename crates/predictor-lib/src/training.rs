//! Training pipeline: dataset → encoders → random forest
//!
//! Produces a [`TrainedArtifact`] in memory. Persisting it is the caller's
//! job, so a failed or abandoned run never touches the artifacts on disk.

use crate::dataset::load_dataset;
use crate::encoder::{CategoryEncoding, EncoderSet, ForestConfig};
use crate::error::{EncodingError, TrainingError};
use crate::models::{EncodedFeatureVector, InsuranceRecord, NUM_FEATURES};
use crate::predictor::ChargeModel;
use aprender::primitives::{Matrix, Vector};
use aprender::tree::RandomForestRegressor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Random forest wrapper used as the charge model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    forest: RandomForestRegressor,
}

impl ForestModel {
    /// Fit a forest on an already encoded feature matrix
    pub fn fit(
        config: &ForestConfig,
        features: &[EncodedFeatureVector],
        targets: &[f32],
    ) -> Result<Self, TrainingError> {
        let data: Vec<f32> = features
            .iter()
            .flat_map(|row| row.as_slice().iter().copied())
            .collect();
        let x = Matrix::from_vec(features.len(), NUM_FEATURES, data)
            .map_err(|e| TrainingError::Fit(e.to_string()))?;
        let y = Vector::from_slice(targets);

        let mut forest = RandomForestRegressor::new(config.n_estimators)
            .with_max_depth(config.max_depth)
            .with_random_state(config.random_seed);
        forest
            .fit(&x, &y)
            .map_err(|e| TrainingError::Fit(e.to_string()))?;

        Ok(Self { forest })
    }
}

impl ChargeModel for ForestModel {
    fn predict(&self, features: &EncodedFeatureVector) -> f64 {
        let Ok(row) = Matrix::from_vec(1, NUM_FEATURES, features.as_slice().to_vec()) else {
            return f64::NAN;
        };
        self.forest
            .predict(&row)
            .as_slice()
            .first()
            .copied()
            .map(f64::from)
            .unwrap_or(f64::NAN)
    }
}

/// A fitted model and the encoders it was trained with
#[derive(Debug, Clone)]
pub struct TrainedArtifact {
    pub model: ForestModel,
    pub encoders: EncoderSet,
}

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub duration_ms: u64,
    pub forest: ForestConfig,
}

/// Load the dataset at `path` and fit an artifact from it
pub fn train_from_path(
    path: &Path,
    config: &ForestConfig,
) -> Result<(TrainedArtifact, TrainingReport), TrainingError> {
    let records = load_dataset(path)?;
    train(&records, config)
}

/// Fit encoders and forest over `records`
///
/// The returned artifact has an empty `model_checksum`; the artifact store
/// fills it in when the model is serialized.
pub fn train(
    records: &[InsuranceRecord],
    config: &ForestConfig,
) -> Result<(TrainedArtifact, TrainingReport), TrainingError> {
    if records.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    let start = Instant::now();

    let sex = CategoryEncoding::fit("sex", records.iter().map(|r| r.sex.as_str()))?;
    let smoker = CategoryEncoding::fit("smoker", records.iter().map(|r| r.smoker.as_str()))?;
    let region = CategoryEncoding::fit("region", records.iter().map(|r| r.region.as_str()))?;

    let features = records
        .iter()
        .map(|r| encode_record(r, &sex, &smoker, &region))
        .collect::<Result<Vec<_>, EncodingError>>()?;
    let targets: Vec<f32> = records.iter().map(|r| r.charges as f32).collect();

    let model = ForestModel::fit(config, &features, &targets)?;

    let report = TrainingReport {
        rows: records.len(),
        duration_ms: start.elapsed().as_millis() as u64,
        forest: *config,
    };

    info!(
        rows = report.rows,
        n_estimators = config.n_estimators,
        max_depth = config.max_depth,
        duration_ms = report.duration_ms,
        "Random forest trained"
    );

    let encoders = EncoderSet {
        sex,
        smoker,
        region,
        model_checksum: String::new(),
        trained_at: chrono::Utc::now().timestamp(),
        training_rows: records.len(),
        forest: *config,
    };

    Ok((TrainedArtifact { model, encoders }, report))
}

fn encode_record(
    record: &InsuranceRecord,
    sex: &CategoryEncoding,
    smoker: &CategoryEncoding,
    region: &CategoryEncoding,
) -> Result<EncodedFeatureVector, EncodingError> {
    Ok(EncodedFeatureVector::new(
        record.age as f64,
        sex.transform(&record.sex)?,
        record.bmi,
        record.children,
        smoker.transform(&record.smoker)?,
        region.transform(&record.region)?,
    ))
}
