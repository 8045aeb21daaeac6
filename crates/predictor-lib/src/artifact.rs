//! On-disk persistence of the trained model and its encoders
//!
//! The two blobs are written with temp-file-then-rename and the encoder blob
//! records the SHA-256 of the model blob, so a loader can tell when the pair
//! on disk was not produced by the same training run.

use crate::encoder::EncoderSet;
use crate::error::ArtifactError;
use crate::training::{ForestModel, TrainedArtifact};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads and writes the model/encoder pair
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    model_path: PathBuf,
    encoders_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(model_path: impl Into<PathBuf>, encoders_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            encoders_path: encoders_path.into(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn encoders_path(&self) -> &Path {
        &self.encoders_path
    }

    /// Both blobs are present on disk
    pub fn exists(&self) -> bool {
        self.model_path.exists() && self.encoders_path.exists()
    }

    /// Persist an artifact, returning it with its model checksum filled in
    pub fn save(&self, mut artifact: TrainedArtifact) -> Result<TrainedArtifact, ArtifactError> {
        let model_bytes = bincode::serialize(&artifact.model)
            .map_err(|e| ArtifactError::Encode(e.to_string()))?;
        artifact.encoders.model_checksum = compute_checksum(&model_bytes);

        let encoder_bytes = bincode::serialize(&artifact.encoders)
            .map_err(|e| ArtifactError::Encode(e.to_string()))?;

        let model_tmp = write_temp(&self.model_path, &model_bytes)?;
        let encoders_tmp = write_temp(&self.encoders_path, &encoder_bytes)?;

        fs::rename(&model_tmp, &self.model_path)
            .map_err(|e| ArtifactError::io(&self.model_path, e))?;
        fs::rename(&encoders_tmp, &self.encoders_path)
            .map_err(|e| ArtifactError::io(&self.encoders_path, e))?;

        info!(
            model_path = %self.model_path.display(),
            encoders_path = %self.encoders_path.display(),
            model_bytes = model_bytes.len(),
            checksum = %artifact.encoders.model_checksum,
            "Artifact saved"
        );

        Ok(artifact)
    }

    /// Load the pair from disk and verify they belong together
    pub fn load(&self) -> Result<TrainedArtifact, ArtifactError> {
        let encoder_bytes =
            fs::read(&self.encoders_path).map_err(|e| ArtifactError::io(&self.encoders_path, e))?;
        let model_bytes =
            fs::read(&self.model_path).map_err(|e| ArtifactError::io(&self.model_path, e))?;

        let encoders: EncoderSet = decode(&self.encoders_path, &encoder_bytes)?;

        let actual = compute_checksum(&model_bytes);
        if actual != encoders.model_checksum {
            return Err(ArtifactError::Inconsistent {
                expected: encoders.model_checksum,
                actual,
            });
        }

        let model: ForestModel = decode(&self.model_path, &model_bytes)?;

        debug!(
            checksum = %actual,
            training_rows = encoders.training_rows,
            "Artifact loaded"
        );

        Ok(TrainedArtifact { model, encoders })
    }
}

fn decode<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, ArtifactError> {
    bincode::deserialize(bytes).map_err(|e| ArtifactError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Temp file beside `path`, named after the full file name so paths that
/// share a stem never collide
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to the temp file for `path` and sync it
fn write_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    let mut file = File::create(&temp_path).map_err(|e| ArtifactError::io(&temp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| ArtifactError::io(&temp_path, e))?;
    file.sync_all()
        .map_err(|e| ArtifactError::io(&temp_path, e))?;

    Ok(temp_path)
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
