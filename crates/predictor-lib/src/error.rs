//! Error types for encoding, training and artifact persistence

use std::path::PathBuf;
use std::time::Duration;

/// Categorical encoding failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The label was never observed when the encoding was fit.
    #[error("unknown category '{value}' for field '{field}'")]
    UnknownCategory { field: String, value: String },

    /// No code maps back to a label.
    #[error("unknown code {code} for field '{field}'")]
    UnknownCode { field: String, code: u32 },

    /// An encoding cannot be fit over zero values.
    #[error("cannot fit encoding for field '{field}' on an empty column")]
    EmptyColumn { field: String },
}

/// Training pipeline failures
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("dataset not found at {path}")]
    DatasetMissing { path: PathBuf },

    #[error("failed to read dataset {path}")]
    DatasetUnreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset is missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("dataset has unexpected columns: {}", unexpected.join(", "))]
    UnexpectedColumns { unexpected: Vec<String> },

    #[error("malformed dataset row at line {line}: {message}")]
    MalformedRow { line: u64, message: String },

    #[error("dataset contains no rows")]
    EmptyDataset,

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("random forest fit failed: {0}")]
    Fit(String),

    #[error("training timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("training task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Persist(#[from] ArtifactError),
}

/// Artifact persistence failures
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact file not found at {path}")]
    NotFound { path: PathBuf },

    #[error("artifact I/O failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode artifact: {0}")]
    Encode(String),

    #[error("failed to decode artifact {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Model blob and encoder blob were not written together.
    #[error("model checksum {actual} does not match encoder record {expected}")]
    Inconsistent { expected: String, actual: String },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::NotFound { path }
        } else {
            ArtifactError::Io { path, source }
        }
    }

    /// True when the artifact is simply absent rather than damaged
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArtifactError::NotFound { .. })
    }
}
