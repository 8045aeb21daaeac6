//! Categorical label encoding
//!
//! Codes are assigned by sorting the distinct labels seen during fit, so the
//! same set of labels always yields the same codes regardless of row order.

use crate::error::EncodingError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Label to code mapping for one categorical field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    field: String,
    /// Sorted distinct labels; a label's index is its code
    classes: Vec<String>,
}

impl CategoryEncoding {
    /// Fit an encoding over every value of a column
    pub fn fit<I, S>(field: &str, values: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        if distinct.is_empty() {
            return Err(EncodingError::EmptyColumn {
                field: field.to_string(),
            });
        }

        Ok(Self {
            field: field.to_string(),
            classes: distinct.into_iter().collect(),
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Labels in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, value: &str) -> Result<u32, EncodingError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map(|idx| idx as u32)
            .map_err(|_| EncodingError::UnknownCategory {
                field: self.field.clone(),
                value: value.to_string(),
            })
    }

    pub fn inverse(&self, code: u32) -> Result<&str, EncodingError> {
        self.classes
            .get(code as usize)
            .map(String::as_str)
            .ok_or_else(|| EncodingError::UnknownCode {
                field: self.field.clone(),
                code,
            })
    }

    /// Label to code view, for logging and diagnostics
    pub fn mapping(&self) -> BTreeMap<&str, u32> {
        self.classes
            .iter()
            .enumerate()
            .map(|(code, label)| (label.as_str(), code as u32))
            .collect()
    }
}

/// Forest hyperparameters recorded with an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub random_seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            random_seed: 1,
        }
    }
}

/// The three encoders plus the metadata tying them to one model blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSet {
    pub sex: CategoryEncoding,
    pub smoker: CategoryEncoding,
    pub region: CategoryEncoding,
    /// SHA-256 of the serialized model this set was fit with
    pub model_checksum: String,
    pub trained_at: i64,
    pub training_rows: usize,
    pub forest: ForestConfig,
}
