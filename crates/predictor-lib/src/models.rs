//! Core data models for the insurance charge predictor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the model input features, in the order the forest sees them.
///
/// Training and inference both build their rows from this order; a row built
/// any other way silently corrupts predictions.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] =
    ["age", "sex", "bmi", "children", "smoker", "region"];

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = 6;

/// Name of the training target column
pub const TARGET_NAME: &str = "charges";

/// Biological sex as recorded in the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// Smoking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoker {
    Yes,
    No,
}

/// US region of residence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Southwest,
    Southeast,
    Northwest,
    Northeast,
}

/// Label set shared by the categorical enums
pub trait CategoryLabel: Sized + Copy + 'static {
    /// All variants in declaration order
    const ALL: &'static [Self];

    /// Wire/dataset label of the variant
    fn as_str(&self) -> &'static str;

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == label)
    }

    /// Accepted labels, in declaration order
    fn allowed() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.as_str()).collect()
    }
}

impl CategoryLabel for Sex {
    const ALL: &'static [Self] = &[Sex::Male, Sex::Female];

    fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl CategoryLabel for Smoker {
    const ALL: &'static [Self] = &[Smoker::Yes, Smoker::No];

    fn as_str(&self) -> &'static str {
        match self {
            Smoker::Yes => "yes",
            Smoker::No => "no",
        }
    }
}

impl CategoryLabel for Region {
    const ALL: &'static [Self] = &[
        Region::Southwest,
        Region::Southeast,
        Region::Northwest,
        Region::Northeast,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Region::Southwest => "southwest",
            Region::Southeast => "southeast",
            Region::Northwest => "northwest",
            Region::Northeast => "northeast",
        }
    }
}

macro_rules! display_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_label!(Sex, Smoker, Region);

/// One labelled row of the training dataset
///
/// Categorical columns stay as raw strings: the encoder learns whatever
/// labels the dataset actually contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceRecord {
    pub age: u32,
    pub sex: String,
    pub bmi: f64,
    pub children: u32,
    pub smoker: String,
    pub region: String,
    pub charges: f64,
}

/// A prediction request after validation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub age: f64,
    pub sex: Sex,
    pub bmi: f64,
    pub children: u8,
    pub smoker: Smoker,
    pub region: Region,
}

/// Model input row, ordered as [`FEATURE_NAMES`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedFeatureVector([f32; NUM_FEATURES]);

impl EncodedFeatureVector {
    pub fn new(
        age: f64,
        sex_code: u32,
        bmi: f64,
        children: u32,
        smoker_code: u32,
        region_code: u32,
    ) -> Self {
        Self([
            age as f32,
            sex_code as f32,
            bmi as f32,
            children as f32,
            smoker_code as f32,
            region_code as f32,
        ])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Successful prediction, both values rounded to cents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargeEstimate {
    pub usd: f64,
    pub inr: f64,
}

/// Round to two decimal places
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
