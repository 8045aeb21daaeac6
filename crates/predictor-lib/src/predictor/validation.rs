//! Request validation
//!
//! Turns a loosely typed JSON object into a [`PredictionRequest`]. Missing
//! fields are reported before any coercion is attempted; otherwise every
//! field is checked and all failures are returned together.

use crate::models::{CategoryLabel, PredictionRequest, Region, Sex, Smoker, FEATURE_NAMES};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Fields every prediction request must carry
pub const REQUIRED_FIELDS: [&str; 6] = FEATURE_NAMES;

pub const AGE_RANGE: (f64, f64) = (18.0, 100.0);
pub const BMI_RANGE: (f64, f64) = (10.0, 50.0);
pub const CHILDREN_RANGE: (i64, i64) = (0, 10);

/// Why a single field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Missing,
    /// Value could not be coerced to the field's type
    Type,
    Range,
    NotAllowed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

/// A rejected request, one entry per failing field
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// True when the request was rejected for absent fields
    pub fn is_missing_fields(&self) -> bool {
        self.errors
            .first()
            .map(|e| e.kind == FieldErrorKind::Missing)
            .unwrap_or(false)
    }

    /// Short error label for API responses
    pub fn label(&self) -> &'static str {
        if self.is_missing_fields() {
            "Missing field"
        } else {
            "Validation error"
        }
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.field).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_missing_fields() {
            let fields = self.fields().join(", ");
            return write!(f, "Missing required field: {fields}");
        }
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Validate a request body into a typed request
pub fn validate_request(body: &Map<String, Value>) -> Result<PredictionRequest, ValidationError> {
    let missing: Vec<FieldError> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !body.contains_key(**f))
        .map(|f| FieldError::new(*f, FieldErrorKind::Missing, format!("Missing required field: {f}")))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError { errors: missing });
    }

    let mut errors = Vec::new();

    let age = or_record(
        coerce_float("age", &body["age"])
            .and_then(|v| check_range("age", v, AGE_RANGE, "Age must be between 18 and 100")),
        &mut errors,
    );
    let sex = or_record(
        parse_label::<Sex>("sex", &body["sex"], "Sex must be 'male' or 'female'"),
        &mut errors,
    );
    let bmi = or_record(
        coerce_float("bmi", &body["bmi"])
            .and_then(|v| check_range("bmi", v, BMI_RANGE, "BMI must be between 10 and 50")),
        &mut errors,
    );
    let children = or_record(
        coerce_int("children", &body["children"]).and_then(check_children),
        &mut errors,
    );
    let smoker = or_record(
        parse_label::<Smoker>("smoker", &body["smoker"], "Smoker must be 'yes' or 'no'"),
        &mut errors,
    );
    let region_message = format!("Region must be one of: {}", Region::allowed().join(", "));
    let region = or_record(
        parse_label::<Region>("region", &body["region"], &region_message),
        &mut errors,
    );

    match (age, sex, bmi, children, smoker, region) {
        (Some(age), Some(sex), Some(bmi), Some(children), Some(smoker), Some(region)) => {
            Ok(PredictionRequest {
                age,
                sex,
                bmi,
                children,
                smoker,
                region,
            })
        }
        _ => Err(ValidationError { errors }),
    }
}

fn or_record<T>(result: Result<T, FieldError>, errors: &mut Vec<FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

fn capitalized(field: &str) -> String {
    if field == "bmi" {
        return "BMI".to_string();
    }
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Numbers and numeric strings become floats
fn coerce_float(field: &'static str, value: &Value) -> Result<f64, FieldError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        FieldError::new(
            field,
            FieldErrorKind::Type,
            format!("{} must be a number", capitalized(field)),
        )
    })
}

/// Integers, floats (truncated toward zero) and integer strings become integers
fn coerce_int(field: &'static str, value: &Value) -> Result<i64, FieldError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        FieldError::new(
            field,
            FieldErrorKind::Type,
            format!("{} must be an integer", capitalized(field)),
        )
    })
}

fn check_range(
    field: &'static str,
    value: f64,
    (min, max): (f64, f64),
    message: &str,
) -> Result<f64, FieldError> {
    // NaN fails both comparisons
    if value >= min && value <= max {
        Ok(value)
    } else {
        Err(FieldError::new(field, FieldErrorKind::Range, message))
    }
}

fn check_children(value: i64) -> Result<u8, FieldError> {
    let (min, max) = CHILDREN_RANGE;
    if (min..=max).contains(&value) {
        Ok(value as u8)
    } else {
        Err(FieldError::new(
            "children",
            FieldErrorKind::Range,
            "Children must be between 0 and 10",
        ))
    }
}

fn parse_label<T: CategoryLabel>(
    field: &'static str,
    value: &Value,
    not_allowed: &str,
) -> Result<T, FieldError> {
    let Value::String(label) = value else {
        return Err(FieldError::new(
            field,
            FieldErrorKind::Type,
            format!("{} must be a string", capitalized(field)),
        ));
    };
    T::from_label(label).ok_or_else(|| FieldError::new(field, FieldErrorKind::NotAllowed, not_allowed))
}
