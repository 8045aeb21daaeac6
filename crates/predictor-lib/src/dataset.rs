//! Training dataset loading
//!
//! Reads the insurance CSV and checks its header before any row is parsed,
//! so a dataset with the wrong shape fails loudly instead of training a model
//! on the wrong columns.

use crate::error::TrainingError;
use crate::models::{InsuranceRecord, FEATURE_NAMES, TARGET_NAME};
use std::path::Path;
use tracing::debug;

/// Column names the dataset must carry, in any order
pub fn required_columns() -> Vec<&'static str> {
    let mut columns = FEATURE_NAMES.to_vec();
    columns.push(TARGET_NAME);
    columns
}

/// Load every row of the dataset at `path`
pub fn load_dataset(path: &Path) -> Result<Vec<InsuranceRecord>, TrainingError> {
    if !path.exists() {
        return Err(TrainingError::DatasetMissing {
            path: path.to_path_buf(),
        });
    }

    let mut reader =
        csv::Reader::from_path(path).map_err(|source| TrainingError::DatasetUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| TrainingError::DatasetUnreadable {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    check_headers(headers.iter())?;

    let mut records = Vec::new();
    for row in reader.deserialize::<InsuranceRecord>() {
        let record = row.map_err(|e| TrainingError::MalformedRow {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    debug!(path = %path.display(), rows = records.len(), "Dataset loaded");
    Ok(records)
}

fn check_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Result<(), TrainingError> {
    let present: Vec<&str> = headers.map(str::trim).collect();
    let required = required_columns();

    let missing: Vec<String> = required
        .iter()
        .filter(|c| !present.contains(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TrainingError::MissingColumns { missing });
    }

    let unexpected: Vec<String> = present
        .iter()
        .filter(|c| !required.contains(c))
        .map(|c| c.to_string())
        .collect();
    if !unexpected.is_empty() {
        return Err(TrainingError::UnexpectedColumns { unexpected });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn test_load_valid_dataset() {
        let file = write_csv(
            "age,sex,bmi,children,smoker,region,charges\n\
             19,female,27.9,0,yes,southwest,1688.92\n\
             33,male,22.7,1,no,northwest,437.55\n",
        );

        let records = load_dataset(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].age, 19);
        assert_eq!(records[1].region, "northwest");
        assert!((records[0].charges - 1688.92).abs() < 1e-9);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let file = write_csv(
            "charges,region,smoker,children,bmi,sex,age\n\
             500.0,southeast,no,2,30.1,male,40\n",
        );

        let records = load_dataset(file.path()).unwrap();
        assert_eq!(records[0].age, 40);
        assert_eq!(records[0].children, 2);
    }

    #[test]
    fn test_missing_file() {
        let err = load_dataset(Path::new("/nonexistent/insurance.csv")).unwrap_err();
        assert!(matches!(err, TrainingError::DatasetMissing { .. }));
    }

    #[test]
    fn test_missing_column() {
        let file = write_csv("age,sex,bmi,children,smoker,charges\n30,male,25,0,no,300\n");

        match load_dataset(file.path()).unwrap_err() {
            TrainingError::MissingColumns { missing } => assert_eq!(missing, vec!["region"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unexpected_column() {
        let file = write_csv(
            "age,sex,bmi,children,smoker,region,charges,id\n\
             30,male,25,0,no,southwest,300,1\n",
        );

        assert!(matches!(
            load_dataset(file.path()).unwrap_err(),
            TrainingError::UnexpectedColumns { .. }
        ));
    }

    #[test]
    fn test_malformed_row() {
        let file = write_csv(
            "age,sex,bmi,children,smoker,region,charges\n\
             30,male,25,0,no,southwest,300\n\
             abc,male,25,0,no,southwest,300\n",
        );

        match load_dataset(file.path()).unwrap_err() {
            TrainingError::MalformedRow { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_dataset() {
        let file = write_csv("age,sex,bmi,children,smoker,region,charges\n");
        assert!(matches!(
            load_dataset(file.path()).unwrap_err(),
            TrainingError::EmptyDataset
        ));
    }
}
