//! Read/write forecast bundle JSON files.
//!
//! A bundle file is the portable representation of one run:
//! - horizon, trailing-point mode and generation date
//! - per variable: history, forecast points and fit diagnostics
//! - the variables that failed, with their stage and message
//!
//! `sf plot --bundle` re-renders charts from it without refitting.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{BatchResult, ForecastBundle, SeriesFailure};
use crate::error::AppError;

/// On-disk schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleFile {
    pub tool: String,
    pub bundle: ForecastBundle,
    #[serde(default)]
    pub failures: Vec<SeriesFailure>,
}

impl BundleFile {
    pub fn from_batch(batch: &BatchResult) -> Self {
        Self {
            tool: "sf".to_string(),
            bundle: batch.successes.clone(),
            failures: batch.failures.clone(),
        }
    }
}

/// Write a bundle JSON file.
pub fn write_bundle_json(path: &Path, batch: &BatchResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::export(format!("Failed to create bundle JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(BufWriter::new(file), &BundleFile::from_batch(batch))
        .map_err(|e| AppError::export(format!("Failed to write bundle JSON: {e}")))?;

    tracing::info!(path = %path.display(), "bundle written");
    Ok(())
}

/// Read a bundle JSON file.
pub fn read_bundle_json(path: &Path) -> Result<BundleFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open bundle JSON '{}': {e}", path.display())))?;
    let bundle: BundleFile = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| AppError::data_format(format!("Invalid bundle JSON: {e}")))?;
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureStage, Horizon, TrailingPoint};
    use chrono::NaiveDate;

    #[test]
    fn bundle_survives_disk() {
        let batch = BatchResult {
            successes: ForecastBundle {
                horizon: Horizon::new(3).unwrap(),
                trailing_point: TrailingPoint::Omit,
                generated_on: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                results: Vec::new(),
            },
            failures: vec![SeriesFailure::new("x", FailureStage::Fit, "diverged")],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        write_bundle_json(&path, &batch).unwrap();
        let back = read_bundle_json(&path).unwrap();
        assert_eq!(back.tool, "sf");
        assert_eq!(back.bundle, batch.successes);
        assert_eq!(back.failures, batch.failures);
    }

    #[test]
    fn out_of_range_horizon_is_rejected_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"tool":"sf","bundle":{"horizon":99,"trailing_point":"append","generated_on":"2024-01-01","results":[]}}"#,
        )
        .unwrap();
        let err = read_bundle_json(&path).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataFormat);
    }
}
