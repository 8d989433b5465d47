//! Shared forecast pipeline used by both CLI and TUI front-ends.
//!
//! Load -> forecast every series -> assemble. Exports live here too so the
//! TUI `e` key writes exactly what `sf forecast` writes.

use std::path::PathBuf;

use chrono::Local;

use crate::domain::{BatchResult, Dataset, ForecastConfig};
use crate::error::AppError;
use crate::forecast::{ForecastEngine, ForecastRun, assemble};
use crate::io::LoadOptions;

/// All computed outputs of a single `sf forecast` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub batch: BatchResult,
}

/// Load the configured input and forecast every series.
pub fn run_forecast(config: &ForecastConfig) -> Result<RunOutput, AppError> {
    let options = LoadOptions {
        sheet: config.sheet.clone(),
        date_column: config.date_column.clone(),
    };
    let dataset = crate::io::load_dataset_file(&config.input, &options)?;
    Ok(run_forecast_with_dataset(config, dataset))
}

/// Forecast an already loaded dataset.
///
/// The TUI uses this to refit after a horizon change without re-reading the file.
pub fn run_forecast_with_dataset(config: &ForecastConfig, dataset: Dataset) -> RunOutput {
    let engine = ForecastEngine::new(config.trailing_point);
    let run = ForecastRun::new(&dataset, config.horizon, &engine).inspect(|outcome| {
        tracing::debug!(
            variable = %outcome.variable,
            ok = outcome.result.is_ok(),
            "[{}/{}] series done",
            outcome.index + 1,
            outcome.total
        );
    });
    let batch = assemble(run, config.horizon, config.trailing_point, Local::now().date_naive());
    RunOutput { dataset, batch }
}

/// Write every export enabled in `config`; returns the written paths.
///
/// When no series succeeded only the JSON bundle and the debug bundle are
/// written, since both carry the failure list. Stops at the first failing
/// export.
pub fn write_exports(config: &ForecastConfig, run: &RunOutput) -> Result<Vec<PathBuf>, AppError> {
    let bundle = &run.batch.successes;
    let mut written = Vec::new();

    if !bundle.is_empty() {
        if !config.no_export {
            written.push(crate::io::write_forecast_xlsx(&config.output_dir, bundle)?);
        }
        if let Some(path) = &config.export_csv {
            crate::io::write_forecast_csv(path, bundle)?;
            written.push(path.clone());
        }
        if let Some(dir) = &config.chart_dir {
            written.extend(crate::plot::write_bundle_svgs(dir, bundle)?);
        }
    }
    if let Some(path) = &config.export_json {
        crate::io::write_bundle_json(path, &run.batch)?;
        written.push(path.clone());
    }
    if config.debug {
        written.push(write_debug(config, run)?);
    }
    Ok(written)
}

/// Write the diagnostics bundle into `debug/` under the output directory.
pub fn write_debug(config: &ForecastConfig, run: &RunOutput) -> Result<PathBuf, AppError> {
    let dir = config.output_dir.join("debug");
    crate::debug::write_debug_bundle(&dir, &config.input.display().to_string(), &run.dataset, &run.batch)
}
