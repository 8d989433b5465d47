//! Batch driver: one outcome per variable, in input column order.
//!
//! `ForecastRun` is lazy so front-ends can report progress between series
//! (the CLI logs each outcome, the TUI redraws) without the engine knowing
//! anything about presentation.

use chrono::NaiveDate;

use crate::domain::{BatchResult, Dataset, ForecastResult, Horizon, Series, SeriesFailure};
use crate::forecast::{ForecastEngine, assemble};

/// The outcome for one variable.
#[derive(Debug, Clone)]
pub struct SeriesOutcome {
    /// Zero-based position of the variable in the dataset.
    pub index: usize,
    pub total: usize,
    pub variable: String,
    pub result: Result<ForecastResult, SeriesFailure>,
}

/// Lazy iterator over per-variable outcomes.
pub struct ForecastRun<'a> {
    series: std::iter::Enumerate<std::slice::Iter<'a, Series>>,
    total: usize,
    horizon: Horizon,
    engine: &'a ForecastEngine,
}

impl<'a> ForecastRun<'a> {
    pub fn new(dataset: &'a Dataset, horizon: Horizon, engine: &'a ForecastEngine) -> Self {
        Self {
            series: dataset.series().iter().enumerate(),
            total: dataset.len(),
            horizon,
            engine,
        }
    }
}

impl Iterator for ForecastRun<'_> {
    type Item = SeriesOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, series) = self.series.next()?;
        let result = self.engine.forecast(series, self.horizon);
        if let Err(failure) = &result {
            tracing::warn!(%failure, "series skipped");
        }
        Some(SeriesOutcome {
            index,
            total: self.total,
            variable: series.name().to_string(),
            result,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.series.size_hint()
    }
}

impl ExactSizeIterator for ForecastRun<'_> {}

/// Forecast every series of `dataset`, collecting successes and failures.
pub fn forecast_all(dataset: &Dataset, horizon: Horizon, engine: &ForecastEngine) -> BatchResult {
    forecast_all_on(dataset, horizon, engine, chrono::Local::now().date_naive())
}

/// [`forecast_all`] with an explicit generation date.
pub fn forecast_all_on(
    dataset: &Dataset,
    horizon: Horizon,
    engine: &ForecastEngine,
    generated_on: NaiveDate,
) -> BatchResult {
    let run = ForecastRun::new(dataset, horizon, engine);
    assemble(run, horizon, engine.trailing_point(), generated_on)
}
