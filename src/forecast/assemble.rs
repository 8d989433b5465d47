//! Fold per-variable outcomes into a `BatchResult`.
//!
//! Each success keeps its own forecast dates; aligning them into one table is
//! left to [`ForecastBundle::table`].

use chrono::NaiveDate;

use crate::domain::{BatchResult, ForecastBundle, Horizon, TrailingPoint};
use crate::forecast::SeriesOutcome;

pub fn assemble<I>(outcomes: I, horizon: Horizon, trailing_point: TrailingPoint, generated_on: NaiveDate) -> BatchResult
where
    I: IntoIterator<Item = SeriesOutcome>,
{
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(result) => results.push(result),
            Err(failure) => failures.push(failure),
        }
    }

    if !failures.is_empty() {
        tracing::info!(
            succeeded = results.len(),
            failed = failures.len(),
            "batch finished with failures"
        );
    }

    BatchResult {
        successes: ForecastBundle {
            horizon,
            trailing_point,
            generated_on,
            results,
        },
        failures,
    }
}
