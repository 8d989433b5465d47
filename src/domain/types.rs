//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and forecasting
//! - exported to xlsx/CSV/JSON
//! - reloaded later for plotting

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Smallest accepted forecast horizon (months).
pub const HORIZON_MIN: u32 = 1;
/// Largest accepted forecast horizon (months).
pub const HORIZON_MAX: u32 = 36;

/// Number of months to forecast, validated to `1..=36`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Horizon(u32);

impl Horizon {
    pub fn new(months: u32) -> Result<Self, AppError> {
        if !(HORIZON_MIN..=HORIZON_MAX).contains(&months) {
            return Err(AppError::usage(format!(
                "Horizon must be between {HORIZON_MIN} and {HORIZON_MAX} months (got {months})."
            )));
        }
        Ok(Self(months))
    }

    pub fn months(self) -> u32 {
        self.0
    }

    pub fn steps(self) -> usize {
        self.0 as usize
    }

    /// One month longer, saturating at the maximum.
    pub fn longer(self) -> Self {
        Self((self.0 + 1).min(HORIZON_MAX))
    }

    /// One month shorter, saturating at the minimum.
    pub fn shorter(self) -> Self {
        Self(self.0.saturating_sub(1).max(HORIZON_MIN))
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self(12)
    }
}

impl TryFrom<u32> for Horizon {
    type Error = AppError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Horizon::new(value)
    }
}

impl From<Horizon> for u32 {
    fn from(value: Horizon) -> Self {
        value.0
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to do with the extra one-step-ahead forecast.
///
/// The legacy tool recomputes the one-step forecast (which is already the first
/// element of the horizon forecast) and appends it as an additional trailing
/// point, producing `horizon + 1` outputs. `Append` reproduces that output
/// shape; `Omit` returns exactly `horizon` points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingPoint {
    #[default]
    Append,
    Omit,
}

impl TrailingPoint {
    pub fn extra_points(self) -> usize {
        match self {
            TrailingPoint::Append => 1,
            TrailingPoint::Omit => 0,
        }
    }
}

/// Multiplicative seasonal ARIMA order `(p, d, q) × (P, D, Q)_s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl SarimaOrder {
    /// The fixed order used for every series: monthly data, annual seasonality.
    pub const MONTHLY: SarimaOrder = SarimaOrder {
        p: 1,
        d: 1,
        q: 1,
        seasonal_p: 1,
        seasonal_d: 1,
        seasonal_q: 1,
        period: 12,
    };

    /// Number of estimated ARMA coefficients (no trend term).
    pub fn param_count(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q
    }

    /// Observations lost to differencing.
    pub fn differencing_loss(&self) -> usize {
        self.d + self.seasonal_d * self.period
    }

    /// Minimum series length: the differenced series must hold at least one
    /// residual more than there are coefficients.
    pub fn min_observations(&self) -> usize {
        self.differencing_loss() + self.param_count() + 1
    }

    pub fn display_name(&self) -> String {
        format!(
            "SARIMA({},{},{})({},{},{},{})",
            self.p, self.d, self.q, self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period
        )
    }
}

impl Default for SarimaOrder {
    fn default() -> Self {
        Self::MONTHLY
    }
}

/// A named, date-indexed sequence of observations.
///
/// Dates are strictly increasing. Values that could not be read as numbers are
/// stored as `NaN` so the forecasting stage can report them against the
/// offending variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: String,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, AppError> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(AppError::data_format(format!(
                "Series `{name}`: {} dates but {} values.",
                dates.len(),
                values.len()
            )));
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(AppError::data_format(format!(
                "Series `{name}`: dates must be strictly increasing ({} followed by {}).",
                w[0], w[1]
            )));
        }
        Ok(Self { name, dates, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}

/// All series loaded from one table, in input column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    series: Vec<Series>,
    last_date: NaiveDate,
    /// Date column the index was taken from.
    pub date_column: String,
    /// Data rows read (after skipping blank rows).
    pub rows_read: usize,
}

impl Dataset {
    pub fn new(series: Vec<Series>, date_column: impl Into<String>, rows_read: usize) -> Result<Self, AppError> {
        let mut names = BTreeSet::new();
        if let Some(dup) = series.iter().map(Series::name).find(|name| !names.insert(*name)) {
            return Err(AppError::data_format(format!("Variable name `{dup}` appears more than once.")));
        }
        let last_date = series
            .iter()
            .filter_map(Series::last_date)
            .max()
            .ok_or_else(|| AppError::data_format("No value columns with observations were found."))?;
        Ok(Self {
            series,
            last_date,
            date_column: date_column.into(),
            rows_read,
        })
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.series.iter().map(Series::name).collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Latest date across every series, before per-series trimming.
    pub fn last_date(&self) -> NaiveDate {
        self.last_date
    }
}

/// One forecasted month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: u64,
}

/// Fit diagnostics for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub order: SarimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    /// Conditional sum of squared one-step residuals at the optimum.
    pub css: f64,
    /// Residual variance estimate (`css / n_residuals`).
    pub sigma2: f64,
    pub n_obs: usize,
    pub n_residuals: usize,
    pub iterations: usize,
    pub converged: bool,
}

/// Forecast output for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub variable: String,
    pub history: Series,
    pub points: Vec<ForecastPoint>,
    pub fit: FitSummary,
}

impl ForecastResult {
    pub fn history_points(&self) -> Vec<(NaiveDate, f64)> {
        self.history.points().collect()
    }

    pub fn forecast_dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn value_at(&self, date: NaiveDate) -> Option<u64> {
        self.points.iter().find(|p| p.date == date).map(|p| p.value)
    }
}

/// Which step of the per-series work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Input checks (length, non-numeric values).
    Validate,
    /// Parameter estimation.
    Fit,
    /// Forecast extraction and post-processing.
    Forecast,
}

impl FailureStage {
    pub fn label(self) -> &'static str {
        match self {
            FailureStage::Validate => "validate",
            FailureStage::Fit => "fit",
            FailureStage::Forecast => "forecast",
        }
    }
}

/// A model fit error attributed to one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesFailure {
    pub variable: String,
    pub stage: FailureStage,
    pub message: String,
}

impl SeriesFailure {
    pub fn new(variable: impl Into<String>, stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            stage,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SeriesFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` ({}): {}", self.variable, self.stage.label(), self.message)
    }
}

impl From<SeriesFailure> for AppError {
    fn from(value: SeriesFailure) -> Self {
        AppError::model_fit(value.to_string())
    }
}

/// Successful forecasts of one run; each result keeps its own date index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub horizon: Horizon,
    pub trailing_point: TrailingPoint,
    pub generated_on: NaiveDate,
    pub results: Vec<ForecastResult>,
}

impl ForecastBundle {
    pub fn get(&self, variable: &str) -> Option<&ForecastResult> {
        self.results.iter().find(|r| r.variable == variable)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Export table: union of all forecast dates (ascending) × variables.
    pub fn table(&self) -> ForecastTable {
        let dates: BTreeSet<NaiveDate> = self
            .results
            .iter()
            .flat_map(|r| r.points.iter().map(|p| p.date))
            .collect();

        let rows = dates
            .into_iter()
            .map(|date| TableRow {
                date,
                values: self.results.iter().map(|r| r.value_at(date)).collect(),
            })
            .collect();

        ForecastTable {
            columns: self.results.iter().map(|r| r.variable.clone()).collect(),
            rows,
        }
    }
}

/// Rectangular view of a bundle, ready for spreadsheet export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub date: NaiveDate,
    /// One entry per column; `None` where that variable has no forecast.
    pub values: Vec<Option<u64>>,
}

/// Every success and failure of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub successes: ForecastBundle,
    pub failures: Vec<SeriesFailure>,
}

impl BatchResult {
    pub fn all_failed(&self) -> bool {
        self.successes.is_empty() && !self.failures.is_empty()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment defaults).
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub input: PathBuf,
    pub sheet: Option<String>,
    pub date_column: Option<String>,
    pub horizon: Horizon,
    pub trailing_point: TrailingPoint,

    /// Directory receiving the dated xlsx export.
    pub output_dir: PathBuf,
    /// Skip the xlsx export entirely.
    pub no_export: bool,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
    pub chart_dir: Option<PathBuf>,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    /// Write a fit diagnostics bundle next to the exports.
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn horizon_bounds() {
        assert!(Horizon::new(0).is_err());
        assert!(Horizon::new(37).is_err());
        assert_eq!(Horizon::new(1).unwrap().months(), 1);
        assert_eq!(Horizon::new(36).unwrap().months(), 36);
        assert_eq!(Horizon::new(36).unwrap().longer().months(), 36);
        assert_eq!(Horizon::new(1).unwrap().shorter().months(), 1);
    }

    #[test]
    fn monthly_order_needs_eighteen_observations() {
        assert_eq!(SarimaOrder::MONTHLY.param_count(), 4);
        assert_eq!(SarimaOrder::MONTHLY.differencing_loss(), 13);
        assert_eq!(SarimaOrder::MONTHLY.min_observations(), 18);
    }

    #[test]
    fn series_rejects_unsorted_dates() {
        let err = Series::new("x", vec![ymd(2024, 2, 1), ymd(2024, 1, 1)], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataFormat);
    }

    #[test]
    fn dataset_last_date_spans_all_series() {
        let a = Series::new("a", vec![ymd(2024, 1, 31), ymd(2024, 2, 29)], vec![1.0, 2.0]).unwrap();
        let b = Series::new("b", vec![ymd(2024, 1, 31)], vec![3.0]).unwrap();
        let ds = Dataset::new(vec![a, b], "fecha", 2).unwrap();
        assert_eq!(ds.last_date(), ymd(2024, 2, 29));
        assert_eq!(ds.names(), vec!["a", "b"]);
    }

    #[test]
    fn dataset_rejects_repeated_variable_names() {
        let a = Series::new("x", vec![ymd(2024, 1, 31)], vec![1.0]).unwrap();
        let b = Series::new("x", vec![ymd(2024, 1, 31)], vec![2.0]).unwrap();
        let err = Dataset::new(vec![a, b], "fecha", 1).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataFormat);
    }

    #[test]
    fn table_uses_union_of_per_series_dates() {
        let fit = FitSummary {
            order: SarimaOrder::MONTHLY,
            ar: vec![],
            ma: vec![],
            seasonal_ar: vec![],
            seasonal_ma: vec![],
            css: 0.0,
            sigma2: 0.0,
            n_obs: 0,
            n_residuals: 0,
            iterations: 0,
            converged: true,
        };
        let history = Series::new("h", vec![], vec![]).unwrap();
        let result = |name: &str, dates: &[NaiveDate]| ForecastResult {
            variable: name.to_string(),
            history: history.clone(),
            points: dates.iter().map(|&date| ForecastPoint { date, value: 7 }).collect(),
            fit: fit.clone(),
        };

        let bundle = ForecastBundle {
            horizon: Horizon::new(1).unwrap(),
            trailing_point: TrailingPoint::Append,
            generated_on: ymd(2024, 1, 1),
            results: vec![
                result("a", &[ymd(2024, 1, 31), ymd(2024, 2, 29)]),
                result("b", &[ymd(2024, 2, 29), ymd(2024, 3, 31)]),
            ],
        };

        let table = bundle.table();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].values, vec![Some(7), None]);
        assert_eq!(table.rows[1].values, vec![Some(7), Some(7)]);
        assert_eq!(table.rows[2].values, vec![None, Some(7)]);
    }
}
