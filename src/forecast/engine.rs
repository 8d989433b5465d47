//! Forecasting for a single series.

use crate::domain::{
    FailureStage, FitSummary, ForecastPoint, ForecastResult, Horizon, SarimaOrder, Series, SeriesFailure,
    TrailingPoint, month_ends_after,
};
use crate::fit::{FitOptions, FittedSarima, fit_sarima};

/// Fits the fixed seasonal model to a series and produces its forecast.
///
/// Stateless between calls: the same series and horizon always give the same
/// result.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    order: SarimaOrder,
    trailing_point: TrailingPoint,
    fit_options: FitOptions,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(TrailingPoint::default())
    }
}

impl ForecastEngine {
    pub fn new(trailing_point: TrailingPoint) -> Self {
        Self {
            order: SarimaOrder::MONTHLY,
            trailing_point,
            fit_options: FitOptions::default(),
        }
    }

    pub fn with_fit_options(mut self, fit_options: FitOptions) -> Self {
        self.fit_options = fit_options;
        self
    }

    pub fn trailing_point(&self) -> TrailingPoint {
        self.trailing_point
    }

    /// Forecast `horizon` months after the series' last observation.
    ///
    /// With [`TrailingPoint::Append`] the result holds `horizon + 1` points:
    /// the one-step forecast is computed a second time and appended at the
    /// end, dated one month after the last horizon point.
    pub fn forecast(&self, series: &Series, horizon: Horizon) -> Result<ForecastResult, SeriesFailure> {
        self.forecast_with_fit(series, horizon).map(|(result, _)| result)
    }

    /// Like [`ForecastEngine::forecast`], also returning the fitted model.
    pub fn forecast_with_fit(
        &self,
        series: &Series,
        horizon: Horizon,
    ) -> Result<(ForecastResult, FittedSarima), SeriesFailure> {
        let name = series.name();
        let fail = |stage, message: String| SeriesFailure::new(name, stage, message);

        self.validate(series)?;

        let fitted = fit_sarima(series.values(), &self.order, &self.fit_options)
            .map_err(|e| fail(FailureStage::Fit, e.message().to_string()))?;

        let mut raw = fitted.forecast(horizon.steps());
        if self.trailing_point == TrailingPoint::Append {
            // Recomputed from the same anchor, so it repeats the first value.
            let one_step = fitted.forecast(1);
            raw.extend(one_step.first().copied());
        }

        let last = series
            .last_date()
            .ok_or_else(|| fail(FailureStage::Forecast, "series has no observations".to_string()))?;
        let dates = month_ends_after(last, raw.len())
            .ok_or_else(|| fail(FailureStage::Forecast, format!("cannot build forecast dates after {last}")))?;

        let mut points = Vec::with_capacity(raw.len());
        for (date, value) in dates.into_iter().zip(raw) {
            let value = to_count(value).ok_or_else(|| {
                fail(FailureStage::Forecast, format!("forecast for {date} is not a finite number"))
            })?;
            points.push(ForecastPoint { date, value });
        }

        tracing::info!(
            variable = name,
            observations = series.len(),
            points = points.len(),
            sigma2 = fitted.sigma2,
            "forecast ready"
        );

        let result = ForecastResult {
            variable: name.to_string(),
            history: series.clone(),
            points,
            fit: summarize(&fitted),
        };
        Ok((result, fitted))
    }

    fn validate(&self, series: &Series) -> Result<(), SeriesFailure> {
        let fail = |message: String| SeriesFailure::new(series.name(), FailureStage::Validate, message);

        if let Some((date, _)) = series.points().find(|(_, v)| !v.is_finite()) {
            return Err(fail(format!("non-numeric value at {date}")));
        }
        let min_obs = self.order.min_observations();
        if series.len() < min_obs {
            return Err(fail(format!(
                "{} needs at least {min_obs} observations (got {})",
                self.order.display_name(),
                series.len()
            )));
        }
        Ok(())
    }
}

/// Truncate toward zero, then clamp at zero.
pub fn to_count(value: f64) -> Option<u64> {
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc().max(0.0) as u64)
}

fn summarize(fitted: &FittedSarima) -> FitSummary {
    let c = &fitted.coefficients;
    FitSummary {
        order: fitted.order,
        ar: c.ar.clone(),
        ma: c.ma.clone(),
        seasonal_ar: c.seasonal_ar.clone(),
        seasonal_ma: c.seasonal_ma.clone(),
        css: fitted.css,
        sigma2: fitted.sigma2,
        n_obs: fitted.n_obs,
        n_residuals: fitted.n_residuals(),
        iterations: fitted.iterations,
        converged: fitted.converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly_series(name: &str, values: Vec<f64>) -> Series {
        let dates = month_ends_after(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(), values.len()).unwrap();
        Series::new(name, dates, values).unwrap()
    }

    #[test]
    fn to_count_truncates_and_clamps() {
        assert_eq!(to_count(12.9), Some(12));
        assert_eq!(to_count(-0.7), Some(0));
        assert_eq!(to_count(-250.0), Some(0));
        assert_eq!(to_count(f64::NAN), None);
        assert_eq!(to_count(f64::INFINITY), None);
    }

    #[test]
    fn appends_trailing_one_step_point() {
        let values: Vec<f64> = (0..30).map(|t| 100.0 + (t % 12) as f64 * 4.0 + t as f64).collect();
        let series = monthly_series("ventas", values);
        let result = ForecastEngine::default().forecast(&series, Horizon::new(6).unwrap()).unwrap();

        assert_eq!(result.points.len(), 7);
        assert_eq!(result.points[6].value, result.points[0].value);
        assert_eq!(result.points[0].date, NaiveDate::from_ymd_opt(2022, 7, 31).unwrap());
        assert_eq!(result.points[6].date, NaiveDate::from_ymd_opt(2023, 1, 31).unwrap());
    }

    #[test]
    fn omit_returns_exactly_horizon_points() {
        let values: Vec<f64> = (0..30).map(|t| 50.0 + (t % 12) as f64).collect();
        let series = monthly_series("x", values);
        let engine = ForecastEngine::new(TrailingPoint::Omit);
        let result = engine.forecast(&series, Horizon::new(3).unwrap()).unwrap();
        assert_eq!(result.points.len(), 3);
    }

    #[test]
    fn declining_series_is_clamped_at_zero() {
        // Steep decline: raw forecasts go negative.
        let values: Vec<f64> = (0..24).map(|t| 240.0 - 10.0 * t as f64).collect();
        let series = monthly_series("stock", values);
        let result = ForecastEngine::default().forecast(&series, Horizon::new(12).unwrap()).unwrap();
        assert_eq!(result.points.len(), 13);
        assert!(result.points.iter().any(|p| p.value == 0));
    }

    #[test]
    fn fit_options_bound_the_search() {
        let ds = crate::data::generate_sample(&crate::data::SampleSpec::default()).unwrap();
        let mut opts = FitOptions::default();
        opts.nelder_mead.max_iter = 1;
        let engine = ForecastEngine::default().with_fit_options(opts);

        let result = engine.forecast(&ds.series()[0], Horizon::new(2).unwrap()).unwrap();
        assert!(result.fit.iterations <= 1);
        assert_eq!(result.points.len(), 3);
    }

    #[test]
    fn short_series_fails_validation() {
        let series = monthly_series("tiny", vec![1.0, 2.0, 3.0]);
        let err = ForecastEngine::default().forecast(&series, Horizon::new(3).unwrap()).unwrap_err();
        assert_eq!(err.variable, "tiny");
        assert_eq!(err.stage, FailureStage::Validate);
    }

    #[test]
    fn non_numeric_marker_fails_validation() {
        let mut values = vec![10.0; 24];
        values[5] = f64::NAN;
        let series = monthly_series("dirty", values);
        let err = ForecastEngine::default().forecast(&series, Horizon::new(3).unwrap()).unwrap_err();
        assert_eq!(err.stage, FailureStage::Validate);
        assert!(err.message.contains("non-numeric"));
    }
}
