//! Conditional-sum-of-squares estimation for one series.
//!
//! Given observed levels `y` and a fixed order we:
//! - difference once: `w = (1 - B)^d (1 - B^s)^D y`
//! - score every start point by its CSS (parallel)
//! - refine the best start with Nelder-Mead in unconstrained coordinates
//!
//! The coefficient transform keeps every evaluated model stationary and
//! invertible, so the optimizer never needs explicit bounds.

use rayon::prelude::*;

use crate::domain::SarimaOrder;
use crate::error::AppError;
use crate::fit::{START_LEVELS, hannan_rissanen, start_grid};
use crate::math::{NelderMeadOptions, nelder_mead};
use crate::models::{LagWeights, SarimaCoefficients, difference, differencing_polynomial, undifference};

/// Fitting options.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Partial autocorrelation levels for the start grid.
    pub start_levels: Vec<f64>,
    pub nelder_mead: NelderMeadOptions,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            start_levels: START_LEVELS.to_vec(),
            nelder_mead: NelderMeadOptions::default(),
        }
    }
}

/// A fitted model, ready to forecast from the end of its sample.
#[derive(Debug, Clone)]
pub struct FittedSarima {
    pub order: SarimaOrder,
    pub coefficients: SarimaCoefficients,
    pub css: f64,
    pub sigma2: f64,
    pub n_obs: usize,
    pub iterations: usize,
    pub converged: bool,
    levels: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
}

impl FittedSarima {
    pub fn n_residuals(&self) -> usize {
        self.residuals.len()
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Point forecasts in levels for the next `steps` periods.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let weights = LagWeights::new(&self.order, &self.coefficients);
        let w_future = weights.extend(&self.differenced, &self.residuals, steps);
        undifference(&self.levels, &w_future, &differencing_polynomial(&self.order))
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    point: Vec<f64>,
    css: f64,
}

/// Fit `order` to `values` by CSS.
pub fn fit_sarima(values: &[f64], order: &SarimaOrder, opts: &FitOptions) -> Result<FittedSarima, AppError> {
    let min_obs = order.min_observations();
    if values.len() < min_obs {
        return Err(AppError::model_fit(format!(
            "{} needs at least {min_obs} observations (got {}).",
            order.display_name(),
            values.len()
        )));
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(AppError::model_fit(format!("Non-finite observation at position {pos}.")));
    }

    let w = difference(values, &differencing_polynomial(order));
    let objective = |x: &[f64]| {
        let coefs = SarimaCoefficients::from_unconstrained(order, x);
        LagWeights::new(order, &coefs).css(&w)
    };

    let mut starts = start_grid(order, &opts.start_levels);
    if let Some(hr) = hannan_rissanen(&w, order) {
        starts.push(hr.to_unconstrained());
    }

    // Evaluate each start independently (parallel).
    let candidates: Vec<Candidate> = starts
        .par_iter()
        .enumerate()
        .filter_map(|(idx, point)| {
            let css = objective(point);
            css.is_finite().then(|| Candidate {
                idx,
                point: point.clone(),
                css,
            })
        })
        .collect();

    if candidates.is_empty() {
        return Err(AppError::model_fit("CSS objective is not finite at any start point."));
    }

    // Deterministic selection: pick the minimum CSS; break ties by start index.
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.css < best.css || (c.css == best.css && c.idx < best.idx) {
            best = c;
        }
    }

    let min = nelder_mead(objective, &best.point, &opts.nelder_mead);
    let (point, css) = if min.value <= best.css {
        (min.point, min.value)
    } else {
        (best.point.clone(), best.css)
    };
    if !css.is_finite() {
        return Err(AppError::model_fit("CSS objective diverged during optimization."));
    }
    if !min.converged {
        tracing::warn!(
            iterations = min.iterations,
            css,
            "optimizer stopped before converging; using best point found"
        );
    }

    let coefficients = SarimaCoefficients::from_unconstrained(order, &point);
    if !coefficients.is_finite() {
        return Err(AppError::model_fit("Estimated coefficients are not finite."));
    }
    let residuals = LagWeights::new(order, &coefficients).residuals(&w);
    let sigma2 = css / residuals.len() as f64;

    tracing::debug!(
        model = %order.display_name(),
        start = best.idx,
        css,
        iterations = min.iterations,
        "fitted"
    );

    Ok(FittedSarima {
        order: *order,
        coefficients,
        css,
        sigma2,
        n_obs: values.len(),
        iterations: min.iterations,
        converged: min.converged,
        levels: values.to_vec(),
        differenced: w,
        residuals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seasonal_series(n: usize) -> Vec<f64> {
        let pattern = [10.0, 12.0, 15.0, 14.0, 18.0, 22.0, 25.0, 24.0, 20.0, 16.0, 13.0, 11.0];
        (0..n).map(|t| 100.0 + 0.5 * t as f64 + pattern[t % 12]).collect()
    }

    #[test]
    fn rejects_short_series() {
        let err = fit_sarima(&[1.0; 17], &SarimaOrder::MONTHLY, &FitOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ModelFit);
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut y = seasonal_series(30);
        y[4] = f64::NAN;
        assert!(fit_sarima(&y, &SarimaOrder::MONTHLY, &FitOptions::default()).is_err());
    }

    #[test]
    fn deterministic_seasonal_series_is_reproduced() {
        // Trend + fixed seasonal pattern differences to zero after (1-B)(1-B^12).
        let y = seasonal_series(48);
        let fit = fit_sarima(&y, &SarimaOrder::MONTHLY, &FitOptions::default()).unwrap();
        assert!(fit.css.abs() < 1e-9);
        assert_eq!(fit.n_residuals(), 48 - 13);

        let forecast = fit.forecast(12);
        let expected = seasonal_series(60);
        for (f, e) in forecast.iter().zip(&expected[48..]) {
            assert!((f - e).abs() < 1e-6, "{f} vs {e}");
        }
    }

    #[test]
    fn constant_series_forecasts_constant() {
        let y = vec![250.0; 24];
        let fit = fit_sarima(&y, &SarimaOrder::MONTHLY, &FitOptions::default()).unwrap();
        for v in fit.forecast(6) {
            assert!((v - 250.0).abs() < 1e-9);
        }
    }

    #[test]
    fn fit_is_deterministic() {
        let y: Vec<f64> = (0..40)
            .map(|t| 200.0 + (t as f64 * 0.9).sin() * 15.0 + ((t % 12) as f64) * 3.0)
            .collect();
        let a = fit_sarima(&y, &SarimaOrder::MONTHLY, &FitOptions::default()).unwrap();
        let b = fit_sarima(&y, &SarimaOrder::MONTHLY, &FitOptions::default()).unwrap();
        assert_eq!(a.coefficients, b.coefficients);
        assert_eq!(a.forecast(12), b.forecast(12));
        assert!(a.sigma2.is_finite() && a.sigma2 >= 0.0);
    }
}
