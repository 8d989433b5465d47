//! Ordinary least squares for small lagged regressions.
//!
//! The SARIMA start-value search repeatedly solves problems of the form:
//!
//! ```text
//! minimize Σ (y_t - x_t^T β)^2
//! ```
//!
//! where `x_t` holds lagged values of the differenced series and lagged
//! residual estimates (Hannan-Rissanen). Designs are tall and tiny (a few
//! columns), so we solve through SVD, which also copes with the near-collinear
//! columns short seasonal series tend to produce.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() < x.ncols() || x.nrows() != y.len() {
        return None;
    }

    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Regress `target[t]` on the given lag columns for every `t` where all lags
/// are available, returning the coefficients and the in-sample residuals
/// (aligned with `target`, zero where the row was not used).
///
/// Each column is `(source, lag)`: the regressor value for row `t` is
/// `source[t - lag]`.
pub fn lagged_regression(target: &[f64], columns: &[(&[f64], usize)]) -> Option<(Vec<f64>, Vec<f64>)> {
    let start = columns.iter().map(|&(_, lag)| lag).max().unwrap_or(0);
    if target.len() <= start {
        return None;
    }
    let rows = target.len() - start;
    let cols = columns.len();
    if rows <= cols {
        return None;
    }

    let mut x = DMatrix::<f64>::zeros(rows, cols);
    let mut y = DVector::<f64>::zeros(rows);
    for (r, t) in (start..target.len()).enumerate() {
        for (c, &(source, lag)) in columns.iter().enumerate() {
            x[(r, c)] = source[t - lag];
        }
        y[r] = target[t];
    }

    let beta = solve_least_squares(&x, &y)?;
    let fitted = &x * &beta;

    let mut residuals = vec![0.0; target.len()];
    for (r, t) in (start..target.len()).enumerate() {
        residuals[t] = target[t] - fitted[r];
    }

    Some((beta.iter().copied().collect(), residuals))
}
