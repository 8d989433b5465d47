//! Multiplicative seasonal ARIMA evaluation.
//!
//! For an order `(p, d, q) × (P, D, Q)_s` the model on the differenced series
//! `w = (1 - B)^d (1 - B^s)^D y` is
//!
//! ```text
//! φ(B) Φ(B^s) w_t = θ(B) Θ(B^s) e_t
//! ```
//!
//! The fitter and the forecast engine rely on a few primitive operations:
//! - expand the lag polynomials into flat lag-weight vectors
//! - difference / undifference a series
//! - compute conditional (zero pre-sample) one-step residuals
//! - extend the differenced series with zero future shocks
//! - map unconstrained optimizer coordinates to stationary/invertible
//!   coefficients and back

use serde::{Deserialize, Serialize};

use crate::domain::SarimaOrder;

/// Largest partial autocorrelation magnitude used when mapping estimates back
/// to optimizer coordinates.
const MAX_PARTIAL_CORR: f64 = 0.98;

/// Estimated coefficients, in the sign conventions
/// `φ(B) = 1 - Σ φ_i B^i` and `θ(B) = 1 + Σ θ_i B^i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarimaCoefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
}

impl SarimaCoefficients {
    pub fn zeros(order: &SarimaOrder) -> Self {
        Self {
            ar: vec![0.0; order.p],
            ma: vec![0.0; order.q],
            seasonal_ar: vec![0.0; order.seasonal_p],
            seasonal_ma: vec![0.0; order.seasonal_q],
        }
    }

    /// Map unconstrained coordinates `[ar, ma, sar, sma]` into the
    /// stationary (AR) and invertible (MA) region.
    ///
    /// # Panics
    /// Panics if `x.len() != order.param_count()`. Callers should size the
    /// coordinate vector from the order.
    pub fn from_unconstrained(order: &SarimaOrder, x: &[f64]) -> Self {
        let (ar, rest) = x.split_at(order.p);
        let (ma, rest) = rest.split_at(order.q);
        let (sar, sma) = rest.split_at(order.seasonal_p);

        Self {
            ar: constrain_stationary(ar),
            ma: negate(constrain_stationary(ma)),
            seasonal_ar: constrain_stationary(sar),
            seasonal_ma: negate(constrain_stationary(sma)),
        }
    }

    /// Inverse of [`SarimaCoefficients::from_unconstrained`]. Coefficients outside
    /// the admissible region are pulled just inside it.
    pub fn to_unconstrained(&self) -> Vec<f64> {
        let mut out = Vec::new();
        out.extend(unconstrain_stationary(&self.ar));
        out.extend(unconstrain_stationary(&negate(self.ma.clone())));
        out.extend(unconstrain_stationary(&self.seasonal_ar));
        out.extend(unconstrain_stationary(&negate(self.seasonal_ma.clone())));
        out
    }

    pub fn is_finite(&self) -> bool {
        self.ar
            .iter()
            .chain(&self.ma)
            .chain(&self.seasonal_ar)
            .chain(&self.seasonal_ma)
            .all(|v| v.is_finite())
    }
}

/// Flat lag weights of the expanded ARMA recursion
///
/// ```text
/// w_t = Σ_k ar[k] w_{t-k} + e_t + Σ_k ma[k] e_{t-k}
/// ```
///
/// Index `k` is the lag; index 0 is always zero.
#[derive(Debug, Clone, PartialEq)]
pub struct LagWeights {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
}

impl LagWeights {
    pub fn new(order: &SarimaOrder, coefs: &SarimaCoefficients) -> Self {
        let s = order.period;

        let ar_poly = poly_mul(
            &lag_polynomial(&coefs.ar, 1, -1.0),
            &lag_polynomial(&coefs.seasonal_ar, s, -1.0),
        );
        let ma_poly = poly_mul(
            &lag_polynomial(&coefs.ma, 1, 1.0),
            &lag_polynomial(&coefs.seasonal_ma, s, 1.0),
        );

        let mut ar: Vec<f64> = ar_poly.iter().map(|c| -c).collect();
        ar[0] = 0.0;
        let mut ma = ma_poly;
        ma[0] = 0.0;

        Self { ar, ma }
    }

    /// Conditional one-step residuals with zero pre-sample values.
    pub fn residuals(&self, w: &[f64]) -> Vec<f64> {
        let mut e = vec![0.0; w.len()];
        for t in 0..w.len() {
            let pred = self.predict_at(t, w, &e);
            e[t] = w[t] - pred;
        }
        e
    }

    /// Conditional sum of squares.
    pub fn css(&self, w: &[f64]) -> f64 {
        self.residuals(w).iter().map(|e| e * e).sum()
    }

    /// Extend `w` by `steps` values with all future shocks set to zero.
    pub fn extend(&self, w: &[f64], residuals: &[f64], steps: usize) -> Vec<f64> {
        let mut w_ext = w.to_vec();
        let mut e_ext = residuals.to_vec();
        for _ in 0..steps {
            let t = w_ext.len();
            let next = self.predict_at(t, &w_ext, &e_ext);
            w_ext.push(next);
            e_ext.push(0.0);
        }
        w_ext.split_off(w.len())
    }

    fn predict_at(&self, t: usize, w: &[f64], e: &[f64]) -> f64 {
        let mut pred = 0.0;
        for (k, &a) in self.ar.iter().enumerate().skip(1) {
            if a != 0.0 && k <= t {
                pred += a * w[t - k];
            }
        }
        for (k, &b) in self.ma.iter().enumerate().skip(1) {
            if b != 0.0 && k <= t {
                pred += b * e[t - k];
            }
        }
        pred
    }
}

/// Coefficients of `(1 - B)^d (1 - B^s)^D`, index = lag.
pub fn differencing_polynomial(order: &SarimaOrder) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..order.d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if order.period > 0 {
        let mut seasonal = vec![0.0; order.period + 1];
        seasonal[0] = 1.0;
        seasonal[order.period] = -1.0;
        for _ in 0..order.seasonal_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }
    poly
}

/// Apply the differencing polynomial; the output is `poly.len() - 1` shorter.
pub fn difference(y: &[f64], poly: &[f64]) -> Vec<f64> {
    let k = poly.len().saturating_sub(1);
    if y.len() <= k {
        return Vec::new();
    }
    (k..y.len())
        .map(|t| poly.iter().enumerate().map(|(lag, c)| c * y[t - lag]).sum())
        .collect()
}

/// Rebuild levels from future differenced values, continuing `history`.
///
/// `history` must be at least `poly.len() - 1` long.
pub fn undifference(history: &[f64], w_future: &[f64], poly: &[f64]) -> Vec<f64> {
    let mut y = history.to_vec();
    for &w in w_future {
        let t = y.len();
        let mut level = w;
        for (lag, c) in poly.iter().enumerate().skip(1) {
            if lag <= t {
                level -= c * y[t - lag];
            }
        }
        y.push(level);
    }
    y.split_off(history.len())
}

/// Durbin-Levinson map from unconstrained reals to stationary AR coefficients
/// (`y_t = Σ φ_j y_{t-j}`), via partial autocorrelations `tanh(x_k)`.
pub fn constrain_stationary(x: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(x.len());
    for (k, &xk) in x.iter().enumerate() {
        let r = xk.tanh();
        let mut next = Vec::with_capacity(k + 1);
        for j in 0..k {
            next.push(phi[j] - r * phi[k - 1 - j]);
        }
        next.push(r);
        phi = next;
    }
    phi
}

/// Inverse of [`constrain_stationary`]. Partial autocorrelations are clamped
/// to `±0.98` so non-stationary inputs still produce a finite start point.
pub fn unconstrain_stationary(coefs: &[f64]) -> Vec<f64> {
    let p = coefs.len();
    let mut phi = coefs.to_vec();
    let mut partial = vec![0.0; p];

    for k in (0..p).rev() {
        let r = phi[k].clamp(-MAX_PARTIAL_CORR, MAX_PARTIAL_CORR);
        partial[k] = r;
        if k > 0 {
            let denom = 1.0 - r * r;
            phi = (0..k).map(|j| (phi[j] + r * phi[k - 1 - j]) / denom).collect();
        }
    }

    partial.into_iter().map(f64::atanh).collect()
}

/// `1 + sign * Σ c_i B^{i * step}`
fn lag_polynomial(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefs.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coefs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

fn negate(mut v: Vec<f64>) -> Vec<f64> {
    for x in &mut v {
        *x = -*x;
    }
    v
}
