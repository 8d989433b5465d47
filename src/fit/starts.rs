//! Start points for the CSS optimizer.
//!
//! CSS surfaces of seasonal models are often multimodal, so we never start
//! from a single guess. Every coordinate takes each of a few partial
//! autocorrelation levels, and a Hannan-Rissanen regression estimate is
//! appended when the series is long enough to support it.

use crate::domain::SarimaOrder;
use crate::math::lagged_regression;
use crate::models::SarimaCoefficients;

/// Partial autocorrelation levels tried for every coefficient.
pub const START_LEVELS: [f64; 3] = [-0.5, 0.0, 0.5];

/// Cartesian product of `levels` over every coefficient, in unconstrained
/// optimizer coordinates. Order is deterministic (last coordinate fastest).
pub fn start_grid(order: &SarimaOrder, levels: &[f64]) -> Vec<Vec<f64>> {
    let coords: Vec<f64> = levels.iter().map(|l| l.atanh()).collect();
    let mut out: Vec<Vec<f64>> = vec![Vec::new()];
    for _ in 0..order.param_count() {
        let mut next = Vec::with_capacity(out.len() * coords.len());
        for prefix in &out {
            for &c in &coords {
                let mut point = prefix.clone();
                point.push(c);
                next.push(point);
            }
        }
        out = next;
    }
    out
}

/// Two-stage Hannan-Rissanen estimate on the differenced series `w`.
///
/// Stage one fits a long autoregression to estimate the shocks; stage two
/// regresses `w_t` on its own lags and the estimated shocks. Returns `None`
/// when `w` is too short for either regression.
pub fn hannan_rissanen(w: &[f64], order: &SarimaOrder) -> Option<SarimaCoefficients> {
    let s = order.period.max(1);
    let long = (order.period + 1).min(w.len() / 3);
    if long == 0 {
        return None;
    }

    let long_columns: Vec<(&[f64], usize)> = (1..=long).map(|lag| (w, lag)).collect();
    let (_, shocks) = lagged_regression(w, &long_columns)?;

    let mut columns: Vec<(&[f64], usize)> = Vec::with_capacity(order.param_count());
    columns.extend((1..=order.p).map(|lag| (w, lag)));
    columns.extend((1..=order.seasonal_p).map(|i| (w, i * s)));
    columns.extend((1..=order.q).map(|lag| (shocks.as_slice(), lag)));
    columns.extend((1..=order.seasonal_q).map(|i| (shocks.as_slice(), i * s)));
    if columns.is_empty() {
        return Some(SarimaCoefficients::zeros(order));
    }

    let (beta, _) = lagged_regression(w, &columns)?;
    if beta.iter().any(|b| !b.is_finite()) {
        return None;
    }

    let mut rest = beta.as_slice();
    let mut take = |n: usize| {
        let (head, tail) = rest.split_at(n);
        rest = tail;
        head.to_vec()
    };
    Some(SarimaCoefficients {
        ar: take(order.p),
        seasonal_ar: take(order.seasonal_p),
        ma: take(order.q),
        seasonal_ma: take(order.seasonal_q),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_every_combination() {
        let grid = start_grid(&SarimaOrder::MONTHLY, &START_LEVELS);
        assert_eq!(grid.len(), 81);
        assert!(grid.iter().all(|p| p.len() == 4));
        assert!(grid.iter().any(|p| p.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn hannan_rissanen_needs_enough_data() {
        let w = vec![0.5; 10];
        assert!(hannan_rissanen(&w, &SarimaOrder::MONTHLY).is_none());
    }

    #[test]
    fn hannan_rissanen_finds_ar_structure() {
        // Pure AR(1) with a non-repeating deterministic excitation.
        let mut state: u64 = 42;
        let mut w = vec![0.0];
        for t in 1..160 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let shock = (state >> 33) as f64 / (1u64 << 31) as f64 - 0.5;
            w.push(0.7 * w[t - 1] + shock);
        }
        let coefs = hannan_rissanen(&w, &SarimaOrder::MONTHLY).unwrap();
        assert_eq!(coefs.ar.len(), 1);
        assert!(coefs.ar[0] > 0.3, "ar = {:?}", coefs.ar);
    }
}
