//! Derivative-free minimization (Nelder-Mead simplex).
//!
//! Used to refine SARIMA coefficients in the unconstrained parameter space.
//! Deterministic: the initial simplex depends only on the start point.

/// Tunables for [`nelder_mead`].
#[derive(Debug, Clone)]
pub struct NelderMeadOptions {
    pub max_iter: usize,
    /// Stop when the spread of objective values across the simplex drops below this.
    pub f_tol: f64,
    /// Stop when every vertex lies within this distance of the best vertex.
    pub x_tol: f64,
    pub initial_step: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            f_tol: 1e-10,
            x_tol: 1e-8,
            initial_step: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `objective` starting from `start`.
///
/// Non-finite objective values are treated as `+∞`, so the simplex walks away
/// from regions where the objective is undefined.
pub fn nelder_mead<F>(objective: F, start: &[f64], opts: &NelderMeadOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    if n == 0 {
        return Minimum {
            point: Vec::new(),
            value: eval(start),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.to_vec());
    for i in 0..n {
        let mut vertex = start.to_vec();
        let step = if vertex[i].abs() > 1e-8 {
            opts.initial_step * vertex[i].abs().max(1.0)
        } else {
            opts.initial_step
        };
        vertex[i] += step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < opts.max_iter {
        iterations += 1;

        // Order vertices best → worst; ties keep their previous order.
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let spread = values[n] - values[0];
        let size = simplex[1..]
            .iter()
            .map(|v| distance(v, &simplex[0]))
            .fold(0.0, f64::max);
        if (spread.is_finite() && spread.abs() <= opts.f_tol) || size <= opts.x_tol {
            converged = true;
            break;
        }

        let centroid = centroid(&simplex[..n]);
        let worst = simplex[n].clone();

        let reflected = along(&centroid, &worst, -REFLECT);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = along(&centroid, &worst, -EXPAND);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        // Contract towards the better of the reflected and worst points.
        let (contracted, f_contracted) = if f_reflected < values[n] {
            let c = along(&centroid, &reflected, CONTRACT);
            let f = eval(&c);
            (c, f)
        } else {
            let c = along(&centroid, &worst, CONTRACT);
            let f = eval(&c);
            (c, f)
        };

        if f_contracted < values[n].min(f_reflected) {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        // Shrink everything towards the best vertex.
        let best = simplex[0].clone();
        for i in 1..=n {
            simplex[i] = along(&best, &simplex[i], SHRINK);
            values[i] = eval(&simplex[i]);
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0);

    Minimum {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}

/// `from + t * (to - from)`
fn along(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect()
}

fn centroid(points: &[Vec<f64>]) -> Vec<f64> {
    let n = points.len() as f64;
    let dim = points[0].len();
    let mut out = vec![0.0; dim];
    for p in points {
        for (o, v) in out.iter_mut().zip(p) {
            *o += v / n;
        }
    }
    out
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}
