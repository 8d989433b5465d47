//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - history: `.` line
//! - forecast: `*` line, continuing from the last observation
//! - value labels for every forecast point below the grid

use chrono::NaiveDate;

use crate::domain::{ForecastBundle, ForecastResult, decimal_year, month_label};

/// Render one variable's history and forecast.
pub fn render_forecast_plot(result: &ForecastResult, width: usize, height: usize) -> String {
    let history: Vec<(f64, f64)> = result
        .history_points()
        .into_iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(d, v)| (decimal_year(d), v))
        .collect();
    let forecast: Vec<(f64, f64)> = result
        .points
        .iter()
        .map(|p| (decimal_year(p.date), p.value as f64))
        .collect();

    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(&history, &forecast).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(&history, &forecast).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let bounds = Bounds { x_min, x_max, y_min, y_max };

    draw_series(&mut grid, &history, &bounds, '.');
    let mut forecast_line = Vec::with_capacity(forecast.len() + 1);
    forecast_line.extend(history.last().copied());
    forecast_line.extend(forecast.iter().copied());
    draw_series(&mut grid, &forecast_line, &bounds, '*');
    // Forecast markers win over history where they overlap.
    for &(x, y) in &forecast {
        let (col, row) = bounds.map(x, y, width, height);
        grid[row][col] = '*';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | y=[{y_min:.1}, {y_max:.1}]\n",
        result.variable
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    let left = month_label(x_min);
    let right = month_label(x_max);
    let gap = width.saturating_sub(left.len() + right.len()).max(1);
    out.push_str(&format!("{left}{}{right}\n", " ".repeat(gap)));

    out.push_str(&format_value_labels(&result.points.iter().map(|p| (p.date, p.value)).collect::<Vec<_>>()));
    out
}

/// Render every variable of a bundle, separated by blank lines.
pub fn render_bundle_plots(bundle: &ForecastBundle, width: usize, height: usize) -> String {
    bundle
        .results
        .iter()
        .map(|r| render_forecast_plot(r, width, height))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_value_labels(points: &[(NaiveDate, u64)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let labels: Vec<String> = points
        .iter()
        .map(|(d, v)| format!("{}={v}", d.format("%b-%Y")))
        .collect();
    format!("Forecast: {}\n", labels.join(", "))
}

struct Bounds {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Bounds {
    fn map(&self, x: f64, y: f64, width: usize, height: usize) -> (usize, usize) {
        (
            map_x(x, self.x_min, self.x_max, width),
            map_y(y, self.y_min, self.y_max, height),
        )
    }
}

fn x_range(a: &[(f64, f64)], b: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in a.iter().chain(b) {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(a: &[(f64, f64)], b: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in a.iter().chain(b) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y > min_y {
        Some((min_y, max_y))
    } else {
        // Flat series: open a unit band around the value.
        Some((min_y - 1.0, max_y + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], points: &[(f64, f64)], bounds: &Bounds, ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in points {
        let (col, row) = bounds.map(x, y, width, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, ch);
        } else if grid[row][col] == ' ' {
            grid[row][col] = ch;
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
