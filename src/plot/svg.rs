//! SVG charts (one file per variable) rendered with Plotters.
//!
//! Layout: historical line, forecast line continuing from the last
//! observation, a marker plus value label at every forecast point, and
//! `Mon-YYYY` tick labels on the time axis.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::domain::{ForecastBundle, ForecastResult, decimal_year, month_label};
use crate::error::AppError;

/// Default chart size in pixels.
pub const SVG_SIZE: (u32, u32) = (1000, 600);

/// `forecast_{variable}.svg`, with characters unsafe in file names replaced.
pub fn svg_file_name(variable: &str) -> String {
    let safe: String = variable
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("forecast_{safe}.svg")
}

/// Write one chart per variable into `dir`, returning the written paths.
pub fn write_bundle_svgs(dir: &Path, bundle: &ForecastBundle) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::export(format!("Failed to create chart directory '{}': {e}", dir.display())))?;

    let mut paths = Vec::with_capacity(bundle.results.len());
    for result in &bundle.results {
        let path = dir.join(svg_file_name(&result.variable));
        write_forecast_svg(&path, result, SVG_SIZE)?;
        paths.push(path);
    }
    tracing::info!(dir = %dir.display(), charts = paths.len(), "charts written");
    Ok(paths)
}

/// Render one variable's history and forecast to an SVG file.
pub fn write_forecast_svg(path: &Path, result: &ForecastResult, size: (u32, u32)) -> Result<(), AppError> {
    let history: Vec<(f64, f64)> = result
        .history
        .points()
        .filter(|(_, v)| v.is_finite())
        .map(|(d, v)| (decimal_year(d), v))
        .collect();
    let forecast: Vec<(f64, f64)> = result
        .points
        .iter()
        .map(|p| (decimal_year(p.date), p.value as f64))
        .collect();
    let (x_bounds, y_bounds) = chart_bounds(&history, &forecast);

    let mut forecast_line = Vec::with_capacity(forecast.len() + 1);
    forecast_line.extend(history.last().copied());
    forecast_line.extend(forecast.iter().copied());

    let err = |e: &dyn std::fmt::Display| AppError::export(format!("Failed to render '{}': {e}", path.display()));

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(&e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} forecast", result.variable), ("sans-serif", 22))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x_bounds[0]..x_bounds[1], y_bounds[0]..y_bounds[1])
        .map_err(|e| err(&e))?;

    chart
        .configure_mesh()
        .x_labels(8)
        .y_labels(6)
        .x_label_formatter(&|v| month_label(*v))
        .y_label_formatter(&|v| format!("{v:.0}"))
        .x_desc("month")
        .y_desc(result.variable.as_str())
        .draw()
        .map_err(|e| err(&e))?;

    let history_color = RGBColor(31, 119, 180);
    let forecast_color = RGBColor(214, 39, 40);

    chart
        .draw_series(LineSeries::new(history.iter().copied(), history_color.stroke_width(2)))
        .map_err(|e| err(&e))?
        .label("history")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], history_color));

    chart
        .draw_series(LineSeries::new(forecast_line, forecast_color.stroke_width(2)))
        .map_err(|e| err(&e))?
        .label("forecast")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], forecast_color));

    chart
        .draw_series(forecast.iter().map(|&(x, y)| Circle::new((x, y), 3, forecast_color.filled())))
        .map_err(|e| err(&e))?;

    // Value label at every forecast point.
    let label_style = ("sans-serif", 12).into_font().color(&BLACK);
    chart
        .draw_series(
            forecast
                .iter()
                .zip(&result.points)
                .map(|(&(x, y), p)| Text::new(p.value.to_string(), (x, y), label_style.clone())),
        )
        .map_err(|e| err(&e))?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| err(&e))?;

    root.present().map_err(|e| err(&e))?;
    Ok(())
}

fn chart_bounds(history: &[(f64, f64)], forecast: &[(f64, f64)]) -> ([f64; 2], [f64; 2]) {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for &(px, py) in history.iter().chain(forecast) {
        x = [x[0].min(px), x[1].max(px)];
        y = [y[0].min(py), y[1].max(py)];
    }
    if !(x[0].is_finite() && x[1].is_finite()) {
        x = [0.0, 1.0];
    }
    if !(y[0].is_finite() && y[1].is_finite()) {
        y = [0.0, 1.0];
    }
    if x[1] <= x[0] {
        x = [x[0] - 1.0 / 12.0, x[1] + 1.0 / 12.0];
    }
    let pad = ((y[1] - y[0]) * 0.08).max(1.0);
    ([x[0], x[1]], [y[0] - pad, y[1] + pad])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(svg_file_name("ventas"), "forecast_ventas.svg");
        assert_eq!(svg_file_name("a/b c"), "forecast_a_b_c.svg");
    }

    #[test]
    fn bounds_are_padded_and_non_degenerate() {
        let (x, y) = chart_bounds(&[], &[(2024.0, 5.0)]);
        assert!(x[1] > x[0]);
        assert!(y[1] > y[0]);
        assert!(y[0] <= 5.0 && y[1] >= 5.0);
    }
}
