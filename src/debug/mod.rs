//! Debug bundle writer for inspecting inputs, fitted coefficients and failures.

use std::fmt::Write as _;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{BatchResult, Dataset, SarimaOrder};
use crate::error::AppError;

/// Write `sf_debug_{YYYYmmdd_HHMMSS}.md` into `dir` and return its path.
pub fn write_debug_bundle(dir: &Path, input: &str, dataset: &Dataset, batch: &BatchResult) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::export(format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("sf_debug_{ts}.md"));

    let body = render_debug_bundle(input, dataset, batch);
    std::fs::write(&path, body).map_err(|e| AppError::export(format!("Failed to write debug file: {e}")))?;

    tracing::info!(path = %path.display(), "debug bundle written");
    Ok(path)
}

/// Markdown body of the debug bundle.
pub fn render_debug_bundle(input: &str, dataset: &Dataset, batch: &BatchResult) -> String {
    let bundle = &batch.successes;
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "# sf debug bundle");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- input: {input}");
    let _ = writeln!(out, "- model: {}", SarimaOrder::MONTHLY.display_name());
    let _ = writeln!(out, "- horizon: {} months", bundle.horizon);
    let _ = writeln!(out, "- trailing_point: {:?}", bundle.trailing_point);
    let _ = writeln!(out, "- date_column: {}", dataset.date_column);
    let _ = writeln!(out, "- rows: {}", dataset.rows_read);
    let _ = writeln!(out, "- last_date: {}", dataset.last_date());

    let _ = writeln!(out, "\n## Series");
    let _ = writeln!(out, "| variable | n | first | last | min | max |");
    let _ = writeln!(out, "| - | - | - | - | - | - |");
    for s in dataset.series() {
        let finite = s.values().iter().copied().filter(|v| v.is_finite());
        let min = finite.clone().fold(f64::INFINITY, f64::min);
        let max = finite.fold(f64::NEG_INFINITY, f64::max);
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            s.name(),
            s.len(),
            fmt_date(s.dates().first()),
            fmt_date(s.dates().last()),
            fmt_num(min),
            fmt_num(max)
        );
    }

    let _ = writeln!(out, "\n## Fits");
    let _ = writeln!(
        out,
        "| variable | n_obs | n_resid | css | sigma2 | ar | ma | sar | sma | iterations | converged |"
    );
    let _ = writeln!(out, "| - | - | - | - | - | - | - | - | - | - | - |");
    for r in &bundle.results {
        let f = &r.fit;
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.6} | {:.6} | {} | {} | {} | {} | {} | {} |",
            r.variable,
            f.n_obs,
            f.n_residuals,
            f.css,
            f.sigma2,
            fmt_vec(&f.ar),
            fmt_vec(&f.ma),
            fmt_vec(&f.seasonal_ar),
            fmt_vec(&f.seasonal_ma),
            f.iterations,
            f.converged
        );
    }

    let _ = writeln!(out, "\n## Forecasts");
    for r in &bundle.results {
        let _ = writeln!(out, "\n### {}", r.variable);
        let _ = writeln!(out, "| date | value |");
        let _ = writeln!(out, "| - | - |");
        for p in &r.points {
            let _ = writeln!(out, "| {} | {} |", p.date, p.value);
        }
    }

    if !batch.failures.is_empty() {
        let _ = writeln!(out, "\n## Failures");
        for f in &batch.failures {
            let _ = writeln!(out, "- {f}");
        }
    }

    out
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_num(value: f64) -> String {
    if value.is_finite() { format!("{value:.3}") } else { "-".to_string() }
}

fn fmt_date(date: Option<&chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}
