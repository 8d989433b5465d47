//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting/forecast code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{BatchResult, Dataset, ForecastBundle, ForecastConfig, SarimaOrder, SeriesFailure};

/// Format the run header (input + dataset shape + horizon).
pub fn format_run_summary(dataset: &Dataset, batch: &BatchResult, config: &ForecastConfig) -> String {
    let mut out = String::new();

    out.push_str("=== sf - Seasonal Forecast ===\n");
    out.push_str(&format!("Input: {}\n", config.input.display()));
    out.push_str(&format!(
        "Rows: {} | date column: {} | last date: {}\n",
        dataset.rows_read,
        dataset.date_column,
        dataset.last_date()
    ));
    out.push_str(&format!("Model: {}\n", SarimaOrder::MONTHLY.display_name()));
    out.push_str(&format!(
        "Horizon: {} months{}\n",
        config.horizon,
        if config.trailing_point.extra_points() > 0 { " (+1 trailing point)" } else { "" }
    ));
    out.push_str(&format!(
        "Series: {} forecast, {} failed\n",
        batch.successes.results.len(),
        batch.failures.len()
    ));
    out.push('\n');
    out
}

/// Format the forecast table (`date` + one column per variable).
pub fn format_forecast_table(bundle: &ForecastBundle) -> String {
    let table = bundle.table();
    let mut out = String::new();
    if table.columns.is_empty() {
        out.push_str("No forecasts.\n");
        return out;
    }

    let mut header = format!("{:<10}", "date");
    let mut rule = format!("{:-<10}", "");
    for name in &table.columns {
        header.push_str(&format!(" {:>12}", truncate(name, 12)));
        rule.push_str(&format!(" {:-<12}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for row in &table.rows {
        let mut line = format!("{:<10}", row.date.format("%Y-%m-%d"));
        for value in &row.values {
            let cell = value.map(|v| v.to_string()).unwrap_or_default();
            line.push_str(&format!(" {cell:>12}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Format per-variable fit diagnostics.
pub fn format_fit_diagnostics(bundle: &ForecastBundle) -> String {
    let mut out = String::new();
    out.push_str("Fit diagnostics:\n");
    for r in &bundle.results {
        let f = &r.fit;
        let flag = if f.converged { " " } else { "!" };
        out.push_str(&format!(
            "{flag} {:<16} n={:<4} sigma2={:<12.4} ar={} ma={} sar={} sma={}\n",
            truncate(&r.variable, 16),
            f.n_obs,
            f.sigma2,
            fmt_vec(&f.ar),
            fmt_vec(&f.ma),
            fmt_vec(&f.seasonal_ar),
            fmt_vec(&f.seasonal_ma),
        ));
    }
    out
}

/// Format the list of variables that could not be forecast.
pub fn format_failures(failures: &[SeriesFailure]) -> String {
    let mut out = String::new();
    if failures.is_empty() {
        return out;
    }
    out.push_str(&format!("Skipped ({}):\n", failures.len()));
    for f in failures {
        out.push_str(&format!("- {f}\n"));
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
