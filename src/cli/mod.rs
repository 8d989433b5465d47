//! Command-line parsing for the seasonal forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sf", version, about = "Monthly seasonal forecaster (SARIMA(1,1,1)(1,1,1,12))")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Forecast every variable of a spreadsheet, print results and export them.
    Forecast(ForecastArgs),
    /// Write a synthetic monthly dataset (xlsx) for demos.
    Sample(SampleArgs),
    /// Plot a previously exported JSON bundle.
    Plot(PlotArgs),
    /// Launch the interactive TUI.
    ///
    /// Uses the same pipeline as `sf forecast`, rendered with Ratatui.
    Tui(ForecastArgs),
}

/// Common options for forecasting.
#[derive(Debug, Parser, Clone)]
pub struct ForecastArgs {
    /// Input spreadsheet (.xlsx or .csv). Prompts for one when omitted.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Worksheet name (xlsx only; defaults to the first sheet).
    #[arg(long, env = "SF_SHEET")]
    pub sheet: Option<String>,

    /// Date column name (defaults to fecha/date/... or the first column).
    #[arg(long, env = "SF_DATE_COLUMN")]
    pub date_column: Option<String>,

    /// Forecast horizon in months (1-36).
    #[arg(
        short = 'm',
        long,
        env = "SF_HORIZON",
        default_value_t = 12,
        value_parser = clap::value_parser!(u32).range(1..=36)
    )]
    pub horizon: u32,

    /// Emit exactly `horizon` points instead of appending the trailing
    /// one-step point.
    #[arg(long)]
    pub no_trailing_point: bool,

    /// Directory for the dated xlsx export.
    #[arg(short = 'o', long, env = "SF_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Skip the xlsx export.
    #[arg(long)]
    pub no_export: bool,

    /// Also export the forecast table to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Export results (history, forecasts, fit summaries) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Write one SVG chart per variable into this directory.
    #[arg(long = "charts", value_name = "DIR")]
    pub charts: Option<PathBuf>,

    /// Render ASCII plots in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,

    /// Write a markdown diagnostics bundle into `debug/`.
    #[arg(long)]
    pub debug: bool,
}

/// Options for generating a synthetic dataset.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Output workbook path.
    #[arg(short = 'o', long, default_value = "sample.xlsx")]
    pub output: PathBuf,

    /// Variable names (comma separated).
    #[arg(long, value_delimiter = ',', default_values = ["ventas", "stock", "visitas"])]
    pub variables: Vec<String>,

    /// Number of monthly observations.
    #[arg(long, default_value_t = 36)]
    pub months: usize,

    /// First month (YYYY-MM or YYYY-MM-DD).
    #[arg(long, default_value = "2021-01")]
    pub start: String,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Log-noise standard deviation.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    /// Drop this many trailing months from every second variable.
    #[arg(long, default_value_t = 0)]
    pub ragged_tail: usize,
}

/// Options for plotting a saved bundle.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Bundle JSON file produced by `sf forecast --export-json`.
    #[arg(long, value_name = "JSON")]
    pub bundle: PathBuf,

    /// Only plot this variable.
    #[arg(long)]
    pub variable: Option<String>,

    /// Also write SVG charts into this directory.
    #[arg(long = "charts", value_name = "DIR")]
    pub charts: Option<PathBuf>,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_defaults() {
        let cli = Cli::try_parse_from(["sf", "forecast", "-f", "data.xlsx"]).unwrap();
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.file, Some(PathBuf::from("data.xlsx")));
        assert_eq!(args.horizon, 12);
        assert!(args.plot && !args.no_plot);
        assert!(!args.no_trailing_point);
    }

    #[test]
    fn horizon_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["sf", "forecast", "-m", "0"]).is_err());
        assert!(Cli::try_parse_from(["sf", "forecast", "-m", "37"]).is_err());
        assert!(Cli::try_parse_from(["sf", "forecast", "-m", "36"]).is_ok());
    }

    #[test]
    fn sample_variables_are_comma_separated() {
        let cli = Cli::try_parse_from(["sf", "sample", "--variables", "a,b"]).unwrap();
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.variables, vec!["a", "b"]);
    }
}
