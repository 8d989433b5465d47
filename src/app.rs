//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the input spreadsheet
//! - forecasts every variable
//! - prints reports/plots
//! - writes exports

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Command, ForecastArgs, PlotArgs, SampleArgs};
use crate::domain::{ForecastConfig, Horizon, TrailingPoint};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `sf` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // We want `sf` and `sf -f data.xlsx` to behave like `sf forecast ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_tracing(matches!(cli.command, Command::Tui(_)));

    match cli.command {
        Command::Forecast(args) => handle_forecast(args),
        Command::Sample(args) => handle_sample(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(args),
    }
}

/// Logs go to stderr. The TUI only shows warnings so the alternate screen
/// stays readable.
fn init_tracing(tui: bool) {
    let fallback = if tui { "seasonal_forecast=warn" } else { "seasonal_forecast=info" };
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let input = resolve_input(&args)?;
    let config = forecast_config_from_args(&args, input)?;
    let run = pipeline::run_forecast(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.dataset, &run.batch, &config)
    );

    let bundle = &run.batch.successes;
    if !bundle.is_empty() {
        println!("{}", crate::report::format_forecast_table(bundle));
        println!("{}", crate::report::format_fit_diagnostics(bundle));
    }
    let failures = crate::report::format_failures(&run.batch.failures);
    if !failures.is_empty() {
        println!("{failures}");
    }

    if config.plot && !bundle.is_empty() {
        println!(
            "{}",
            crate::plot::render_bundle_plots(bundle, config.plot_width, config.plot_height)
        );
    }

    // Results are already on screen; an export failure only affects the files.
    // With every series failed the JSON/debug exports still record why.
    let exported = pipeline::write_exports(&config, &run);
    if let Ok(paths) = &exported {
        for path in paths {
            println!("Wrote {}", path.display());
        }
    }

    if run.batch.all_failed() {
        if let Err(err) = &exported {
            tracing::error!(error = %err, "failure report export failed");
        }
        return Err(AppError::model_fit(format!(
            "No series could be forecast ({} failed).",
            run.batch.failures.len()
        )));
    }
    exported.map(|_| ())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let start = parse_month(&args.start)?;
    let spec = crate::data::SampleSpec {
        variables: args.variables,
        months: args.months,
        start,
        seed: args.seed,
        noise: args.noise,
        ragged_tail: args.ragged_tail,
    };
    let dataset = crate::data::generate_sample(&spec)?;
    crate::io::write_dataset_xlsx(&args.output, &dataset)?;
    println!(
        "Wrote {} ({} variables x {} months, last {})",
        args.output.display(),
        dataset.len(),
        spec.months,
        dataset.last_date()
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = crate::io::read_bundle_json(&args.bundle)?;
    let mut bundle = file.bundle;
    if let Some(name) = &args.variable {
        bundle.results.retain(|r| &r.variable == name);
        if bundle.results.is_empty() {
            return Err(AppError::usage(format!(
                "Variable '{name}' not found in {}.",
                args.bundle.display()
            )));
        }
    }

    println!("{}", crate::plot::render_bundle_plots(&bundle, args.width, args.height));
    if !file.failures.is_empty() {
        println!("{}", crate::report::format_failures(&file.failures));
    }

    if let Some(dir) = &args.charts {
        for path in crate::plot::write_bundle_svgs(dir, &bundle)? {
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn handle_tui(args: ForecastArgs) -> Result<(), AppError> {
    let input = resolve_input(&args)?;
    let config = forecast_config_from_args(&args, input)?;
    crate::tui::run(config)
}

fn resolve_input(args: &ForecastArgs) -> Result<std::path::PathBuf, AppError> {
    match &args.file {
        Some(path) => crate::cli::picker::validate_input_path(path),
        None => crate::cli::picker::prompt_for_input_path(),
    }
}

pub fn forecast_config_from_args(args: &ForecastArgs, input: std::path::PathBuf) -> Result<ForecastConfig, AppError> {
    Ok(ForecastConfig {
        input,
        sheet: args.sheet.clone(),
        date_column: args.date_column.clone(),
        horizon: Horizon::new(args.horizon)?,
        trailing_point: if args.no_trailing_point {
            TrailingPoint::Omit
        } else {
            TrailingPoint::Append
        },
        output_dir: args.output_dir.clone(),
        no_export: args.no_export,
        export_csv: args.export_csv.clone(),
        export_json: args.export_json.clone(),
        chart_dir: args.charts.clone(),
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        debug: args.debug,
    })
}

/// `YYYY-MM` or any full date the loader accepts.
fn parse_month(s: &str) -> Result<NaiveDate, AppError> {
    crate::io::parse_date(s).map_err(|e| AppError::usage(format!("Invalid --start '{s}': {e}")))
}

/// Rewrite argv so `sf` defaults to `sf forecast`.
///
/// Rules:
/// - `sf`                      -> `sf forecast`
/// - `sf -f data.xlsx ...`     -> `sf forecast -f data.xlsx ...`
/// - `sf --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("forecast".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "forecast" | "sample" | "plot" | "tui");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "forecast".to_string());
        return argv;
    }

    argv
}
