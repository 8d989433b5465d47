//! End-to-end checks: workbook bytes -> dataset -> forecasts -> export.

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use seasonal_forecast::data::{SampleSpec, generate_sample};
use seasonal_forecast::domain::{Dataset, FailureStage, Horizon, Series, TrailingPoint, is_next_month, month_ends_after};
use seasonal_forecast::error::ErrorKind;
use seasonal_forecast::forecast::{ForecastEngine, forecast_all_on};
use seasonal_forecast::io::{LoadOptions, dataset_xlsx_bytes, load_dataset, load_dataset_file, write_forecast_xlsx};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    ymd(2024, 6, 15)
}

/// `fecha` + one column per `(name, values)`, one row per month end starting
/// at `first`.
fn workbook(first: NaiveDate, columns: &[(&str, Vec<f64>)]) -> Vec<u8> {
    let rows = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let mut dates = vec![first];
    dates.extend(month_ends_after(first, rows.saturating_sub(1)).unwrap());

    let mut wb = Workbook::new();
    let sheet = wb.add_worksheet();
    let fmt = Format::new().set_num_format("yyyy-mm-dd");
    sheet.write_string(0, 0, "fecha").unwrap();
    for (c, (name, _)) in columns.iter().enumerate() {
        sheet.write_string(0, c as u16 + 1, *name).unwrap();
    }
    for (r, date) in dates.iter().enumerate() {
        let cell = ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8).unwrap();
        sheet.write_datetime_with_format(r as u32 + 1, 0, &cell, &fmt).unwrap();
        for (c, (_, values)) in columns.iter().enumerate() {
            if let Some(v) = values.get(r) {
                sheet.write_number(r as u32 + 1, c as u16 + 1, *v).unwrap();
            }
        }
    }
    wb.save_to_buffer().unwrap()
}

fn seasonal(n: usize) -> Vec<f64> {
    (0..n)
        .map(|t| 200.0 + 2.0 * t as f64 + [0.0, 5.0, 12.0, 20.0, 9.0, -4.0, -10.0, -15.0, -6.0, 3.0, 8.0, 14.0][t % 12])
        .collect()
}

#[test]
fn loader_round_trip_keeps_dates_and_values() {
    let values: Vec<f64> = (0..24).map(|t| 100.0 + t as f64).collect();
    let bytes = workbook(ymd(2022, 1, 31), &[("ventas", values.clone())]);

    let ds = load_dataset(&bytes, &LoadOptions::default()).unwrap();
    assert_eq!(ds.names(), vec!["ventas"]);
    assert_eq!(ds.date_column, "fecha");
    let s = ds.get("ventas").unwrap();
    assert_eq!(s.len(), 24);
    assert_eq!(s.dates()[0], ymd(2022, 1, 31));
    assert_eq!(s.dates()[23], ymd(2023, 12, 31));
    assert_eq!(s.values(), &values[..]);
}

#[test]
fn horizon_plus_one_points_monthly_after_history() {
    let bytes = workbook(ymd(2021, 1, 31), &[("ventas", seasonal(36)), ("stock", seasonal(30))]);
    let ds = load_dataset(&bytes, &LoadOptions::default()).unwrap();
    let engine = ForecastEngine::default();

    for h in [1, 12, 36] {
        let batch = forecast_all_on(&ds, Horizon::new(h).unwrap(), &engine, today());
        assert!(batch.failures.is_empty(), "{:?}", batch.failures);
        for r in &batch.successes.results {
            assert_eq!(r.points.len(), h as usize + 1);

            let mut prev = r.history.last_date().unwrap();
            for p in &r.points {
                assert!(is_next_month(prev, p.date), "{prev} -> {}", p.date);
                prev = p.date;
            }
        }
    }
}

#[test]
fn trailing_point_repeats_the_one_step_forecast() {
    let ds = generate_sample(&SampleSpec::default()).unwrap();
    let h = Horizon::new(4).unwrap();

    let append = forecast_all_on(&ds, h, &ForecastEngine::new(TrailingPoint::Append), today());
    let omit = forecast_all_on(&ds, h, &ForecastEngine::new(TrailingPoint::Omit), today());

    for (a, o) in append.successes.results.iter().zip(&omit.successes.results) {
        assert_eq!(o.points.len(), 4);
        assert_eq!(a.points.len(), 5);
        assert_eq!(&a.points[..4], &o.points[..]);
        assert_eq!(a.points[4].value, a.points[0].value);
    }
}

#[test]
fn forecasting_is_idempotent() {
    let ds = generate_sample(&SampleSpec::default()).unwrap();
    let engine = ForecastEngine::default();
    let h = Horizon::new(6).unwrap();
    assert_eq!(forecast_all_on(&ds, h, &engine, today()), forecast_all_on(&ds, h, &engine, today()));
}

#[test]
fn declining_series_is_clamped_at_zero() {
    // Falls by 10 a month and reaches 0 at the last observation.
    let values: Vec<f64> = (0..24).map(|t| 230.0 - 10.0 * t as f64).collect();
    let bytes = workbook(ymd(2022, 1, 31), &[("stock", values)]);
    let ds = load_dataset(&bytes, &LoadOptions::default()).unwrap();

    let batch = forecast_all_on(&ds, Horizon::new(6).unwrap(), &ForecastEngine::default(), today());
    let r = batch.successes.get("stock").unwrap();
    assert_eq!(r.points.len(), 7);
    assert!(r.points.iter().all(|p| p.value == 0));
}

#[test]
fn constant_series_forecasts_its_level() {
    let bytes = workbook(ymd(2022, 1, 31), &[("visitas", vec![100.0; 24])]);
    let ds = load_dataset(&bytes, &LoadOptions::default()).unwrap();

    let batch = forecast_all_on(&ds, Horizon::new(3).unwrap(), &ForecastEngine::default(), today());
    let r = batch.successes.get("visitas").unwrap();
    assert_eq!(r.points.len(), 4);
    assert!(r.points.iter().all(|p| (99..=101).contains(&p.value)), "{:?}", r.points);
    assert_eq!(r.points[0].date, ymd(2024, 1, 31));
    assert_eq!(r.points[2].date, ymd(2024, 3, 31));
}

#[test]
fn short_series_fails_alone() {
    let mut dates = vec![ymd(2022, 1, 31)];
    dates.extend(month_ends_after(ymd(2022, 1, 31), 23).unwrap());
    let long = Series::new("ventas", dates.clone(), seasonal(24)).unwrap();
    let short = Series::new("nuevo", dates[21..].to_vec(), vec![1.0, 2.0, 3.0]).unwrap();
    let ds = Dataset::new(vec![short, long], "fecha", 24).unwrap();

    let batch = forecast_all_on(&ds, Horizon::new(2).unwrap(), &ForecastEngine::default(), today());
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].variable, "nuevo");
    assert_eq!(batch.failures[0].stage, FailureStage::Validate);
    assert_eq!(batch.successes.results.len(), 1);
    assert_eq!(batch.successes.results[0].variable, "ventas");
    assert!(!batch.all_failed());
}

#[test]
fn missing_date_column_aborts_the_load() {
    let mut wb = Workbook::new();
    let sheet = wb.add_worksheet();
    sheet.write_string(0, 0, "ventas").unwrap();
    sheet.write_string(0, 1, "stock").unwrap();
    for r in 1..=24u32 {
        sheet.write_number(r, 0, 100.0 + r as f64).unwrap();
        sheet.write_number(r, 1, 50.0).unwrap();
    }
    let bytes = wb.save_to_buffer().unwrap();

    let err = load_dataset(&bytes, &LoadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataFormat);
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn horizon_bounds_are_enforced() {
    assert_eq!(Horizon::new(0).unwrap_err().kind(), ErrorKind::Usage);
    assert_eq!(Horizon::new(37).unwrap_err().kind(), ErrorKind::Usage);
    assert!(Horizon::new(36).is_ok());
}

#[test]
fn exported_workbook_reads_back() {
    let ds = generate_sample(&SampleSpec {
        ragged_tail: 2,
        ..SampleSpec::default()
    })
    .unwrap();
    let h = Horizon::new(3).unwrap();
    let batch = forecast_all_on(&ds, h, &ForecastEngine::default(), today());

    let dir = tempfile::tempdir().unwrap();
    let path = write_forecast_xlsx(dir.path(), &batch.successes).unwrap();
    assert_eq!(path.file_name().unwrap(), "forecast_3_months_20240615.xlsx");

    let back = load_dataset_file(&path, &LoadOptions::default()).unwrap();
    assert_eq!(back.date_column, "date");
    assert_eq!(back.names(), ds.names());
    for r in &batch.successes.results {
        let s = back.get(&r.variable).unwrap();
        assert_eq!(s.dates(), &r.forecast_dates()[..]);
        let values: Vec<f64> = r.points.iter().map(|p| p.value as f64).collect();
        assert_eq!(s.values(), &values[..]);
    }
    // Ragged tails: the table spans the union of dates.
    assert_eq!(back.rows_read, 4 + 2);
}

#[test]
fn sample_workbook_loads_back_identically() {
    let ds = generate_sample(&SampleSpec::default()).unwrap();
    let bytes = dataset_xlsx_bytes(&ds).unwrap();
    assert_eq!(load_dataset(&bytes, &LoadOptions::default()).unwrap(), ds);
}
