//! Export forecasts to spreadsheets.
//!
//! The xlsx export is the primary deliverable for end users; the CSV variant
//! carries the same table for scripts. Both are built from
//! [`ForecastBundle::table`], so variables with different last observations
//! simply leave blank cells.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use crate::domain::{Dataset, ForecastBundle, ForecastTable, Horizon};
use crate::error::AppError;

/// Worksheet name used for forecast exports.
pub const FORECAST_SHEET: &str = "Forecast";
/// Header of the date column in exports.
pub const DATE_HEADER: &str = "date";

const DATE_FORMAT: &str = "yyyy-mm-dd";

/// `forecast_{h}_months_{YYYYMMDD}.xlsx`
///
/// Runs on the same day with the same horizon share a name, so a later run
/// overwrites an earlier one.
pub fn forecast_file_name(horizon: Horizon, generated_on: NaiveDate) -> String {
    format!("forecast_{}_months_{}.xlsx", horizon.months(), generated_on.format("%Y%m%d"))
}

/// Build the forecast workbook in memory.
pub fn forecast_xlsx_bytes(bundle: &ForecastBundle) -> Result<Vec<u8>, AppError> {
    let mut workbook = forecast_workbook(bundle)?;
    workbook
        .save_to_buffer()
        .map_err(|e| AppError::export(format!("Failed to build forecast workbook: {e}")))
}

/// Write the forecast workbook into `dir` and return its path.
pub fn write_forecast_xlsx(dir: &Path, bundle: &ForecastBundle) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::export(format!("Failed to create output directory '{}': {e}", dir.display())))?;
    let path = dir.join(forecast_file_name(bundle.horizon, bundle.generated_on));

    let mut workbook = forecast_workbook(bundle)?;
    workbook
        .save(&path)
        .map_err(|e| AppError::export(format!("Failed to write '{}': {e}", path.display())))?;

    tracing::info!(path = %path.display(), rows = bundle.table().rows.len(), "forecast exported");
    Ok(path)
}

/// Write the forecast table as CSV (`date` + one column per variable).
pub fn write_forecast_csv(path: &Path, bundle: &ForecastBundle) -> Result<(), AppError> {
    let table = bundle.table();
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::export(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec![DATE_HEADER.to_string()];
    header.extend(table.columns.iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| AppError::export(format!("Failed to write export CSV header: {e}")))?;

    for row in &table.rows {
        let mut record = vec![row.date.to_string()];
        record.extend(row.values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        writer
            .write_record(&record)
            .map_err(|e| AppError::export(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::export(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write a dataset back out as a workbook (date column + one column per series).
pub fn write_dataset_xlsx(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let mut workbook = dataset_workbook(dataset)?;
    workbook
        .save(path)
        .map_err(|e| AppError::export(format!("Failed to write '{}': {e}", path.display())))
}

/// In-memory variant of [`write_dataset_xlsx`].
pub fn dataset_xlsx_bytes(dataset: &Dataset) -> Result<Vec<u8>, AppError> {
    let mut workbook = dataset_workbook(dataset)?;
    workbook
        .save_to_buffer()
        .map_err(|e| AppError::export(format!("Failed to build dataset workbook: {e}")))
}

fn forecast_workbook(bundle: &ForecastBundle) -> Result<Workbook, AppError> {
    let table: ForecastTable = bundle.table();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(FORECAST_SHEET).map_err(xlsx_err)?;

    let rows = table
        .rows
        .iter()
        .map(|r| (r.date, r.values.iter().map(|v| v.map(|v| v as f64)).collect::<Vec<_>>()));
    write_table(sheet, DATE_HEADER, &table.columns, rows)?;
    Ok(workbook)
}

fn dataset_workbook(dataset: &Dataset) -> Result<Workbook, AppError> {
    let mut dates: Vec<NaiveDate> = dataset.series().iter().flat_map(|s| s.dates().to_vec()).collect();
    dates.sort();
    dates.dedup();

    let columns: Vec<String> = dataset.names().into_iter().map(str::to_string).collect();
    let rows = dates.iter().map(|&date| {
        let values = dataset
            .series()
            .iter()
            .map(|s| s.points().find(|(d, _)| *d == date).map(|(_, v)| v))
            .collect::<Vec<_>>();
        (date, values)
    });

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    write_table(sheet, &dataset.date_column, &columns, rows)?;
    Ok(workbook)
}

fn write_table<I>(sheet: &mut Worksheet, date_header: &str, columns: &[String], rows: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = (NaiveDate, Vec<Option<f64>>)>,
{
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    sheet.write_string(0, 0, date_header).map_err(xlsx_err)?;
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string(0, col_index(col + 1)?, name).map_err(xlsx_err)?;
    }
    sheet.set_column_width(0, 12).map_err(xlsx_err)?;

    for (i, (date, values)) in rows.into_iter().enumerate() {
        let row = u32::try_from(i + 1).map_err(|_| AppError::export("Too many rows for a worksheet."))?;
        let cell_date = excel_date(date)?;
        sheet
            .write_datetime_with_format(row, 0, &cell_date, &date_format)
            .map_err(xlsx_err)?;
        for (col, value) in values.into_iter().enumerate() {
            // Blank cell where a variable has no value for this date.
            if let Some(v) = value.filter(|v| v.is_finite()) {
                sheet.write_number(row, col_index(col + 1)?, v).map_err(xlsx_err)?;
            }
        }
    }
    Ok(())
}

fn excel_date(date: NaiveDate) -> Result<ExcelDateTime, AppError> {
    let year = u16::try_from(date.year()).map_err(|_| AppError::export(format!("Date {date} is out of range.")))?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).map_err(xlsx_err)
}

fn col_index(col: usize) -> Result<u16, AppError> {
    u16::try_from(col).map_err(|_| AppError::export("Too many columns for a worksheet."))
}

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> AppError {
    AppError::export(format!("Spreadsheet write failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Series, TrailingPoint};
    use crate::io::{LoadOptions, load_dataset};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn file_name_carries_horizon_and_date() {
        let name = forecast_file_name(Horizon::new(6).unwrap(), ymd(2024, 3, 9));
        assert_eq!(name, "forecast_6_months_20240309.xlsx");
    }

    #[test]
    fn dataset_workbook_reads_back() {
        let dates = vec![ymd(2024, 1, 31), ymd(2024, 2, 29), ymd(2024, 3, 31)];
        let a = Series::new("ventas", dates.clone(), vec![1.0, 2.5, 3.0]).unwrap();
        let b = Series::new("stock", dates[..2].to_vec(), vec![7.0, 8.0]).unwrap();
        let ds = Dataset::new(vec![a, b], "fecha", 3).unwrap();

        let bytes = dataset_xlsx_bytes(&ds).unwrap();
        let back = load_dataset(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(back.date_column, "fecha");
        assert_eq!(back.get("ventas").unwrap().dates(), &dates[..]);
        assert_eq!(back.get("ventas").unwrap().values(), &[1.0, 2.5, 3.0]);
        assert_eq!(back.get("stock").unwrap().len(), 2);
    }

    #[test]
    fn empty_bundle_still_writes_header() {
        let bundle = ForecastBundle {
            horizon: Horizon::default(),
            trailing_point: TrailingPoint::Append,
            generated_on: ymd(2024, 1, 1),
            results: Vec::new(),
        };
        let bytes = forecast_xlsx_bytes(&bundle).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
