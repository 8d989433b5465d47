//! Spreadsheet ingest and normalization.
//!
//! This module turns an uploaded table (xlsx or CSV bytes) into a clean,
//! date-indexed [`Dataset`]: one [`Series`] per value column.
//!
//! Design goals:
//! - **Strict dates**: a row with values but no readable date aborts the load
//!   (no partial dataset)
//! - **Lenient values**: empty cells are dropped per column; text that is not a
//!   number is kept as a `NaN` marker so the forecast stage can name the column
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no forecasting logic here

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::domain::{Dataset, Series};
use crate::error::AppError;

/// Headers recognized as the date column, in priority order.
pub const DATE_COLUMN_CANDIDATES: [&str; 5] = ["fecha", "date", "month", "mes", "period"];

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Options that affect how a table is read.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Worksheet to read (xlsx only). Defaults to the first sheet.
    pub sheet: Option<String>,
    /// Date column header. Defaults to the first recognized header, else the
    /// first column.
    pub date_column: Option<String>,
}

/// One cell of a raw table, independent of the source format.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn is_numeric(&self) -> bool {
        match self {
            Cell::Number(_) => true,
            Cell::Text(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Read a table from a file on disk.
pub fn load_dataset_file(path: &Path, options: &LoadOptions) -> Result<Dataset, AppError> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::usage(format!("Failed to open input '{}': {e}", path.display())))?;
    load_dataset(&bytes, options)
        .map_err(|e| AppError::new(e.kind(), format!("{}: {}", path.display(), e.message())))
}

/// Parse uploaded bytes into a [`Dataset`].
///
/// Bytes starting with the ZIP signature are read as a workbook; anything
/// else is read as UTF-8 CSV.
pub fn load_dataset(bytes: &[u8], options: &LoadOptions) -> Result<Dataset, AppError> {
    let table = if bytes.starts_with(ZIP_MAGIC) {
        read_workbook(bytes, options.sheet.as_deref())?
    } else {
        read_csv(bytes)?
    };
    build_dataset(table, options)
}

fn read_workbook(bytes: &[u8], sheet: Option<&str>) -> Result<RawTable, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::data_format(format!("Failed to open workbook: {e}")))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                AppError::data_format(format!(
                    "Sheet `{wanted}` not found (available: {}).",
                    sheet_names.join(", ")
                ))
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| AppError::data_format("Workbook contains no sheets."))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AppError::data_format(format!("Failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| AppError::data_format(format!("Sheet '{sheet_name}' is empty.")))?;
    let headers = header_row.iter().map(workbook_cell).map(header_text).collect();
    let rows = rows.map(|row| row.iter().map(workbook_cell).collect()).collect();

    Ok(RawTable { headers, rows })
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::String(s) | Data::DateTimeIso(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Cell::Date(ts.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn read_csv(bytes: &[u8]) -> Result<RawTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::data_format(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(|h| Cell::Text(h.to_string()))
        .map(header_text)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start on the line after the header, lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::data_format(format!("CSV parse error on line {line}: {e}")))?;
        rows.push(
            record
                .iter()
                .map(|s| if s.is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) })
                .collect(),
        );
    }

    Ok(RawTable { headers, rows })
}

fn header_text(cell: Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Number(n) => format_number(n),
        Cell::Date(d) => d.to_string(),
        Cell::Text(s) => s.trim().trim_start_matches('\u{feff}').trim().to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_lowercase()
}

/// Give every column a unique, non-empty name.
///
/// Repeats get `.1`, `.2`, ... skipping any suffix already taken by another
/// header, so `x, x.1, x` becomes `x, x.1, x.2`.
fn unique_headers(raw: &[String]) -> Vec<String> {
    let bases: Vec<String> = raw
        .iter()
        .enumerate()
        .map(|(idx, name)| if name.is_empty() { format!("Unnamed: {idx}") } else { name.clone() })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(bases.len());
    for base in &bases {
        // Generated names never shadow a real header further right.
        let unique = if taken.contains(base) {
            let n = next_suffix.entry(base.as_str()).or_insert(1);
            loop {
                let candidate = format!("{base}.{n}");
                *n += 1;
                if !taken.contains(&candidate) && !bases.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            base.clone()
        };
        taken.insert(unique.clone());
        out.push(unique);
    }
    out
}

/// Where the date column is, and whether it was only guessed (first column).
struct DateColumn {
    idx: usize,
    inferred: bool,
}

fn resolve_date_column(headers: &[String], requested: Option<&str>) -> Result<DateColumn, AppError> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header_name(h)).collect();

    if let Some(requested) = requested {
        let wanted = normalize_header_name(requested);
        return normalized
            .iter()
            .position(|h| *h == wanted)
            .map(|idx| DateColumn { idx, inferred: false })
            .ok_or_else(|| {
                AppError::data_format(format!(
                    "Date column `{requested}` not found (columns: {}).",
                    headers.join(", ")
                ))
            });
    }

    for candidate in DATE_COLUMN_CANDIDATES {
        if let Some(idx) = normalized.iter().position(|h| h == candidate) {
            return Ok(DateColumn { idx, inferred: false });
        }
    }
    Ok(DateColumn { idx: 0, inferred: true })
}

fn build_dataset(table: RawTable, options: &LoadOptions) -> Result<Dataset, AppError> {
    if table.headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::data_format("No header row found."));
    }
    let headers = unique_headers(&table.headers);
    let DateColumn { idx: date_idx, inferred } = resolve_date_column(&headers, options.date_column.as_deref())?;
    let date_name = headers[date_idx].clone();

    let mut dated: Vec<(NaiveDate, Vec<Cell>)> = Vec::new();
    for (idx, mut row) in table.rows.into_iter().enumerate() {
        let line = idx + 2;
        row.resize(headers.len(), Cell::Empty);
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let date = match &row[date_idx] {
            cell if cell.is_empty() => {
                return Err(AppError::data_format(format!(
                    "Row {line}: missing date in column `{date_name}`."
                )));
            }
            // A guessed first column full of numbers is a value column, not serials.
            cell if inferred && cell.is_numeric() => {
                return Err(AppError::data_format(format!(
                    "No date column found: expected a header named one of {} (first column `{date_name}` holds numbers).",
                    DATE_COLUMN_CANDIDATES.join(", ")
                )));
            }
            cell => parse_date_cell(cell).map_err(|e| AppError::data_format(format!("Row {line}: {e}")))?,
        };
        dated.push((date, row));
    }

    if dated.is_empty() {
        return Err(AppError::data_format("The table has no data rows."));
    }

    dated.sort_by_key(|(date, _)| *date);
    if let Some(w) = dated.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(AppError::data_format(format!("Duplicate date {} in column `{date_name}`.", w[0].0)));
    }

    let mut series = Vec::new();
    for (col, name) in headers.iter().enumerate() {
        if col == date_idx {
            continue;
        }
        let mut dates = Vec::new();
        let mut values = Vec::new();
        for (date, row) in &dated {
            let cell = &row[col];
            if cell.is_empty() {
                continue;
            }
            dates.push(*date);
            values.push(parse_value_cell(cell));
        }
        if dates.is_empty() {
            tracing::debug!(column = %name, "dropping empty column");
            continue;
        }
        series.push(Series::new(name.clone(), dates, values)?);
    }

    if series.is_empty() {
        return Err(AppError::data_format(format!(
            "No value columns found besides the date column `{date_name}`."
        )));
    }

    let rows_read = dated.len();
    let dataset = Dataset::new(series, date_name, rows_read)?;
    tracing::info!(
        rows = rows_read,
        series = dataset.len(),
        date_column = %dataset.date_column,
        last_date = %dataset.last_date(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn parse_date_cell(cell: &Cell) -> Result<NaiveDate, String> {
    match cell {
        Cell::Date(d) => Ok(*d),
        Cell::Number(n) => excel_serial_to_date(*n).ok_or_else(|| format!("Invalid date serial {n}.")),
        Cell::Text(s) => parse_date(s.trim()),
        Cell::Empty => Err("Missing date.".to_string()),
    }
}

/// Parse a textual date.
///
/// ISO dates are preferred, but spreadsheet exports often use day-first or
/// month-only layouts. We accept a fixed set of formats so parsing stays
/// deterministic.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Ok(d);
    }
    if let Some(d) = s.parse::<f64>().ok().and_then(excel_serial_to_date) {
        return Ok(d);
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD, YYYY-MM, \
         YYYY-MM-DD HH:MM:SS, or an Excel date serial."
    ))
}

/// Convert an Excel (1900 system) serial day number to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // 9999-12-31 is the largest date Excel can represent.
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

fn parse_value_cell(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(f64::NAN),
        Cell::Date(_) | Cell::Empty => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn csv_with_fecha_column() {
        let mut csv = String::from("fecha,ventas\n");
        for m in 1..=12 {
            csv.push_str(&format!("2023-{m:02}-01,{}\n", 100 + m));
        }
        let ds = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.names(), vec!["ventas"]);
        assert_eq!(ds.date_column, "fecha");
        let s = ds.get("ventas").unwrap();
        assert_eq!(s.len(), 12);
        assert_eq!(s.dates()[0], ymd(2023, 1, 1));
        assert_eq!(s.values()[11], 112.0);
    }

    #[test]
    fn rows_are_sorted_and_columns_trimmed_independently() {
        let csv = "\u{feff}Date,a,b\n2024-03-01,3,\n2024-01-01,1,10\n2024-02-01,2,20\n";
        let ds = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap();
        let a = ds.get("a").unwrap();
        let b = ds.get("b").unwrap();
        assert_eq!(a.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(b.len(), 2);
        assert_eq!(b.last_date(), Some(ymd(2024, 2, 1)));
        assert_eq!(ds.last_date(), ymd(2024, 3, 1));
    }

    #[test]
    fn falls_back_to_first_column() {
        let csv = "when,x\n2024/01/31,1\n2024/02/29,2\n";
        let ds = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.date_column, "when");
        assert_eq!(ds.names(), vec!["x"]);
    }

    #[test]
    fn explicit_date_column_must_exist() {
        let csv = "fecha,x\n2024-01-01,1\n";
        let opts = LoadOptions {
            sheet: None,
            date_column: Some("periodo".to_string()),
        };
        let err = load_dataset(csv.as_bytes(), &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn numeric_first_column_is_not_a_date_column() {
        let csv = "ventas,stock\n100,5\n101,6\n";
        let err = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert!(err.message().contains("No date column"));

        // Serials are fine once the column is named.
        let csv = "fecha,x\n45292,1\n";
        let ds = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.last_date(), ymd(2024, 1, 1));
    }

    #[test]
    fn unparseable_date_is_a_data_format_error() {
        let csv = "fecha,x\n2024-01-01,1\nnot a date,2\n";
        let err = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert!(err.message().contains("Row 3"));
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let csv = "fecha,x\n2024-01-01,1\n2024-01-01,2\n";
        let err = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(err.message().contains("Duplicate"));
    }

    #[test]
    fn blank_rows_and_empty_columns_are_dropped() {
        let csv = "fecha,x,empty\n2024-01-01,1,\n,,\n2024-02-01,2,\n";
        let ds = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.names(), vec!["x"]);
        assert_eq!(ds.rows_read, 2);
    }

    #[test]
    fn only_date_column_is_an_error() {
        let csv = "fecha\n2024-01-01\n";
        assert!(load_dataset(csv.as_bytes(), &LoadOptions::default()).is_err());
    }

    #[test]
    fn text_values_become_markers() {
        let csv = "fecha,x\n2024-01-01,1\n2024-02-01,n/a\n";
        let ds = load_dataset(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert!(ds.get("x").unwrap().values()[1].is_nan());
    }

    #[test]
    fn headers_are_made_unique() {
        let names = unique_headers(&["x".to_string(), "".to_string(), "x".to_string()]);
        assert_eq!(names, vec!["x", "Unnamed: 1", "x.1"]);
    }

    #[test]
    fn generated_header_skips_names_already_in_use() {
        let raw: Vec<String> = ["x", "x.1", "x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique_headers(&raw), vec!["x", "x.1", "x.2"]);

        let ds = load_dataset(b"fecha,x,x.1,x\n2024-01-01,1,2,3\n", &LoadOptions::default()).unwrap();
        assert_eq!(ds.names(), vec!["x", "x.1", "x.2"]);
        assert_eq!(ds.get("x.1").unwrap().values(), &[2.0]);
        assert_eq!(ds.get("x.2").unwrap().values(), &[3.0]);
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("2024-05-31").unwrap(), ymd(2024, 5, 31));
        assert_eq!(parse_date("31/05/2024").unwrap(), ymd(2024, 5, 31));
        assert_eq!(parse_date("31-05-2024").unwrap(), ymd(2024, 5, 31));
        assert_eq!(parse_date("2024/05/31").unwrap(), ymd(2024, 5, 31));
        assert_eq!(parse_date("2024-05").unwrap(), ymd(2024, 5, 1));
        assert_eq!(parse_date("2024-05-31 00:00:00").unwrap(), ymd(2024, 5, 31));
        assert_eq!(parse_date("2024-05-31T12:30:00").unwrap(), ymd(2024, 5, 31));
        assert_eq!(parse_date("45443").unwrap(), ymd(2024, 5, 31));
        assert!(parse_date("May 2024").is_err());
    }

    #[test]
    fn excel_serial_epoch() {
        assert_eq!(excel_serial_to_date(1.0), Some(ymd(1899, 12, 31)));
        assert_eq!(excel_serial_to_date(45292.0), Some(ymd(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
    }
}
