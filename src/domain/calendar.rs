//! Month-end calendar arithmetic.
//!
//! Forecast dates are always the last calendar day of their month, one month
//! apart. All helpers return `None` instead of panicking when chrono's date
//! range would overflow.

use chrono::{Datelike, Months, NaiveDate};

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// `count` consecutive month-end dates, starting with the end of the month
/// that follows `last`'s month.
pub fn month_ends_after(last: NaiveDate, count: usize) -> Option<Vec<NaiveDate>> {
    let first_of_month = NaiveDate::from_ymd_opt(last.year(), last.month(), 1)?;
    let mut out = Vec::with_capacity(count);
    for step in 1..=count {
        let month_start = first_of_month.checked_add_months(Months::new(u32::try_from(step).ok()?))?;
        out.push(month_end(month_start)?);
    }
    Some(out)
}

/// Whether `b` falls exactly one calendar month after `a`.
pub fn is_next_month(a: NaiveDate, b: NaiveDate) -> bool {
    let months_a = a.year() * 12 + a.month0() as i32;
    let months_b = b.year() * 12 + b.month0() as i32;
    months_b - months_a == 1
}

/// Fractional year used as a continuous chart axis (`2024.0` = Jan 2024).
pub fn decimal_year(date: NaiveDate) -> f64 {
    let days_in_month = month_end(date).map(|d| d.day()).unwrap_or(30) as f64;
    date.year() as f64 + (date.month0() as f64 + (date.day() as f64 - 1.0) / days_in_month) / 12.0
}

/// Inverse of [`decimal_year`] at month resolution, for axis labels.
pub fn month_label(decimal_year: f64) -> String {
    if !decimal_year.is_finite() {
        return String::new();
    }
    let year = decimal_year.floor();
    // Nudge so exact month starts survive float rounding.
    let month0 = (((decimal_year - year) * 12.0 + 1e-6).floor() as u32).min(11);
    NaiveDate::from_ymd_opt(year as i32, month0 + 1, 1)
        .map(|d| d.format("%b-%Y").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_end_handles_leap_february() {
        assert_eq!(month_end(ymd(2024, 2, 10)), Some(ymd(2024, 2, 29)));
        assert_eq!(month_end(ymd(2023, 2, 1)), Some(ymd(2023, 2, 28)));
        assert_eq!(month_end(ymd(2023, 12, 31)), Some(ymd(2023, 12, 31)));
    }

    #[test]
    fn month_ends_after_start_in_following_month() {
        let dates = month_ends_after(ymd(2023, 12, 31), 3).unwrap();
        assert_eq!(dates, vec![ymd(2024, 1, 31), ymd(2024, 2, 29), ymd(2024, 3, 31)]);

        // Mid-month history still forecasts from the next month on.
        let dates = month_ends_after(ymd(2023, 6, 1), 1).unwrap();
        assert_eq!(dates, vec![ymd(2023, 7, 31)]);
    }

    #[test]
    fn next_month_detection() {
        assert!(is_next_month(ymd(2023, 12, 31), ymd(2024, 1, 31)));
        assert!(!is_next_month(ymd(2023, 12, 31), ymd(2024, 2, 29)));
    }

    #[test]
    fn month_label_round_trips_decimal_year() {
        assert_eq!(month_label(decimal_year(ymd(2024, 3, 1))), "Mar-2024");
        assert_eq!(month_label(decimal_year(ymd(2024, 12, 31))), "Dec-2024");
    }
}
