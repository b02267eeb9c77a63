//! Date coercion for the consolidated output.
//!
//! Every `Fecha_i` cell must come out as `YYYY-MM-DD` with no time
//! component, or as an empty cell when the value cannot be read as a date.
//! Fallback order: native date cell (Excel serial), parseable string,
//! plain serial number, empty.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::types::CellValue;

/// Largest serial Excel itself accepts (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// String layouts accepted for date cells, tried in order. Date-only
/// layouts first, then the datetime shapes pandas-style exports produce.
const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// Normalize one date cell to `Text("YYYY-MM-DD")` or `Empty`.
pub fn normalize(cell: &CellValue) -> CellValue {
    let date = match cell {
        CellValue::DateLike(serial) => serial_to_date(*serial),
        CellValue::Text(s) => parse_date_string(s),
        CellValue::Number(n) => serial_to_date(*n),
        CellValue::Empty => None,
    };
    match date {
        Some(d) => CellValue::Text(d.format("%Y-%m-%d").to_string()),
        None => CellValue::Empty,
    }
}

/// Excel serial to calendar date. Serial 1 is 1900-01-01; serials below 60
/// need a one-day shift against the 1899-12-30 epoch because Excel counts
/// the nonexistent 1900-02-29.
pub(crate) fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let mut days = serial.trunc() as i64;
    if days < 60 {
        days += 1;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(days))
}

pub(crate) fn format_serial(serial: f64) -> Option<String> {
    serial_to_date(serial).map(|d| d.format("%Y-%m-%d").to_string())
}

fn parse_date_string(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            return Some(d);
        }
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt.date());
        }
    }
    None
}
