//! Cell values, evaluation scalars, and the Excel serial-date epoch.

use chrono::{Duration as ChronoDur, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt::{self, Display};

use crate::ErrorCode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── Excel date-serial utilities ─────────────────────
Excel's 1900 serial system:
  Serial 1  = 1900-01-01
  Serial 59 = 1900-02-28
  Serial 60 = 1900-02-29  (phantom -- Lotus 1-2-3 compatibility bug)
  Serial 61 = 1900-03-01
Base date = 1899-12-31 so that serial 1 = base + 1 day = 1900-01-01.
The 1904 system is the same math shifted by the fixed 1462-day offset
between 1900-01-01 and 1904-01-01.
------------------------------------------------------------------------ */

const EXCEL_1900_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
const MARCH_1900: NaiveDate = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();

/// Days between the 1900 and 1904 epochs (serial 1 in each system).
pub const DATE_SYSTEM_1904_OFFSET: i64 = 1462;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateSystem {
    Excel1900,
    Excel1904,
}

impl Default for DateSystem {
    fn default() -> Self {
        DateSystem::Excel1900
    }
}

impl Display for DateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSystem::Excel1900 => write!(f, "1900"),
            DateSystem::Excel1904 => write!(f, "1904"),
        }
    }
}

impl DateSystem {
    pub fn parse(s: &str) -> DateSystem {
        match s.trim() {
            "1904" => DateSystem::Excel1904,
            _ => DateSystem::Excel1900,
        }
    }

    /// Convert a naive date/time to this system's serial number.
    pub fn datetime_to_serial(&self, dt: &NaiveDateTime) -> f64 {
        let serial_1900 = datetime_to_serial_1900(dt);
        match self {
            DateSystem::Excel1900 => serial_1900,
            DateSystem::Excel1904 => serial_1900 - DATE_SYSTEM_1904_OFFSET as f64,
        }
    }

    /// Convert a serial number in this system back to a naive date/time.
    pub fn serial_to_datetime(&self, serial: f64) -> NaiveDateTime {
        let serial_1900 = match self {
            DateSystem::Excel1900 => serial,
            DateSystem::Excel1904 => serial + DATE_SYSTEM_1904_OFFSET as f64,
        };
        serial_to_datetime_1900(serial_1900)
    }
}

fn datetime_to_serial_1900(dt: &NaiveDateTime) -> f64 {
    let days = (dt.date() - EXCEL_1900_EPOCH).num_days();
    // Dates on or after 1900-03-01 get +1 to account for the phantom Feb 29.
    let serial_days = if dt.date() >= MARCH_1900 { days + 1 } else { days };
    let secs_in_day = dt.time().num_seconds_from_midnight() as f64
        + dt.time().nanosecond() as f64 / 1_000_000_000.0;
    serial_days as f64 + secs_in_day / 86_400.0
}

fn serial_to_datetime_1900(serial: f64) -> NaiveDateTime {
    let days = serial.floor() as i64;
    let frac = serial - days as f64;
    let frac_secs = (frac * 86_400.0).round() as i64;

    let date = if days == 60 {
        // Serial 60 is the phantom 1900-02-29; collapse to 1900-02-28.
        MARCH_1900.pred_opt().unwrap()
    } else {
        let offset = if days < 60 { days } else { days - 1 };
        EXCEL_1900_EPOCH + ChronoDur::days(offset)
    };

    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (frac_secs.rem_euclid(86_400)) as u32,
        0,
    )
    .unwrap();
    date.and_time(time)
}

/// A raw value stored in a workbook cell, as materialized from the XLSX
/// snapshot (see `spec.md` §3 "CellValue"). Distinct from [`FormulaScalar`],
/// which is what the evaluator produces.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Number(f64),
    Boolean(bool),
    Error(ErrorCode),
    /// ISO-8601 date/time string, as materialized by the style-aware cell
    /// reader external to this crate.
    Date(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// The result of evaluating a formula or resolving a cell (`spec.md` §3
/// "FormulaScalar"). Errors are values here, never exceptions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaScalar {
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
    Error(ErrorCode),
}

impl FormulaScalar {
    pub fn error(code: ErrorCode) -> FormulaScalar {
        FormulaScalar::Error(code)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormulaScalar::Error(_))
    }

    pub fn as_error(&self) -> Option<ErrorCode> {
        match self {
            FormulaScalar::Error(code) => Some(*code),
            _ => None,
        }
    }

    /// Map a stored [`CellValue`] to the scalar the evaluator hands back
    /// for a non-formula cell (`spec.md` §4.6 "Cell resolution").
    pub fn from_cell_value(value: &CellValue) -> FormulaScalar {
        match value {
            CellValue::Empty => FormulaScalar::Null,
            CellValue::String(s) => FormulaScalar::Text(s.clone()),
            CellValue::Number(n) => FormulaScalar::Number(*n),
            CellValue::Boolean(b) => FormulaScalar::Boolean(*b),
            CellValue::Error(e) => FormulaScalar::Error(*e),
            CellValue::Date(iso) => FormulaScalar::Text(iso.clone()),
        }
    }

    /// Coerce to a number the way arithmetic operators do: numeric text
    /// parses, booleans become 0/1, empty is 0. Anything else is
    /// `#VALUE!`.
    pub fn coerce_number(&self) -> Result<f64, ErrorCode> {
        match self {
            FormulaScalar::Number(n) => Ok(*n),
            FormulaScalar::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FormulaScalar::Null => Ok(0.0),
            FormulaScalar::Text(s) => s.trim().parse::<f64>().map_err(|_| ErrorCode::Value),
            FormulaScalar::Error(e) => Err(*e),
        }
    }

    /// Stringify following the `&` concatenation rules of spec.md §4.6:
    /// booleans render `TRUE`/`FALSE`, numbers render via `General`.
    pub fn coerce_text(&self) -> Result<String, ErrorCode> {
        match self {
            FormulaScalar::Text(s) => Ok(s.clone()),
            FormulaScalar::Number(n) => Ok(general_number_text(*n)),
            FormulaScalar::Boolean(b) => Ok(if *b { "TRUE".to_string() } else { "FALSE".to_string() }),
            FormulaScalar::Null => Ok(String::new()),
            FormulaScalar::Error(e) => Err(*e),
        }
    }

    pub fn is_truthy(&self) -> Result<bool, ErrorCode> {
        match self {
            FormulaScalar::Boolean(b) => Ok(*b),
            FormulaScalar::Number(n) => Ok(*n != 0.0),
            FormulaScalar::Text(s) => {
                match s.to_ascii_uppercase().as_str() {
                    "TRUE" => Ok(true),
                    "FALSE" => Ok(false),
                    _ => Err(ErrorCode::Value),
                }
            }
            FormulaScalar::Null => Ok(false),
            FormulaScalar::Error(e) => Err(*e),
        }
    }
}

/// Minimal stand-in for Excel's `General` number format, used for `&`
/// concatenation and as the fallback renderer when no format code applies.
/// The full placeholder/section grammar lives in `gridcalc-format`.
pub fn general_number_text(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if !(1e-9..1e11).contains(&abs) {
        return format!("{n:E}");
    }
    let mut s = format!("{n:.10}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

impl Display for FormulaScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaScalar::Null => write!(f, ""),
            FormulaScalar::Text(s) => write!(f, "{s}"),
            FormulaScalar::Number(n) => write!(f, "{}", general_number_text(*n)),
            FormulaScalar::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            FormulaScalar::Error(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_zero_is_1904_epoch_under_1904_system() {
        let dt = DateSystem::Excel1904.serial_to_datetime(0.0);
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "1904-01-01");
    }

    #[test]
    fn serial_one_is_1900_01_01() {
        let dt = DateSystem::Excel1900.serial_to_datetime(1.0);
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "1900-01-01");
    }

    #[test]
    fn phantom_leap_day_collapses_to_feb_28() {
        let dt = DateSystem::Excel1900.serial_to_datetime(60.0);
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "1900-02-28");
        let mar1 = DateSystem::Excel1900.serial_to_datetime(61.0);
        assert_eq!(mar1.format("%Y-%m-%d").to_string(), "1900-03-01");
    }

    #[test]
    fn round_trip_through_serial() {
        let dt = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap();
        let serial = DateSystem::Excel1900.datetime_to_serial(&dt);
        let back = DateSystem::Excel1900.serial_to_datetime(serial);
        assert_eq!(back, dt);
    }

    #[test]
    fn coerce_number_rules() {
        assert_eq!(FormulaScalar::Boolean(true).coerce_number(), Ok(1.0));
        assert_eq!(FormulaScalar::Null.coerce_number(), Ok(0.0));
        assert_eq!(FormulaScalar::Text("3.5".into()).coerce_number(), Ok(3.5));
        assert_eq!(
            FormulaScalar::Text("x".into()).coerce_number(),
            Err(ErrorCode::Value)
        );
    }
}
