//! Argument helpers shared across the built-in function modules --
//! the "helpers bundle" `spec.md` §4.5 gives to eager functions.

use gridcalc_common::{ErrorCode, FormulaScalar};

use crate::values::EvalValue;

/// Flatten every argument (scalar or array) and keep only the numeric
/// cells, the rule `spec.md` §8 states for `SUM`/aggregate functions:
/// non-numeric entries are skipped rather than erroring.
pub fn flatten_numbers(values: &[EvalValue]) -> Vec<f64> {
    values
        .iter()
        .flat_map(|v| v.flatten())
        .filter_map(|s| match s {
            FormulaScalar::Number(n) => Some(n),
            _ => None,
        })
        .collect()
}

/// Like [`flatten_numbers`] but counts booleans as 0/1 and numeric text as
/// its parsed value -- the stricter coercion rule used by arithmetic-style
/// functions (`ROUND`, `POWER`, ...) when called with a single argument
/// rather than aggregated over a range.
pub fn single_number(values: &[EvalValue], index: usize) -> Result<f64, ErrorCode> {
    values.get(index).ok_or(ErrorCode::Value)?.coerce_number()
}

pub fn single_text(values: &[EvalValue], index: usize) -> Result<String, ErrorCode> {
    values.get(index).ok_or(ErrorCode::Value)?.coerce_text()
}

pub fn optional_number(values: &[EvalValue], index: usize, default: f64) -> Result<f64, ErrorCode> {
    match values.get(index) {
        Some(v) => v.coerce_number(),
        None => Ok(default),
    }
}

pub fn flatten_all(values: &[EvalValue]) -> Vec<FormulaScalar> {
    values.iter().flat_map(|v| v.flatten()).collect()
}

/// Half-away-from-zero rounding to `digits` decimal places (`spec.md`
/// §4.7 "Rounding", also the `ROUND` family's contract).
pub fn round_half_away_from_zero(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    if value >= 0.0 { (value * factor + 0.5).floor() / factor } else { (value * factor - 0.5).ceil() / factor }
}
