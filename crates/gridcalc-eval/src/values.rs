//! The evaluator-internal result type: a formula argument or sub-result is
//! either a single scalar or a 2D array (from a range, an array literal, or
//! a function that returns one) (`spec.md` §4.6 "Range resolution").

use gridcalc_common::{ErrorCode, FormulaScalar};

#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Scalar(FormulaScalar),
    Array(Vec<Vec<FormulaScalar>>),
}

impl EvalValue {
    pub fn error(code: ErrorCode) -> EvalValue {
        EvalValue::Scalar(FormulaScalar::Error(code))
    }

    pub fn number(n: f64) -> EvalValue {
        EvalValue::Scalar(FormulaScalar::Number(n))
    }

    pub fn text(s: impl Into<String>) -> EvalValue {
        EvalValue::Scalar(FormulaScalar::Text(s.into()))
    }

    pub fn boolean(b: bool) -> EvalValue {
        EvalValue::Scalar(FormulaScalar::Boolean(b))
    }

    /// Collapse an array down to its top-left cell, the rule Excel applies
    /// when a range is used where a scalar argument is expected.
    pub fn as_scalar(&self) -> FormulaScalar {
        match self {
            EvalValue::Scalar(s) => s.clone(),
            EvalValue::Array(rows) => {
                rows.first().and_then(|r| r.first()).cloned().unwrap_or(FormulaScalar::Null)
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EvalValue::Scalar(FormulaScalar::Error(_)))
    }

    pub fn as_error(&self) -> Option<ErrorCode> {
        match self {
            EvalValue::Scalar(FormulaScalar::Error(e)) => Some(*e),
            _ => None,
        }
    }

    /// Row-major flattening used by aggregate functions (`SUM`, `COUNT`, ...).
    pub fn flatten(&self) -> Vec<FormulaScalar> {
        match self {
            EvalValue::Scalar(s) => vec![s.clone()],
            EvalValue::Array(rows) => rows.iter().flat_map(|r| r.iter().cloned()).collect(),
        }
    }

    pub fn coerce_number(&self) -> Result<f64, ErrorCode> {
        self.as_scalar().coerce_number()
    }

    pub fn coerce_text(&self) -> Result<String, ErrorCode> {
        self.as_scalar().coerce_text()
    }
}

impl From<FormulaScalar> for EvalValue {
    fn from(s: FormulaScalar) -> EvalValue {
        EvalValue::Scalar(s)
    }
}

/// Propagate the first error found across a set of already-evaluated
/// arguments -- the common case for eager functions before doing real work.
pub fn first_error(values: &[EvalValue]) -> Option<ErrorCode> {
    values.iter().find_map(|v| v.as_error())
}
