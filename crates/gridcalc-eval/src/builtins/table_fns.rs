//! `SUBTOTAL`, the function structured Table ranges lean on to aggregate
//! only their visible/filtered rows (`spec.md` §4.5). This workbook
//! snapshot has no row-visibility state, so every `function_num` here
//! behaves like its non-`10x` counterpart over all rows -- grounded on
//! the snapshot's "no live filter state" scope noted in `SPEC_FULL.md`.

use gridcalc_common::ErrorCode;

use crate::builtins::support::flatten_numbers;
use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![("SUBTOTAL", FunctionEntry::Eager(subtotal))]
}

fn subtotal(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(function_num) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let code = match function_num.coerce_number() {
        Ok(n) => n as i64,
        Err(e) => return EvalValue::error(e),
    };
    let nums = flatten_numbers(&args[1..]);
    let base_code = code % 100; // 101-111 ignore manually-hidden rows; treated as 1-11 here.
    match base_code {
        1 => {
            if nums.is_empty() {
                EvalValue::number(0.0)
            } else {
                EvalValue::number(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        2 => EvalValue::number(nums.len() as f64),
        4 => EvalValue::number(nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
        5 => EvalValue::number(nums.iter().cloned().fold(f64::INFINITY, f64::min)),
        9 => EvalValue::number(nums.iter().sum()),
        11 => {
            if nums.is_empty() {
                EvalValue::error(ErrorCode::Div)
            } else {
                let mean = nums.iter().sum::<f64>() / nums.len() as f64;
                let sum_sq = nums.iter().map(|n| (n - mean).powi(2)).sum::<f64>();
                EvalValue::number(sum_sq / nums.len() as f64)
            }
        }
        _ => EvalValue::error(ErrorCode::Value),
    }
}
