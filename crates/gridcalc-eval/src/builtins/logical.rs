//! Logical functions. `IF`/`AND`/`OR`/`IFERROR`/`IFS`/`IFNA` are lazy: they
//! need to skip evaluating branches that aren't taken, or to catch an
//! error from one argument without letting it propagate past the
//! function boundary (`spec.md` §4.5, §9 "Coroutine control flow").

use gridcalc_common::ErrorCode;
use gridcalc_parse::parser::Ast;

use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("IF", FunctionEntry::Lazy(if_fn)),
        ("AND", FunctionEntry::Lazy(and_fn)),
        ("OR", FunctionEntry::Lazy(or_fn)),
        ("NOT", FunctionEntry::Eager(not_fn)),
        ("IFERROR", FunctionEntry::Lazy(iferror_fn)),
        ("IFNA", FunctionEntry::Lazy(ifna_fn)),
        ("IFS", FunctionEntry::Lazy(ifs_fn)),
    ]
}

fn if_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    let Some(cond) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let cond_value = ctx.eval(scope, cond);
    if let Some(e) = cond_value.as_error() {
        return EvalValue::error(e);
    }
    let truthy = match cond_value.as_scalar().is_truthy() {
        Ok(b) => b,
        Err(e) => return EvalValue::error(e),
    };
    if truthy {
        match args.get(1) {
            Some(a) => ctx.eval(scope, a),
            None => EvalValue::boolean(true),
        }
    } else {
        match args.get(2) {
            Some(a) => ctx.eval(scope, a),
            None => EvalValue::boolean(false),
        }
    }
}

fn and_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    fold_logical(ctx, scope, args, true, |acc, b| acc && b)
}

fn or_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    fold_logical(ctx, scope, args, false, |acc, b| acc || b)
}

fn fold_logical(
    ctx: &dyn EvalContext,
    scope: &Scope,
    args: &[Ast],
    identity: bool,
    combine: impl Fn(bool, bool) -> bool,
) -> EvalValue {
    if args.is_empty() {
        return EvalValue::error(ErrorCode::Value);
    }
    let mut acc = identity;
    for arg in args {
        let value = ctx.eval(scope, arg);
        if let Some(e) = value.as_error() {
            return EvalValue::error(e);
        }
        let flattened = value.flatten();
        for scalar in flattened {
            match scalar.is_truthy() {
                Ok(b) => acc = combine(acc, b),
                Err(e) => return EvalValue::error(e),
            }
        }
    }
    EvalValue::boolean(acc)
}

fn not_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match args.first().map(|v| v.as_scalar().is_truthy()) {
        Some(Ok(b)) => EvalValue::boolean(!b),
        Some(Err(e)) => EvalValue::error(e),
        None => EvalValue::error(ErrorCode::Value),
    }
}

fn iferror_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    let Some(primary) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let value = ctx.eval(scope, primary);
    if value.is_error() {
        match args.get(1) {
            Some(fallback) => ctx.eval(scope, fallback),
            None => EvalValue::Scalar(gridcalc_common::FormulaScalar::Null),
        }
    } else {
        value
    }
}

fn ifna_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    let Some(primary) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let value = ctx.eval(scope, primary);
    if value.as_error() == Some(ErrorCode::Na) {
        match args.get(1) {
            Some(fallback) => ctx.eval(scope, fallback),
            None => EvalValue::Scalar(gridcalc_common::FormulaScalar::Null),
        }
    } else {
        value
    }
}

fn ifs_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    if args.len() < 2 || args.len() % 2 != 0 {
        return EvalValue::error(ErrorCode::Value);
    }
    let mut pairs = args.chunks_exact(2);
    for pair in &mut pairs {
        let cond = ctx.eval(scope, &pair[0]);
        if let Some(e) = cond.as_error() {
            return EvalValue::error(e);
        }
        match cond.as_scalar().is_truthy() {
            Ok(true) => return ctx.eval(scope, &pair[1]),
            Ok(false) => continue,
            Err(e) => return EvalValue::error(e),
        }
    }
    EvalValue::error(ErrorCode::Na)
}
