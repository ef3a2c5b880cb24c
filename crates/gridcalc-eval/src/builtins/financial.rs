//! Time-value-of-money functions (`spec.md` §4.5 supplement).

use gridcalc_common::ErrorCode;

use crate::builtins::support::optional_number;
use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("PMT", FunctionEntry::Eager(pmt)),
        ("PV", FunctionEntry::Eager(pv)),
        ("FV", FunctionEntry::Eager(fv)),
        ("RATE", FunctionEntry::Eager(rate)),
    ]
}

fn args_rnpv(args: &[EvalValue]) -> Result<(f64, f64, f64, f64, f64), ErrorCode> {
    let rate = args.first().ok_or(ErrorCode::Value)?.coerce_number()?;
    let nper = args.get(1).ok_or(ErrorCode::Value)?.coerce_number()?;
    let pv_or_pmt = args.get(2).ok_or(ErrorCode::Value)?.coerce_number()?;
    let extra = optional_number(args, 3, 0.0)?;
    let when_due = optional_number(args, 4, 0.0)?;
    Ok((rate, nper, pv_or_pmt, extra, when_due))
}

/// `PMT(rate, nper, pv, [fv], [type])`.
fn pmt(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let (rate, nper, pv, fv, due) = match args_rnpv(args) {
        Ok(v) => v,
        Err(e) => return EvalValue::error(e),
    };
    if rate == 0.0 {
        return EvalValue::number(-(pv + fv) / nper);
    }
    let factor = (1.0 + rate).powf(nper);
    let due_mult = if due != 0.0 { 1.0 + rate } else { 1.0 };
    let payment = -(pv * factor + fv) / (due_mult * (factor - 1.0) / rate);
    EvalValue::number(payment)
}

/// `PV(rate, nper, pmt, [fv], [type])`.
fn pv(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let (rate, nper, pmt, fv, due) = match args_rnpv(args) {
        Ok(v) => v,
        Err(e) => return EvalValue::error(e),
    };
    if rate == 0.0 {
        return EvalValue::number(-(pmt * nper + fv));
    }
    let factor = (1.0 + rate).powf(nper);
    let due_mult = if due != 0.0 { 1.0 + rate } else { 1.0 };
    let present = -(fv + pmt * due_mult * (factor - 1.0) / rate) / factor;
    EvalValue::number(present)
}

/// `FV(rate, nper, pmt, [pv], [type])`.
fn fv(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let (rate, nper, pmt, pv, due) = match args_rnpv(args) {
        Ok(v) => v,
        Err(e) => return EvalValue::error(e),
    };
    if rate == 0.0 {
        return EvalValue::number(-(pv + pmt * nper));
    }
    let factor = (1.0 + rate).powf(nper);
    let due_mult = if due != 0.0 { 1.0 + rate } else { 1.0 };
    let future = -(pv * factor + pmt * due_mult * (factor - 1.0) / rate);
    EvalValue::number(future)
}

/// `RATE(nper, pmt, pv, [fv], [type], [guess])`, solved by Newton's method
/// since there's no closed form (the same approach Excel documents for
/// this function).
fn rate(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let nper = match args.first() {
        Some(v) => match v.coerce_number() {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        },
        None => return EvalValue::error(ErrorCode::Value),
    };
    let pmt = match args.get(1) {
        Some(v) => match v.coerce_number() {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        },
        None => return EvalValue::error(ErrorCode::Value),
    };
    let pv = match args.get(2) {
        Some(v) => match v.coerce_number() {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        },
        None => return EvalValue::error(ErrorCode::Value),
    };
    let fv = match optional_number(args, 3, 0.0) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let due = match optional_number(args, 4, 0.0) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let mut guess = match optional_number(args, 5, 0.1) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };

    let f = |r: f64| -> f64 {
        if r == 0.0 {
            pv + pmt * nper + fv
        } else {
            let factor = (1.0 + r).powf(nper);
            let due_mult = if due != 0.0 { 1.0 + r } else { 1.0 };
            pv * factor + pmt * due_mult * (factor - 1.0) / r + fv
        }
    };
    let eps = 1e-7;
    for _ in 0..50 {
        let value = f(guess);
        let derivative = (f(guess + eps) - value) / eps;
        if derivative.abs() < 1e-12 {
            break;
        }
        let next = guess - value / derivative;
        if (next - guess).abs() < 1e-10 {
            guess = next;
            break;
        }
        guess = next;
    }
    if guess.is_finite() {
        EvalValue::number(guess)
    } else {
        EvalValue::error(ErrorCode::Num)
    }
}
