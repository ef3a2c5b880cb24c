//! Arithmetic and math functions (`spec.md` §4.5).

use gridcalc_common::ErrorCode;

use crate::builtins::support::{flatten_numbers, optional_number, round_half_away_from_zero, single_number};
use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("SUM", FunctionEntry::Eager(sum)),
        ("AVERAGE", FunctionEntry::Eager(average)),
        ("MIN", FunctionEntry::Eager(min)),
        ("MAX", FunctionEntry::Eager(max)),
        ("ABS", FunctionEntry::Eager(abs)),
        ("ROUND", FunctionEntry::Eager(round)),
        ("ROUNDUP", FunctionEntry::Eager(roundup)),
        ("ROUNDDOWN", FunctionEntry::Eager(rounddown)),
        ("TRUNC", FunctionEntry::Eager(trunc)),
        ("INT", FunctionEntry::Eager(int_fn)),
        ("MOD", FunctionEntry::Eager(modulo)),
        ("POWER", FunctionEntry::Eager(power)),
        ("SQRT", FunctionEntry::Eager(sqrt)),
        ("SIGN", FunctionEntry::Eager(sign)),
        ("SIN", FunctionEntry::Eager(|v, _, _| unary_math(v, f64::sin))),
        ("COS", FunctionEntry::Eager(|v, _, _| unary_math(v, f64::cos))),
        ("TAN", FunctionEntry::Eager(|v, _, _| unary_math(v, f64::tan))),
        ("LN", FunctionEntry::Eager(ln)),
        ("LOG10", FunctionEntry::Eager(|v, _, _| unary_math_domain(v, |n| n > 0.0, f64::log10))),
        ("LOG", FunctionEntry::Eager(log)),
        ("EXP", FunctionEntry::Eager(|v, _, _| unary_math(v, f64::exp))),
        ("SMALL", FunctionEntry::Eager(small)),
        ("LARGE", FunctionEntry::Eager(large)),
        ("RANK", FunctionEntry::Eager(rank)),
    ]
}

fn sum(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    EvalValue::number(flatten_numbers(args).into_iter().sum())
}

fn average(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let nums = flatten_numbers(args);
    if nums.is_empty() {
        // Open question frozen in DESIGN.md: AVERAGE() of no numerics -> #DIV/0!.
        return EvalValue::error(ErrorCode::Div);
    }
    EvalValue::number(nums.iter().sum::<f64>() / nums.len() as f64)
}

fn min(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let nums = flatten_numbers(args);
    match nums.iter().copied().fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |a| a.min(n)))) {
        Some(n) => EvalValue::number(n),
        None => EvalValue::number(0.0),
    }
}

fn max(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let nums = flatten_numbers(args);
    match nums.iter().copied().fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |a| a.max(n)))) {
        Some(n) => EvalValue::number(n),
        None => EvalValue::number(0.0),
    }
}

fn abs(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match single_number(args, 0) {
        Ok(n) => EvalValue::number(n.abs()),
        Err(e) => EvalValue::error(e),
    }
}

fn round(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    with_number_and_digits(args, round_half_away_from_zero)
}

fn roundup(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    with_number_and_digits(args, |n, d| {
        let factor = 10f64.powi(d);
        if n >= 0.0 { (n * factor).ceil() / factor } else { (n * factor).floor() / factor }
    })
}

fn rounddown(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    with_number_and_digits(args, |n, d| {
        let factor = 10f64.powi(d);
        if n >= 0.0 { (n * factor).floor() / factor } else { (n * factor).ceil() / factor }
    })
}

fn trunc(args: &[EvalValue], ctx: &dyn EvalContext, scope: &Scope) -> EvalValue {
    rounddown(args, ctx, scope)
}

fn with_number_and_digits(args: &[EvalValue], f: impl Fn(f64, i32) -> f64) -> EvalValue {
    let n = match single_number(args, 0) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let digits = match optional_number(args, 1, 0.0) {
        Ok(d) => d as i32,
        Err(e) => return EvalValue::error(e),
    };
    EvalValue::number(f(n, digits))
}

fn int_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match single_number(args, 0) {
        Ok(n) => EvalValue::number(n.floor()),
        Err(e) => EvalValue::error(e),
    }
}

fn modulo(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let n = match single_number(args, 0) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let d = match single_number(args, 1) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    if d == 0.0 {
        return EvalValue::error(ErrorCode::Div);
    }
    EvalValue::number(n - d * (n / d).floor())
}

fn power(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let base = match single_number(args, 0) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let exp = match single_number(args, 1) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let result = base.powf(exp);
    if result.is_nan() { EvalValue::error(ErrorCode::Num) } else { EvalValue::number(result) }
}

fn sqrt(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    unary_math_domain(args, |n| n >= 0.0, f64::sqrt)
}

fn sign(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match single_number(args, 0) {
        Ok(n) if n > 0.0 => EvalValue::number(1.0),
        Ok(n) if n < 0.0 => EvalValue::number(-1.0),
        Ok(_) => EvalValue::number(0.0),
        Err(e) => EvalValue::error(e),
    }
}

fn ln(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    unary_math_domain(args, |n| n > 0.0, f64::ln)
}

fn log(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let n = match single_number(args, 0) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let base = match optional_number(args, 1, 10.0) {
        Ok(b) => b,
        Err(e) => return EvalValue::error(e),
    };
    if n <= 0.0 || base <= 0.0 || base == 1.0 {
        return EvalValue::error(ErrorCode::Num);
    }
    EvalValue::number(n.log(base))
}

fn unary_math(args: &[EvalValue], f: impl Fn(f64) -> f64) -> EvalValue {
    match single_number(args, 0) {
        Ok(n) => EvalValue::number(f(n)),
        Err(e) => EvalValue::error(e),
    }
}

fn unary_math_domain(args: &[EvalValue], domain: impl Fn(f64) -> bool, f: impl Fn(f64) -> f64) -> EvalValue {
    match single_number(args, 0) {
        Ok(n) if domain(n) => EvalValue::number(f(n)),
        Ok(_) => EvalValue::error(ErrorCode::Num),
        Err(e) => EvalValue::error(e),
    }
}

fn small(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    nth_order_statistic(args, true)
}

fn large(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    nth_order_statistic(args, false)
}

fn nth_order_statistic(args: &[EvalValue], ascending: bool) -> EvalValue {
    let mut nums = match args.first() {
        Some(v) => flatten_numbers(std::slice::from_ref(v)),
        None => return EvalValue::error(ErrorCode::Value),
    };
    let k = match single_number(args, 1) {
        Ok(n) => n as usize,
        Err(e) => return EvalValue::error(e),
    };
    if k == 0 || k > nums.len() {
        return EvalValue::error(ErrorCode::Num);
    }
    nums.sort_by(|a, b| a.partial_cmp(b).unwrap());
    if !ascending {
        nums.reverse();
    }
    EvalValue::number(nums[k - 1])
}

fn rank(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let target = match single_number(args, 0) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let nums = match args.get(1) {
        Some(v) => flatten_numbers(std::slice::from_ref(v)),
        None => return EvalValue::error(ErrorCode::Value),
    };
    let ascending = matches!(optional_number(args, 2, 0.0), Ok(n) if n != 0.0);
    if !nums.iter().any(|n| *n == target) {
        return EvalValue::error(ErrorCode::Na);
    }
    let rank = if ascending {
        1 + nums.iter().filter(|&&n| n < target).count()
    } else {
        1 + nums.iter().filter(|&&n| n > target).count()
    };
    EvalValue::number(rank as f64)
}
