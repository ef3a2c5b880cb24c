//! Conditional aggregation functions (`spec.md` §4.5). Criteria strings
//! follow Excel's mini-grammar: a bare value matches by equality, and a
//! leading `=`, `<>`, `<`, `<=`, `>`, `>=` switches to a comparison: the
//! criteria text `"*"`/`"?"` wildcards are supported for text matches.

use gridcalc_common::FormulaScalar;

use crate::builtins::support::flatten_all;
use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("COUNT", FunctionEntry::Eager(count)),
        ("COUNTA", FunctionEntry::Eager(counta)),
        ("COUNTIF", FunctionEntry::Eager(countif)),
        ("COUNTIFS", FunctionEntry::Eager(countifs)),
        ("SUMIF", FunctionEntry::Eager(sumif)),
        ("SUMIFS", FunctionEntry::Eager(sumifs)),
        ("AVERAGEIF", FunctionEntry::Eager(averageif)),
        ("AVERAGEIFS", FunctionEntry::Eager(averageifs)),
    ]
}

fn count(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let n = flatten_all(args).iter().filter(|s| matches!(s, FormulaScalar::Number(_))).count();
    EvalValue::number(n as f64)
}

fn counta(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let n = flatten_all(args).iter().filter(|s| !matches!(s, FormulaScalar::Null)).count();
    EvalValue::number(n as f64)
}

enum Criterion {
    Eq(FormulaScalar),
    Ne(FormulaScalar),
    Lt(f64),
    Le(f64),
    Gt(f64),
    Ge(f64),
    Wildcard(String),
}

fn parse_criterion(value: &EvalValue) -> Criterion {
    let scalar = value.as_scalar();
    let text = match &scalar {
        FormulaScalar::Text(s) => s.clone(),
        _ => return Criterion::Eq(scalar),
    };
    for prefix in ["<>", "<=", ">=", "<", ">"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            let rest = rest.trim();
            if let Ok(n) = rest.parse::<f64>() {
                return match prefix {
                    "<>" => Criterion::Ne(FormulaScalar::Number(n)),
                    "<=" => Criterion::Le(n),
                    ">=" => Criterion::Ge(n),
                    "<" => Criterion::Lt(n),
                    ">" => Criterion::Gt(n),
                    _ => unreachable!(),
                };
            }
            if prefix == "<>" {
                return Criterion::Ne(FormulaScalar::Text(rest.to_string()));
            }
        }
    }
    if let Some(rest) = text.strip_prefix('=') {
        return Criterion::Eq(FormulaScalar::Text(rest.to_string()));
    }
    if text.contains('*') || text.contains('?') {
        return Criterion::Wildcard(text);
    }
    if let Ok(n) = text.trim().parse::<f64>() {
        return Criterion::Eq(FormulaScalar::Number(n));
    }
    Criterion::Eq(FormulaScalar::Text(text))
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    fn helper(p: &[char], t: &[char]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some('*') => helper(&p[1..], t) || (!t.is_empty() && helper(p, &t[1..])),
            Some('?') => !t.is_empty() && helper(&p[1..], &t[1..]),
            Some(c) => t.first().is_some_and(|tc| tc.eq_ignore_ascii_case(c)) && helper(&p[1..], &t[1..]),
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    helper(&p, &t)
}

fn criterion_matches(criterion: &Criterion, cell: &FormulaScalar) -> bool {
    match criterion {
        Criterion::Eq(FormulaScalar::Number(n)) => matches!(cell, FormulaScalar::Number(c) if c == n),
        Criterion::Eq(FormulaScalar::Text(s)) => match cell {
            FormulaScalar::Text(c) => c.eq_ignore_ascii_case(s),
            _ => false,
        },
        Criterion::Eq(other) => cell == other,
        Criterion::Ne(FormulaScalar::Number(n)) => !matches!(cell, FormulaScalar::Number(c) if c == n),
        Criterion::Ne(FormulaScalar::Text(s)) => match cell {
            FormulaScalar::Text(c) => !c.eq_ignore_ascii_case(s),
            _ => true,
        },
        Criterion::Ne(other) => cell != other,
        Criterion::Lt(n) => matches!(cell, FormulaScalar::Number(c) if c < n),
        Criterion::Le(n) => matches!(cell, FormulaScalar::Number(c) if c <= n),
        Criterion::Gt(n) => matches!(cell, FormulaScalar::Number(c) if c > n),
        Criterion::Ge(n) => matches!(cell, FormulaScalar::Number(c) if c >= n),
        Criterion::Wildcard(pattern) => match cell {
            FormulaScalar::Text(c) => wildcard_match(pattern, c),
            _ => false,
        },
    }
}

fn range_grid(value: &EvalValue) -> Vec<FormulaScalar> {
    value.flatten()
}

fn countif(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(range) = args.first() else {
        return EvalValue::number(0.0);
    };
    let Some(criteria) = args.get(1) else {
        return EvalValue::number(0.0);
    };
    let criterion = parse_criterion(criteria);
    let n = range_grid(range).iter().filter(|c| criterion_matches(&criterion, c)).count();
    EvalValue::number(n as f64)
}

fn countifs(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    if args.is_empty() || args.len() % 2 != 0 {
        return EvalValue::number(0.0);
    }
    let pairs: Vec<(Vec<FormulaScalar>, Criterion)> = args
        .chunks_exact(2)
        .map(|pair| (range_grid(&pair[0]), parse_criterion(&pair[1])))
        .collect();
    let len = pairs.first().map_or(0, |(r, _)| r.len());
    let mut count = 0;
    for i in 0..len {
        if pairs.iter().all(|(range, crit)| range.get(i).is_some_and(|c| criterion_matches(crit, c))) {
            count += 1;
        }
    }
    EvalValue::number(count as f64)
}

fn sumif(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(range) = args.first() else {
        return EvalValue::number(0.0);
    };
    let Some(criteria) = args.get(1) else {
        return EvalValue::number(0.0);
    };
    let criterion = parse_criterion(criteria);
    let test = range_grid(range);
    let sum_range = match args.get(2) {
        Some(v) => range_grid(v),
        None => test.clone(),
    };
    let mut total = 0.0;
    for (cell, value) in test.iter().zip(sum_range.iter()) {
        if criterion_matches(&criterion, cell) {
            if let FormulaScalar::Number(n) = value {
                total += n;
            }
        }
    }
    EvalValue::number(total)
}

fn sumifs(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(sum_range) = args.first() else {
        return EvalValue::number(0.0);
    };
    let sum_values = range_grid(sum_range);
    let Some(pairs) = parse_criteria_pairs(&args[1..]) else {
        return EvalValue::number(0.0);
    };
    let mut total = 0.0;
    for i in 0..sum_values.len() {
        if pairs.iter().all(|(range, crit)| range.get(i).is_some_and(|c| criterion_matches(crit, c))) {
            if let FormulaScalar::Number(n) = sum_values[i] {
                total += n;
            }
        }
    }
    EvalValue::number(total)
}

fn averageif(args: &[EvalValue], ctx: &dyn EvalContext, scope: &Scope) -> EvalValue {
    let Some(range) = args.first() else {
        return EvalValue::number(0.0);
    };
    let Some(criteria) = args.get(1) else {
        return EvalValue::number(0.0);
    };
    let criterion = parse_criterion(criteria);
    let test = range_grid(range);
    let avg_range = match args.get(2) {
        Some(v) => range_grid(v),
        None => test.clone(),
    };
    let _ = (ctx, scope);
    let mut total = 0.0;
    let mut count = 0usize;
    for (cell, value) in test.iter().zip(avg_range.iter()) {
        if criterion_matches(&criterion, cell) {
            if let FormulaScalar::Number(n) = value {
                total += n;
                count += 1;
            }
        }
    }
    if count == 0 {
        EvalValue::error(gridcalc_common::ErrorCode::Div)
    } else {
        EvalValue::number(total / count as f64)
    }
}

fn averageifs(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(avg_range) = args.first() else {
        return EvalValue::number(0.0);
    };
    let avg_values = range_grid(avg_range);
    let Some(pairs) = parse_criteria_pairs(&args[1..]) else {
        return EvalValue::number(0.0);
    };
    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..avg_values.len() {
        if pairs.iter().all(|(range, crit)| range.get(i).is_some_and(|c| criterion_matches(crit, c))) {
            if let FormulaScalar::Number(n) = avg_values[i] {
                total += n;
                count += 1;
            }
        }
    }
    if count == 0 {
        EvalValue::error(gridcalc_common::ErrorCode::Div)
    } else {
        EvalValue::number(total / count as f64)
    }
}

fn parse_criteria_pairs(args: &[EvalValue]) -> Option<Vec<(Vec<FormulaScalar>, Criterion)>> {
    if args.is_empty() || args.len() % 2 != 0 {
        return None;
    }
    Some(args.chunks_exact(2).map(|p| (range_grid(&p[0]), parse_criterion(&p[1]))).collect())
}
