//! Text functions (`spec.md` §4.5). `TEXT` defers the actual format-code
//! grammar to `gridcalc-format` (`spec.md` §4.7).

use gridcalc_common::ErrorCode;

use crate::builtins::support::{flatten_all, single_number, single_text};
use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("CONCATENATE", FunctionEntry::Eager(concatenate)),
        ("CONCAT", FunctionEntry::Eager(concat)),
        ("LEFT", FunctionEntry::Eager(left)),
        ("RIGHT", FunctionEntry::Eager(right)),
        ("MID", FunctionEntry::Eager(mid)),
        ("LEN", FunctionEntry::Eager(len)),
        ("UPPER", FunctionEntry::Eager(upper)),
        ("LOWER", FunctionEntry::Eager(lower)),
        ("TRIM", FunctionEntry::Eager(trim)),
        ("VALUE", FunctionEntry::Eager(value_fn)),
        ("TEXT", FunctionEntry::Eager(text_fn)),
        ("SUBSTITUTE", FunctionEntry::Eager(substitute)),
    ]
}

fn concatenate(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let mut out = String::new();
    for a in args {
        match a.coerce_text() {
            Ok(t) => out.push_str(&t),
            Err(e) => return EvalValue::error(e),
        }
    }
    EvalValue::text(out)
}

fn concat(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let mut out = String::new();
    for scalar in flatten_all(args) {
        match scalar.coerce_text() {
            Ok(t) => out.push_str(&t),
            Err(e) => return EvalValue::error(e),
        }
    }
    EvalValue::text(out)
}

fn left(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let s = match single_text(args, 0) {
        Ok(s) => s,
        Err(e) => return EvalValue::error(e),
    };
    let n = match args.get(1) {
        Some(v) => match v.coerce_number() {
            Ok(n) => n as usize,
            Err(e) => return EvalValue::error(e),
        },
        None => 1,
    };
    EvalValue::text(s.chars().take(n).collect::<String>())
}

fn right(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let s = match single_text(args, 0) {
        Ok(s) => s,
        Err(e) => return EvalValue::error(e),
    };
    let n = match args.get(1) {
        Some(v) => match v.coerce_number() {
            Ok(n) => n as usize,
            Err(e) => return EvalValue::error(e),
        },
        None => 1,
    };
    let chars: Vec<char> = s.chars().collect();
    let start = chars.len().saturating_sub(n);
    EvalValue::text(chars[start..].iter().collect::<String>())
}

fn mid(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let s = match single_text(args, 0) {
        Ok(s) => s,
        Err(e) => return EvalValue::error(e),
    };
    let start = match single_number(args, 1) {
        Ok(n) if n >= 1.0 => n as usize,
        Ok(_) => return EvalValue::error(ErrorCode::Value),
        Err(e) => return EvalValue::error(e),
    };
    let len = match single_number(args, 2) {
        Ok(n) => n.max(0.0) as usize,
        Err(e) => return EvalValue::error(e),
    };
    let chars: Vec<char> = s.chars().collect();
    if start > chars.len() {
        return EvalValue::text(String::new());
    }
    let end = (start - 1 + len).min(chars.len());
    EvalValue::text(chars[start - 1..end].iter().collect::<String>())
}

fn len(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match single_text(args, 0) {
        Ok(s) => EvalValue::number(s.chars().count() as f64),
        Err(e) => EvalValue::error(e),
    }
}

fn upper(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match single_text(args, 0) {
        Ok(s) => EvalValue::text(s.to_uppercase()),
        Err(e) => EvalValue::error(e),
    }
}

fn lower(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match single_text(args, 0) {
        Ok(s) => EvalValue::text(s.to_lowercase()),
        Err(e) => EvalValue::error(e),
    }
}

fn trim(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match single_text(args, 0) {
        Ok(s) => {
            let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
            EvalValue::text(collapsed)
        }
        Err(e) => EvalValue::error(e),
    }
}

fn value_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    match single_text(args, 0) {
        Ok(s) => match s.trim().parse::<f64>() {
            Ok(n) => EvalValue::number(n),
            Err(_) => EvalValue::error(ErrorCode::Value),
        },
        Err(e) => EvalValue::error(e),
    }
}

fn text_fn(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let n = match single_number(args, 0) {
        Ok(n) => n,
        Err(e) => return EvalValue::error(e),
    };
    let format_code = match single_text(args, 1) {
        Ok(s) => s,
        Err(e) => return EvalValue::error(e),
    };
    let rendered = gridcalc_format::format_number(n, &format_code, ctx.workbook().date_system);
    EvalValue::text(rendered)
}

fn substitute(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let s = match single_text(args, 0) {
        Ok(s) => s,
        Err(e) => return EvalValue::error(e),
    };
    let old = match single_text(args, 1) {
        Ok(s) => s,
        Err(e) => return EvalValue::error(e),
    };
    let new = match single_text(args, 2) {
        Ok(s) => s,
        Err(e) => return EvalValue::error(e),
    };
    if old.is_empty() {
        return EvalValue::text(s);
    }
    match args.get(3) {
        None => EvalValue::text(s.replace(&old, &new)),
        Some(v) => {
            let instance = match v.coerce_number() {
                Ok(n) => n as usize,
                Err(e) => return EvalValue::error(e),
            };
            EvalValue::text(replace_nth(&s, &old, &new, instance))
        }
    }
}

fn replace_nth(s: &str, old: &str, new: &str, n: usize) -> String {
    if n == 0 {
        return s.to_string();
    }
    let mut count = 0;
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    loop {
        match rest.find(old) {
            Some(pos) => {
                count += 1;
                out.push_str(&rest[..pos]);
                if count == n {
                    out.push_str(new);
                } else {
                    out.push_str(old);
                }
                rest = &rest[pos + old.len()..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}
