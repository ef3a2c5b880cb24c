//! Reference and lookup functions (`spec.md` §4.5). `ROW`/`COLUMN`/`OFFSET`
//! need the raw reference syntax rather than an evaluated value, so they're
//! lazy; the table-lookup family (`VLOOKUP`, `INDEX`, ...) works fine on
//! already-evaluated arrays.

use gridcalc_common::{Address, ErrorCode, FormulaScalar, Range, MAX_COLS, MAX_ROWS};
use gridcalc_parse::parser::Ast;

use crate::builtins::support::{flatten_all, single_number, single_text};
use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("ROW", FunctionEntry::Lazy(row_fn)),
        ("COLUMN", FunctionEntry::Lazy(column_fn)),
        ("OFFSET", FunctionEntry::Lazy(offset_fn)),
        ("INDIRECT", FunctionEntry::Eager(indirect_fn)),
        ("INDEX", FunctionEntry::Eager(index_fn)),
        ("MATCH", FunctionEntry::Eager(match_fn)),
        ("LOOKUP", FunctionEntry::Eager(lookup_fn)),
        ("VLOOKUP", FunctionEntry::Eager(vlookup_fn)),
        ("HLOOKUP", FunctionEntry::Eager(hlookup_fn)),
        ("XLOOKUP", FunctionEntry::Eager(xlookup_fn)),
        ("XMATCH", FunctionEntry::Eager(xmatch_fn)),
    ]
}

fn reference_range(ast: &Ast) -> Option<(Option<String>, Range)> {
    match ast {
        Ast::Reference { sheet, address } => Some((sheet.clone(), Range::from_cell(*address, None))),
        Ast::RangeRef(range) => Some((range.sheet_name.clone(), Range::new(range.start, range.end, None))),
        _ => None,
    }
}

fn row_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    match args.first() {
        None => EvalValue::number(scope.origin.row as f64),
        Some(ast) => match reference_range(ast) {
            Some((_, range)) => EvalValue::number(range.min_row() as f64),
            None => {
                let _ = ctx;
                EvalValue::error(ErrorCode::Value)
            }
        },
    }
}

fn column_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    match args.first() {
        None => EvalValue::number(scope.origin.col as f64),
        Some(ast) => match reference_range(ast) {
            Some((_, range)) => EvalValue::number(range.min_col() as f64),
            None => {
                let _ = ctx;
                EvalValue::error(ErrorCode::Value)
            }
        },
    }
}

fn offset_fn(ctx: &dyn EvalContext, scope: &Scope, args: &[Ast]) -> EvalValue {
    let Some(base_ast) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let Some((sheet, base)) = reference_range(base_ast) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let sheet_index = match ctx.resolve_sheet(scope, &sheet) {
        Ok(idx) => idx,
        Err(e) => return EvalValue::error(e),
    };
    let eval_int = |ast: &Ast| -> Result<i64, ErrorCode> {
        ctx.eval(scope, ast).coerce_number().map(|n| n as i64)
    };
    let rows = match args.get(1) {
        Some(a) => match eval_int(a) {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        },
        None => return EvalValue::error(ErrorCode::Value),
    };
    let cols = match args.get(2) {
        Some(a) => match eval_int(a) {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        },
        None => return EvalValue::error(ErrorCode::Value),
    };
    let height = match args.get(3) {
        Some(a) => match eval_int(a) {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        },
        None => (base.max_row() - base.min_row() + 1) as i64,
    };
    let width = match args.get(4) {
        Some(a) => match eval_int(a) {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        },
        None => (base.max_col() - base.min_col() + 1) as i64,
    };
    if height <= 0 || width <= 0 {
        return EvalValue::error(ErrorCode::Value);
    }
    let new_min_row = base.min_row() as i64 + rows;
    let new_min_col = base.min_col() as i64 + cols;
    let new_max_row = new_min_row + height - 1;
    let new_max_col = new_min_col + width - 1;
    if new_min_row < 1 || new_min_col < 1 || new_max_row > MAX_ROWS as i64 || new_max_col > MAX_COLS as i64 {
        return EvalValue::error(ErrorCode::Ref);
    }
    if height == 1 && width == 1 {
        let addr = Address::new(new_min_col as u32, new_min_row as u32, false, false);
        return EvalValue::Scalar(ctx.evaluate_cell(sheet_index, addr));
    }
    let mut rows_out = Vec::with_capacity(height as usize);
    for r in new_min_row..=new_max_row {
        let mut cols_out = Vec::with_capacity(width as usize);
        for c in new_min_col..=new_max_col {
            cols_out.push(ctx.evaluate_cell(sheet_index, Address::new(c as u32, r as u32, false, false)));
        }
        rows_out.push(cols_out);
    }
    EvalValue::Array(rows_out)
}

/// `INDIRECT` is A1-only -- no `R1C1` support (open question frozen in
/// `DESIGN.md`).
fn indirect_fn(args: &[EvalValue], ctx: &dyn EvalContext, scope: &Scope) -> EvalValue {
    let text = match single_text(args, 0) {
        Ok(t) => t,
        Err(e) => return EvalValue::error(e),
    };
    let (sheet_part, rest) = gridcalc_common::split_sheet_qualifier(&text);
    let sheet_index = match ctx.resolve_sheet(scope, &sheet_part) {
        Ok(idx) => idx,
        Err(e) => return EvalValue::error(e),
    };
    match Address::parse(rest) {
        Ok(addr) => EvalValue::Scalar(ctx.evaluate_cell(sheet_index, addr)),
        Err(_) => EvalValue::error(ErrorCode::Ref),
    }
}

fn as_grid(value: &EvalValue) -> Vec<Vec<FormulaScalar>> {
    match value {
        EvalValue::Scalar(s) => vec![vec![s.clone()]],
        EvalValue::Array(rows) => rows.clone(),
    }
}

fn index_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(array) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let grid = as_grid(array);
    let row_num = match args.get(1) {
        Some(v) => match v.coerce_number() {
            Ok(n) => n as i64,
            Err(e) => return EvalValue::error(e),
        },
        None => 0,
    };
    let col_num = match args.get(2) {
        Some(v) => match v.coerce_number() {
            Ok(n) => n as i64,
            Err(e) => return EvalValue::error(e),
        },
        None => 0,
    };
    let height = grid.len() as i64;
    let width = grid.first().map_or(0, |r| r.len()) as i64;

    if row_num == 0 && col_num == 0 {
        if height == 1 && width == 1 {
            return EvalValue::Scalar(grid[0][0].clone());
        }
        return EvalValue::Array(grid);
    }
    if row_num == 0 {
        if col_num < 1 || col_num > width {
            return EvalValue::error(ErrorCode::Ref);
        }
        let column: Vec<Vec<FormulaScalar>> = grid.iter().map(|r| vec![r[(col_num - 1) as usize].clone()]).collect();
        return if column.len() == 1 { EvalValue::Scalar(column[0][0].clone()) } else { EvalValue::Array(column) };
    }
    if col_num == 0 {
        if row_num < 1 || row_num > height {
            return EvalValue::error(ErrorCode::Ref);
        }
        let row = grid[(row_num - 1) as usize].clone();
        return if row.len() == 1 { EvalValue::Scalar(row[0].clone()) } else { EvalValue::Array(vec![row]) };
    }
    if row_num < 1 || row_num > height || col_num < 1 || col_num > width {
        return EvalValue::error(ErrorCode::Ref);
    }
    EvalValue::Scalar(grid[(row_num - 1) as usize][(col_num - 1) as usize].clone())
}

fn scalar_lt(a: &FormulaScalar, b: &FormulaScalar) -> bool {
    match (a, b) {
        (FormulaScalar::Number(x), FormulaScalar::Number(y)) => x < y,
        (FormulaScalar::Text(x), FormulaScalar::Text(y)) => x.to_ascii_lowercase() < y.to_ascii_lowercase(),
        (FormulaScalar::Boolean(x), FormulaScalar::Boolean(y)) => !x && *y,
        _ => false,
    }
}

fn scalar_matches(a: &FormulaScalar, b: &FormulaScalar) -> bool {
    match (a, b) {
        (FormulaScalar::Number(x), FormulaScalar::Number(y)) => x == y,
        (FormulaScalar::Text(x), FormulaScalar::Text(y)) => x.eq_ignore_ascii_case(y),
        (FormulaScalar::Boolean(x), FormulaScalar::Boolean(y)) => x == y,
        _ => false,
    }
}

/// `MATCH(lookup_value, array, [match_type])`: `match_type` 0 is exact, 1 is
/// largest value <= lookup (array assumed ascending), -1 is smallest value
/// >= lookup (array assumed descending).
fn match_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(target) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let target = target.as_scalar();
    let Some(array) = args.get(1) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let items = array.flatten();
    let match_type = match args.get(2) {
        Some(v) => v.coerce_number().map(|n| n as i64).unwrap_or(1),
        None => 1,
    };
    match match_type {
        0 => match items.iter().position(|v| scalar_matches(v, &target)) {
            Some(i) => EvalValue::number((i + 1) as f64),
            None => EvalValue::error(ErrorCode::Na),
        },
        1 => {
            let mut best: Option<(usize, &FormulaScalar)> = None;
            for (i, v) in items.iter().enumerate() {
                if scalar_lt(v, &target) || scalar_matches(v, &target) {
                    best = Some((i, v));
                }
            }
            match best {
                Some((i, _)) => EvalValue::number((i + 1) as f64),
                None => EvalValue::error(ErrorCode::Na),
            }
        }
        -1 => {
            let mut best: Option<usize> = None;
            for (i, v) in items.iter().enumerate() {
                if scalar_matches(v, &target) || scalar_lt(&target, v) {
                    best = Some(i);
                    break;
                }
            }
            match best {
                Some(i) => EvalValue::number((i + 1) as f64),
                None => EvalValue::error(ErrorCode::Na),
            }
        }
        _ => EvalValue::error(ErrorCode::Value),
    }
}

fn lookup_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(target) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let target = target.as_scalar();
    let Some(vector) = args.get(1) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let lookup_items = vector.flatten();
    let result_items = match args.get(2) {
        Some(v) => v.flatten(),
        None => lookup_items.clone(),
    };
    let mut best: Option<usize> = None;
    for (i, v) in lookup_items.iter().enumerate() {
        if scalar_lt(v, &target) || scalar_matches(v, &target) {
            best = Some(i);
        }
    }
    match best.and_then(|i| result_items.get(i)) {
        Some(v) => EvalValue::Scalar(v.clone()),
        None => EvalValue::error(ErrorCode::Na),
    }
}

fn vlookup_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(target) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let target = target.as_scalar();
    let Some(table) = args.get(1) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let grid = as_grid(table);
    let col_index = match single_number(args, 2) {
        Ok(n) => n as i64,
        Err(e) => return EvalValue::error(e),
    };
    let exact = matches!(args.get(3), Some(v) if !matches!(v.as_scalar().is_truthy(), Ok(true)));
    if col_index < 1 || grid.first().is_none_or(|r| col_index as usize > r.len()) {
        return EvalValue::error(ErrorCode::Ref);
    }
    let row = if exact {
        grid.iter().find(|r| r.first().is_some_and(|k| scalar_matches(k, &target)))
    } else {
        grid.iter()
            .filter(|r| r.first().is_some_and(|k| scalar_lt(k, &target) || scalar_matches(k, &target)))
            .last()
    };
    match row.map(|r| r[(col_index - 1) as usize].clone()) {
        Some(v) => EvalValue::Scalar(v),
        None => EvalValue::error(ErrorCode::Na),
    }
}

fn hlookup_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(target) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let target = target.as_scalar();
    let Some(table) = args.get(1) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let grid = as_grid(table);
    let row_index = match single_number(args, 2) {
        Ok(n) => n as i64,
        Err(e) => return EvalValue::error(e),
    };
    let exact = matches!(args.get(3), Some(v) if !matches!(v.as_scalar().is_truthy(), Ok(true)));
    let Some(header) = grid.first() else {
        return EvalValue::error(ErrorCode::Ref);
    };
    if row_index < 1 || row_index as usize > grid.len() {
        return EvalValue::error(ErrorCode::Ref);
    }
    let col = if exact {
        header.iter().position(|k| scalar_matches(k, &target))
    } else {
        let mut best = None;
        for (i, k) in header.iter().enumerate() {
            if scalar_lt(k, &target) || scalar_matches(k, &target) {
                best = Some(i);
            }
        }
        best
    };
    match col.map(|c| grid[(row_index - 1) as usize][c].clone()) {
        Some(v) => EvalValue::Scalar(v),
        None => EvalValue::error(ErrorCode::Na),
    }
}

fn xlookup_fn(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(target) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let target = target.as_scalar();
    let Some(lookup_array) = args.get(1) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let Some(return_array) = args.get(2) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let lookup_items = lookup_array.flatten();
    let return_items = flatten_all(std::slice::from_ref(return_array));
    match lookup_items.iter().position(|v| scalar_matches(v, &target)) {
        Some(i) => match return_items.get(i) {
            Some(v) => EvalValue::Scalar(v.clone()),
            None => EvalValue::error(ErrorCode::Na),
        },
        None => match args.get(3) {
            Some(fallback) => fallback.clone(),
            None => EvalValue::error(ErrorCode::Na),
        },
    }
}

/// Only exact-match, forward-search mode is implemented; an explicit
/// `match_mode`/`search_mode` other than the exact-match/first-to-last
/// defaults (`0` and `1`) is rejected rather than silently honored.
fn xmatch_fn(args: &[EvalValue], ctx: &dyn EvalContext, scope: &Scope) -> EvalValue {
    if let Some(mode) = args.get(2) {
        match mode.coerce_number() {
            Ok(n) if n == 0.0 => {}
            Ok(_) => return EvalValue::error(ErrorCode::Value),
            Err(e) => return EvalValue::error(e),
        }
    }
    if let Some(mode) = args.get(3) {
        match mode.coerce_number() {
            Ok(n) if n == 1.0 => {}
            Ok(_) => return EvalValue::error(ErrorCode::Value),
            Err(e) => return EvalValue::error(e),
        }
    }
    match_fn(&[args.first().cloned().unwrap_or(EvalValue::error(ErrorCode::Value)), args.get(1).cloned().unwrap_or(EvalValue::error(ErrorCode::Value)), EvalValue::number(0.0)], ctx, scope)
}
