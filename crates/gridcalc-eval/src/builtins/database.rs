//! Database functions (`spec.md` §4.5 supplement): `DSUM` and siblings
//! apply a multi-column criteria table to a headered range, the same
//! shape Excel's `D*` family shares with `AutoFilter`.

use gridcalc_common::{ErrorCode, FormulaScalar};

use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("DSUM", FunctionEntry::Eager(|a, c, s| aggregate(a, c, s, Agg::Sum))),
        ("DCOUNT", FunctionEntry::Eager(|a, c, s| aggregate(a, c, s, Agg::Count))),
        ("DAVERAGE", FunctionEntry::Eager(|a, c, s| aggregate(a, c, s, Agg::Average))),
        ("DMAX", FunctionEntry::Eager(|a, c, s| aggregate(a, c, s, Agg::Max))),
        ("DMIN", FunctionEntry::Eager(|a, c, s| aggregate(a, c, s, Agg::Min))),
        ("DPRODUCT", FunctionEntry::Eager(|a, c, s| aggregate(a, c, s, Agg::Product))),
    ]
}

enum Agg {
    Sum,
    Count,
    Average,
    Max,
    Min,
    Product,
}

fn as_grid(value: &EvalValue) -> Vec<Vec<FormulaScalar>> {
    match value {
        EvalValue::Scalar(s) => vec![vec![s.clone()]],
        EvalValue::Array(rows) => rows.clone(),
    }
}

fn header_index(header: &[FormulaScalar], name: &FormulaScalar) -> Option<usize> {
    let target = name.coerce_text().ok()?;
    header.iter().position(|h| matches!(h, FormulaScalar::Text(t) if t.eq_ignore_ascii_case(&target)))
}

/// `DSUM(database, field, criteria)`: `criteria` is a 2-row-minimum table
/// whose header row names columns in `database`; a row of the database
/// matches when every non-blank criteria cell in at least one criteria row
/// is satisfied (rows are OR'd, columns within a row are AND'd).
fn aggregate(args: &[EvalValue], _ctx: &dyn EvalContext, _scope: &Scope, agg: Agg) -> EvalValue {
    let Some(database) = args.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let Some(field) = args.get(1) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let Some(criteria) = args.get(2) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let db = as_grid(database);
    let crit = as_grid(criteria);
    let Some(db_header) = db.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let field_scalar = field.as_scalar();
    let field_col = match &field_scalar {
        FormulaScalar::Number(n) => Some(*n as usize - 1),
        _ => header_index(db_header, &field_scalar),
    };
    let Some(field_col) = field_col else {
        return EvalValue::error(ErrorCode::Value);
    };
    let Some(crit_header) = crit.first() else {
        return EvalValue::error(ErrorCode::Value);
    };
    let crit_cols: Vec<Option<usize>> = crit_header.iter().map(|h| header_index(db_header, h)).collect();

    let mut values = Vec::new();
    for row in db.iter().skip(1) {
        let row_matches = crit.iter().skip(1).any(|crit_row| {
            crit_row.iter().enumerate().all(|(i, cell)| match cell {
                FormulaScalar::Null => true,
                _ => match crit_cols.get(i).copied().flatten() {
                    Some(col) => row.get(col).is_some_and(|db_cell| cell_matches(cell, db_cell)),
                    None => false,
                },
            })
        });
        if row_matches {
            if let Some(FormulaScalar::Number(n)) = row.get(field_col) {
                values.push(*n);
            }
        }
    }

    match agg {
        Agg::Sum => EvalValue::number(values.iter().sum()),
        Agg::Count => EvalValue::number(values.len() as f64),
        Agg::Average => {
            if values.is_empty() {
                EvalValue::error(ErrorCode::Div)
            } else {
                EvalValue::number(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Agg::Max => EvalValue::number(values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
        Agg::Min => EvalValue::number(values.iter().cloned().fold(f64::MAX, f64::min)),
        Agg::Product => EvalValue::number(values.iter().product()),
    }
}

fn cell_matches(criteria_cell: &FormulaScalar, db_cell: &FormulaScalar) -> bool {
    match (criteria_cell, db_cell) {
        (FormulaScalar::Text(pattern), _) => {
            if let Some(rest) = pattern.strip_prefix('>') {
                return matches!(db_cell, FormulaScalar::Number(n) if rest.trim().parse::<f64>().is_ok_and(|c| *n > c));
            }
            if let Some(rest) = pattern.strip_prefix('<') {
                return matches!(db_cell, FormulaScalar::Number(n) if rest.trim().parse::<f64>().is_ok_and(|c| *n < c));
            }
            match db_cell {
                FormulaScalar::Text(t) => t.eq_ignore_ascii_case(pattern),
                FormulaScalar::Number(n) => pattern.trim().parse::<f64>().is_ok_and(|c| *n == c),
                _ => false,
            }
        }
        (FormulaScalar::Number(c), FormulaScalar::Number(n)) => c == n,
        _ => criteria_cell == db_cell,
    }
}
