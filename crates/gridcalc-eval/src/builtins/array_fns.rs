//! Array-shape and matrix functions (`spec.md` §4.5 supplement, needed
//! alongside the array-literal support in `gridcalc-parse`'s AST).

use gridcalc_common::{ErrorCode, FormulaScalar};

use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("TRANSPOSE", FunctionEntry::Eager(transpose)),
        ("MDETERM", FunctionEntry::Eager(mdeterm)),
        ("MINVERSE", FunctionEntry::Eager(minverse)),
        ("MMULT", FunctionEntry::Eager(mmult)),
    ]
}

fn as_grid(value: &EvalValue) -> Vec<Vec<FormulaScalar>> {
    match value {
        EvalValue::Scalar(s) => vec![vec![s.clone()]],
        EvalValue::Array(rows) => rows.clone(),
    }
}

fn numeric_matrix(grid: &[Vec<FormulaScalar>]) -> Result<Vec<Vec<f64>>, ErrorCode> {
    grid.iter().map(|row| row.iter().map(|c| c.coerce_number()).collect()).collect()
}

fn transpose(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(grid) = args.first().map(as_grid) else {
        return EvalValue::error(ErrorCode::Value);
    };
    if grid.is_empty() {
        return EvalValue::Array(Vec::new());
    }
    let cols = grid[0].len();
    let mut out = vec![Vec::with_capacity(grid.len()); cols];
    for row in &grid {
        for (c, value) in row.iter().enumerate() {
            out[c].push(value.clone());
        }
    }
    EvalValue::Array(out)
}

/// Determinant by cofactor expansion. Fine for the small matrices a
/// spreadsheet formula realistically holds; not the algorithm you'd pick
/// for a large dense solve.
fn determinant(m: &[Vec<f64>]) -> Option<f64> {
    let n = m.len();
    if n == 0 || m.iter().any(|r| r.len() != n) {
        return None;
    }
    if n == 1 {
        return Some(m[0][0]);
    }
    if n == 2 {
        return Some(m[0][0] * m[1][1] - m[0][1] * m[1][0]);
    }
    let mut det = 0.0;
    for col in 0..n {
        let minor: Vec<Vec<f64>> = m[1..].iter().map(|row| {
            row.iter().enumerate().filter(|(c, _)| *c != col).map(|(_, v)| *v).collect()
        }).collect();
        let sign = if col % 2 == 0 { 1.0 } else { -1.0 };
        det += sign * m[0][col] * determinant(&minor)?;
    }
    Some(det)
}

fn mdeterm(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(grid) = args.first().map(as_grid) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let matrix = match numeric_matrix(&grid) {
        Ok(m) => m,
        Err(e) => return EvalValue::error(e),
    };
    match determinant(&matrix) {
        Some(d) => EvalValue::number(d),
        None => EvalValue::error(ErrorCode::Value),
    }
}

/// Gauss-Jordan elimination with partial pivoting.
fn inverse(m: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = m.len();
    if n == 0 || m.iter().any(|r| r.len() != n) {
        return None;
    }
    let mut aug: Vec<Vec<f64>> = m
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();
    for col in 0..n {
        let pivot_row = (col..n).max_by(|&a, &b| aug[a][col].abs().partial_cmp(&aug[b][col].abs()).unwrap())?;
        if aug[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        aug.swap(col, pivot_row);
        let pivot = aug[col][col];
        for v in aug[col].iter_mut() {
            *v /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor != 0.0 {
                for k in 0..2 * n {
                    aug[row][k] -= factor * aug[col][k];
                }
            }
        }
    }
    Some(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

fn minverse(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(grid) = args.first().map(as_grid) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let matrix = match numeric_matrix(&grid) {
        Ok(m) => m,
        Err(e) => return EvalValue::error(e),
    };
    match inverse(&matrix) {
        Some(inv) => EvalValue::Array(inv.into_iter().map(|row| row.into_iter().map(FormulaScalar::Number).collect()).collect()),
        None => EvalValue::error(ErrorCode::Num),
    }
}

fn mmult(args: &[EvalValue], _: &dyn EvalContext, _: &Scope) -> EvalValue {
    let Some(a) = args.first().map(as_grid) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let Some(b) = args.get(1).map(as_grid) else {
        return EvalValue::error(ErrorCode::Value);
    };
    let a = match numeric_matrix(&a) {
        Ok(m) => m,
        Err(e) => return EvalValue::error(e),
    };
    let b = match numeric_matrix(&b) {
        Ok(m) => m,
        Err(e) => return EvalValue::error(e),
    };
    let (a_rows, a_cols) = (a.len(), a.first().map_or(0, |r| r.len()));
    let (b_rows, b_cols) = (b.len(), b.first().map_or(0, |r| r.len()));
    if a_cols != b_rows || a_rows == 0 || b_cols == 0 {
        return EvalValue::error(ErrorCode::Value);
    }
    let mut out = vec![vec![0.0; b_cols]; a_rows];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..a_cols).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    EvalValue::Array(out.into_iter().map(|row| row.into_iter().map(FormulaScalar::Number).collect()).collect())
}
