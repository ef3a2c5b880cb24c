//! AST execution (`spec.md` §4.6): reference/range resolution, the AST and
//! scalar caches, in-progress-stack cycle detection, and error-as-value
//! propagation through the operators.

use std::cell::RefCell;
use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};

use gridcalc_common::{Address, ErrorCode, FormulaScalar};
use gridcalc_parse::parser::{self, ArithOp, Ast, CompareOp, Literal, StructuredItem};

use crate::registry::{self, EvalContext};
use crate::values::{EvalValue, first_error};
use crate::workbook::Workbook;

/// The sheet a bare (unqualified) reference resolves against, plus the
/// origin cell -- needed for `ROW()`/`COLUMN()` with no argument and for
/// `[#This Row]` structured references.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    pub sheet_index: usize,
    pub origin: Address,
}

type CellKey = (usize, u32, u32);

pub struct Evaluator<'wb> {
    workbook: &'wb Workbook,
    ast_cache: RefCell<FxHashMap<(usize, String), Option<Ast>>>,
    value_cache: RefCell<FxHashMap<CellKey, FormulaScalar>>,
    in_progress: RefCell<FxHashSet<CellKey>>,
}

impl<'wb> Evaluator<'wb> {
    pub fn new(workbook: &'wb Workbook) -> Evaluator<'wb> {
        Evaluator {
            workbook,
            ast_cache: RefCell::new(FxHashMap::default()),
            value_cache: RefCell::new(FxHashMap::default()),
            in_progress: RefCell::new(FxHashSet::default()),
        }
    }

    pub fn workbook(&self) -> &Workbook {
        self.workbook
    }

    /// `spec.md` §6 `evaluateCell`.
    pub fn evaluate_cell(&self, sheet_index: usize, address: Address) -> FormulaScalar {
        let key = (sheet_index, address.row, address.col);
        if let Some(cached) = self.value_cache.borrow().get(&key).cloned() {
            return cached;
        }
        if self.in_progress.borrow().contains(&key) {
            return FormulaScalar::Error(ErrorCode::Ref);
        }
        let result = self.compute_cell(sheet_index, address, key);
        self.value_cache.borrow_mut().insert(key, result.clone());
        result
    }

    fn compute_cell(&self, sheet_index: usize, address: Address, key: CellKey) -> FormulaScalar {
        let Some(sheet) = self.workbook.sheet(sheet_index) else {
            return FormulaScalar::Error(ErrorCode::Ref);
        };
        match sheet.get_cell(address.row, address.col) {
            None => FormulaScalar::Null,
            Some(cell) => match &cell.formula {
                None => FormulaScalar::from_cell_value(&cell.value),
                Some(formula) => {
                    if formula.expression.is_empty() {
                        // Unexpanded shared-formula dependent (`spec.md` §4.8).
                        return FormulaScalar::Error(ErrorCode::Name);
                    }
                    self.in_progress.borrow_mut().insert(key);
                    let scope = Scope { sheet_index, origin: address };
                    let value = self.evaluate_expression(&scope, &formula.expression).as_scalar();
                    self.in_progress.borrow_mut().remove(&key);
                    value
                }
            },
        }
    }

    /// `spec.md` §6 `evaluateFormula` -- a free expression anchored at `A1`.
    pub fn evaluate_formula(&self, sheet_index: usize, expression: &str) -> FormulaScalar {
        let origin = Address::new(1, 1, false, false);
        self.evaluate_formula_result(sheet_index, origin, expression).as_scalar()
    }

    /// `spec.md` §6 `evaluateFormulaResult` -- may return a 2D array.
    pub fn evaluate_formula_result(&self, sheet_index: usize, origin: Address, expression: &str) -> EvalValue {
        let scope = Scope { sheet_index, origin };
        self.evaluate_expression(&scope, expression)
    }

    fn evaluate_expression(&self, scope: &Scope, expression: &str) -> EvalValue {
        let normalized = expression.trim().strip_prefix('=').unwrap_or(expression.trim()).to_string();
        let cache_key = (scope.sheet_index, normalized.clone());
        let cached = self.ast_cache.borrow().get(&cache_key).cloned();
        let ast_opt = match cached {
            Some(entry) => entry,
            None => {
                let parsed = parser::parse(&normalized).ok();
                self.ast_cache.borrow_mut().insert(cache_key, parsed.clone());
                parsed
            }
        };
        match ast_opt {
            None => EvalValue::error(ErrorCode::Name),
            Some(ast) => self.eval_ast(scope, &ast),
        }
    }

    pub fn eval_ast(&self, scope: &Scope, ast: &Ast) -> EvalValue {
        match ast {
            Ast::Literal(lit) => eval_literal(lit),
            Ast::Reference { sheet, address } => self.resolve_reference(scope, sheet, *address),
            Ast::RangeRef(range) => self.resolve_range(scope, range),
            Ast::ThreeDRange { start_sheet, end_sheet, address } => {
                self.resolve_three_d_range(scope, start_sheet, end_sheet, *address)
            }
            Ast::Array(rows) => EvalValue::Array(
                rows.iter().map(|row| row.iter().map(eval_literal_scalar).collect()).collect(),
            ),
            Ast::Unary { negative, expr } => {
                let v = self.eval_ast(scope, expr);
                if let Some(e) = v.as_error() {
                    return EvalValue::error(e);
                }
                match v.coerce_number() {
                    Ok(n) => EvalValue::number(if *negative { -n } else { n }),
                    Err(e) => EvalValue::error(e),
                }
            }
            Ast::Percent(expr) => {
                let v = self.eval_ast(scope, expr);
                if let Some(e) = v.as_error() {
                    return EvalValue::error(e);
                }
                match v.coerce_number() {
                    Ok(n) => EvalValue::number(n / 100.0),
                    Err(e) => EvalValue::error(e),
                }
            }
            Ast::Binary { op, left, right } => self.eval_binary(scope, *op, left, right),
            Ast::Compare { op, left, right } => self.eval_compare(scope, *op, left, right),
            Ast::Concat { left, right } => self.eval_concat(scope, left, right),
            Ast::Function { name, args } => self.eval_function(scope, name, args),
            Ast::Name(name) => self.resolve_name(scope, name),
            Ast::StructuredRef { table, item } => self.resolve_structured_ref(scope, table, item),
        }
    }

    fn eval_binary(&self, scope: &Scope, op: ArithOp, left: &Ast, right: &Ast) -> EvalValue {
        let l = self.eval_ast(scope, left);
        if let Some(e) = l.as_error() {
            return EvalValue::error(e);
        }
        let r = self.eval_ast(scope, right);
        if let Some(e) = r.as_error() {
            return EvalValue::error(e);
        }
        let ln = match l.coerce_number() {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        };
        let rn = match r.coerce_number() {
            Ok(n) => n,
            Err(e) => return EvalValue::error(e),
        };
        match op {
            ArithOp::Add => EvalValue::number(ln + rn),
            ArithOp::Sub => EvalValue::number(ln - rn),
            ArithOp::Mul => EvalValue::number(ln * rn),
            ArithOp::Div => {
                if rn == 0.0 {
                    EvalValue::error(ErrorCode::Div)
                } else {
                    EvalValue::number(ln / rn)
                }
            }
            ArithOp::Pow => {
                let result = ln.powf(rn);
                if result.is_nan() { EvalValue::error(ErrorCode::Num) } else { EvalValue::number(result) }
            }
        }
    }

    fn eval_compare(&self, scope: &Scope, op: CompareOp, left: &Ast, right: &Ast) -> EvalValue {
        let l = self.eval_ast(scope, left);
        if let Some(e) = l.as_error() {
            return EvalValue::error(e);
        }
        let r = self.eval_ast(scope, right);
        if let Some(e) = r.as_error() {
            return EvalValue::error(e);
        }
        let (ls, rs) = (l.as_scalar(), r.as_scalar());
        match op {
            CompareOp::Eq => EvalValue::boolean(scalar_eq(&ls, &rs)),
            CompareOp::Ne => EvalValue::boolean(!scalar_eq(&ls, &rs)),
            _ => match scalar_cmp(&ls, &rs) {
                Ok(ord) => EvalValue::boolean(match op {
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Le => ord != Ordering::Greater,
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Ge => ord != Ordering::Less,
                    CompareOp::Eq | CompareOp::Ne => unreachable!(),
                }),
                Err(e) => EvalValue::error(e),
            },
        }
    }

    fn eval_concat(&self, scope: &Scope, left: &Ast, right: &Ast) -> EvalValue {
        let l = self.eval_ast(scope, left);
        if let Some(e) = l.as_error() {
            return EvalValue::error(e);
        }
        let r = self.eval_ast(scope, right);
        if let Some(e) = r.as_error() {
            return EvalValue::error(e);
        }
        let lt = match l.coerce_text() {
            Ok(t) => t,
            Err(e) => return EvalValue::error(e),
        };
        let rt = match r.coerce_text() {
            Ok(t) => t,
            Err(e) => return EvalValue::error(e),
        };
        EvalValue::text(format!("{lt}{rt}"))
    }

    fn eval_function(&self, scope: &Scope, name: &str, args: &[Ast]) -> EvalValue {
        let upper = name.to_ascii_uppercase();
        match registry::lookup(&upper) {
            Some(registry::FunctionEntry::Eager(f)) => {
                let values: Vec<EvalValue> = args.iter().map(|a| self.eval_ast(scope, a)).collect();
                if let Some(e) = first_error(&values) {
                    return EvalValue::error(e);
                }
                f(&values, self, scope)
            }
            Some(registry::FunctionEntry::Lazy(f)) => f(self, scope, args),
            None => EvalValue::error(ErrorCode::Name),
        }
    }

    pub fn resolve_sheet(&self, scope: &Scope, sheet: &Option<String>) -> Result<usize, ErrorCode> {
        match sheet {
            None => Ok(scope.sheet_index),
            Some(name) => self.workbook.resolve_sheet_index_by_name(name).ok_or(ErrorCode::Ref),
        }
    }

    fn resolve_reference(&self, scope: &Scope, sheet: &Option<String>, address: Address) -> EvalValue {
        match self.resolve_sheet(scope, sheet) {
            Ok(idx) => EvalValue::Scalar(self.evaluate_cell(idx, address)),
            Err(e) => EvalValue::error(e),
        }
    }

    fn resolve_range(&self, scope: &Scope, range: &gridcalc_common::Range) -> EvalValue {
        let idx = match self.resolve_sheet(scope, &range.sheet_name) {
            Ok(idx) => idx,
            Err(e) => return EvalValue::error(e),
        };
        let Some(sheet) = self.workbook.sheet(idx) else {
            return EvalValue::error(ErrorCode::Ref);
        };
        let (min_row, max_row, min_col, max_col) = range.clamped(sheet.max_row(), sheet.max_col());
        let mut rows = Vec::with_capacity((max_row - min_row + 1) as usize);
        for row in min_row..=max_row {
            let mut cols = Vec::with_capacity((max_col - min_col + 1) as usize);
            for col in min_col..=max_col {
                cols.push(self.evaluate_cell(idx, Address::new(col, row, false, false)));
            }
            rows.push(cols);
        }
        EvalValue::Array(rows)
    }

    fn resolve_three_d_range(
        &self,
        scope: &Scope,
        start_sheet: &str,
        end_sheet: &str,
        address: Address,
    ) -> EvalValue {
        let Some(start) = self.workbook.resolve_sheet_index_by_name(start_sheet) else {
            return EvalValue::error(ErrorCode::Ref);
        };
        let Some(end) = self.workbook.resolve_sheet_index_by_name(end_sheet) else {
            return EvalValue::error(ErrorCode::Ref);
        };
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let mut rows = Vec::with_capacity(hi - lo + 1);
        for idx in lo..=hi {
            rows.push(vec![self.evaluate_cell(idx, address)]);
        }
        let _ = scope;
        EvalValue::Array(rows)
    }

    fn resolve_name(&self, scope: &Scope, name: &str) -> EvalValue {
        match self.workbook.resolve_defined_name(name) {
            Some(expression) => {
                let expression = expression.to_string();
                self.evaluate_expression(scope, &expression)
            }
            None => EvalValue::error(ErrorCode::Name),
        }
    }

    fn resolve_structured_ref(&self, scope: &Scope, table: &str, item: &StructuredItem) -> EvalValue {
        let Some(table) = self.workbook.table(table) else {
            return EvalValue::error(ErrorCode::Name);
        };
        let sheet_index = table.sheet_index;
        let col_range = |first_col: u32, last_col: u32, first_row: u32, last_row: u32| -> EvalValue {
            let mut rows = Vec::new();
            for row in first_row..=last_row {
                let mut cols = Vec::new();
                for col in first_col..=last_col {
                    cols.push(self.evaluate_cell(sheet_index, Address::new(col, row, false, false)));
                }
                rows.push(cols);
            }
            EvalValue::Array(rows)
        };
        match item {
            StructuredItem::All => {
                col_range(table.range.min_col(), table.range.max_col(), table.header_row(), table.range.max_row())
            }
            StructuredItem::Headers => {
                col_range(table.range.min_col(), table.range.max_col(), table.header_row(), table.header_row())
            }
            StructuredItem::Data => {
                col_range(table.range.min_col(), table.range.max_col(), table.first_data_row(), table.last_data_row())
            }
            StructuredItem::Totals => match table.totals_row() {
                Some(row) => col_range(table.range.min_col(), table.range.max_col(), row, row),
                None => EvalValue::error(ErrorCode::Ref),
            },
            StructuredItem::ThisRow => {
                if scope.origin.row < table.first_data_row() || scope.origin.row > table.last_data_row() {
                    EvalValue::error(ErrorCode::Value)
                } else {
                    col_range(table.range.min_col(), table.range.max_col(), scope.origin.row, scope.origin.row)
                }
            }
            StructuredItem::Column(header) => {
                let Some(offset) = table.column_index(header) else {
                    return EvalValue::error(ErrorCode::Ref);
                };
                let col = table.range.min_col() + offset as u32;
                col_range(col, col, table.first_data_row(), table.last_data_row())
            }
        }
    }
}

impl<'wb> EvalContext for Evaluator<'wb> {
    fn eval(&self, scope: &Scope, ast: &Ast) -> EvalValue {
        self.eval_ast(scope, ast)
    }

    fn workbook(&self) -> &Workbook {
        self.workbook
    }

    fn resolve_sheet(&self, scope: &Scope, sheet: &Option<String>) -> Result<usize, ErrorCode> {
        Evaluator::resolve_sheet(self, scope, sheet)
    }

    fn evaluate_cell(&self, sheet_index: usize, address: Address) -> FormulaScalar {
        Evaluator::evaluate_cell(self, sheet_index, address)
    }
}

fn eval_literal(lit: &Literal) -> EvalValue {
    EvalValue::Scalar(eval_literal_scalar(lit))
}

fn eval_literal_scalar(lit: &Literal) -> FormulaScalar {
    match lit {
        Literal::Number(n) => FormulaScalar::Number(*n),
        Literal::Text(s) => FormulaScalar::Text(s.clone()),
        Literal::Boolean(b) => FormulaScalar::Boolean(*b),
        Literal::Error(e) => FormulaScalar::Error(*e),
    }
}

/// Primitive equality: distinct types are never equal except for blank
/// (`Null`) comparing equal to `0` and `""`, matching Excel's treatment of
/// empty cells in comparisons (`spec.md` §4.6).
fn scalar_eq(a: &FormulaScalar, b: &FormulaScalar) -> bool {
    use FormulaScalar::*;
    match (a, b) {
        (Number(x), Number(y)) => x == y,
        (Boolean(x), Boolean(y)) => x == y,
        (Text(x), Text(y)) => x.eq_ignore_ascii_case(y),
        (Error(x), Error(y)) => x == y,
        (Null, Null) => true,
        (Null, Number(n)) | (Number(n), Null) => *n == 0.0,
        (Null, Text(s)) | (Text(s), Null) => s.is_empty(),
        _ => false,
    }
}

/// Ordering requires both sides to be the same comparable type; booleans
/// are excluded per the frozen open-question decision in `DESIGN.md`.
fn scalar_cmp(a: &FormulaScalar, b: &FormulaScalar) -> Result<Ordering, ErrorCode> {
    use FormulaScalar::*;
    match (a, b) {
        (Number(x), Number(y)) => x.partial_cmp(y).ok_or(ErrorCode::Num),
        (Text(x), Text(y)) => Ok(x.cmp(y)),
        (Null, Number(y)) => 0.0f64.partial_cmp(y).ok_or(ErrorCode::Num),
        (Number(x), Null) => x.partial_cmp(&0.0).ok_or(ErrorCode::Num),
        (Null, Text(y)) => Ok("".cmp(y.as_str())),
        (Text(x), Null) => Ok(x.as_str().cmp("")),
        (Null, Null) => Ok(Ordering::Equal),
        _ => Err(ErrorCode::Value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{Cell, Formula, Sheet};
    use gridcalc_common::{CellValue, DateSystem};

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn simple_addition_scenario() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(1, 1, Cell::value(CellValue::Number(1.0)));
        sheet.set_cell(2, 1, Cell::value(CellValue::Number(2.0)));
        sheet.set_cell(1, 2, Cell::formula(Formula::normal("A1+A2"), CellValue::Empty));
        wb.add_sheet(sheet);
        let ev = Evaluator::new(&wb);
        assert_eq!(ev.evaluate_cell(0, addr("B1")), FormulaScalar::Number(3.0));
    }

    #[test]
    fn circular_reference_yields_ref_error() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(1, 1, Cell::formula(Formula::normal("B1"), CellValue::Empty));
        sheet.set_cell(1, 2, Cell::formula(Formula::normal("A1"), CellValue::Empty));
        wb.add_sheet(sheet);
        let ev = Evaluator::new(&wb);
        assert_eq!(ev.evaluate_cell(0, addr("A1")), FormulaScalar::Error(ErrorCode::Ref));
        assert_eq!(ev.evaluate_cell(0, addr("B1")), FormulaScalar::Error(ErrorCode::Ref));
    }

    #[test]
    fn cross_sheet_reference() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut other = Sheet::new("Other", 1);
        other.set_cell(1, 1, Cell::value(CellValue::Number(41.0)));
        wb.add_sheet(other);
        let mut sheet1 = Sheet::new("Sheet1", 2);
        sheet1.set_cell(1, 1, Cell::formula(Formula::normal("Other!A1+1"), CellValue::Empty));
        wb.add_sheet(sheet1);
        let ev = Evaluator::new(&wb);
        assert_eq!(ev.evaluate_cell(1, addr("A1")), FormulaScalar::Number(42.0));
    }

    #[test]
    fn divide_by_zero_is_value_error() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(1, 1, Cell::formula(Formula::normal("1/0"), CellValue::Empty));
        wb.add_sheet(sheet);
        let ev = Evaluator::new(&wb);
        assert_eq!(ev.evaluate_cell(0, addr("A1")), FormulaScalar::Error(ErrorCode::Div));
    }

    #[test]
    fn comparison_rejects_mismatched_ordering_types() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(1, 1, Cell::formula(Formula::normal("\"a\"<5"), CellValue::Empty));
        wb.add_sheet(sheet);
        let ev = Evaluator::new(&wb);
        assert_eq!(ev.evaluate_cell(0, addr("A1")), FormulaScalar::Error(ErrorCode::Value));
    }

    #[test]
    fn unknown_function_is_name_error() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(1, 1, Cell::formula(Formula::normal("FROBNICATE(1)"), CellValue::Empty));
        wb.add_sheet(sheet);
        let ev = Evaluator::new(&wb);
        assert_eq!(ev.evaluate_cell(0, addr("A1")), FormulaScalar::Error(ErrorCode::Name));
    }
}
