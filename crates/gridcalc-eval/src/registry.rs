//! Function registry: named entries with either an eager or a lazy
//! evaluation contract (`spec.md` §4.5).
//!
//! Eager functions receive already-evaluated arguments; lazy ones receive
//! the raw AST children plus an evaluation callback (here, the
//! [`EvalContext`] trait object), which is how `IF`/`AND`/`OR`/`IFERROR`
//! get their short-circuit behavior without a coroutine.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use gridcalc_common::{Address, ErrorCode, FormulaScalar};
use gridcalc_parse::parser::Ast;

use crate::evaluator::Scope;
use crate::values::EvalValue;
use crate::workbook::Workbook;

pub trait EvalContext {
    fn eval(&self, scope: &Scope, ast: &Ast) -> EvalValue;
    fn workbook(&self) -> &Workbook;
    fn resolve_sheet(&self, scope: &Scope, sheet: &Option<String>) -> Result<usize, ErrorCode>;
    fn evaluate_cell(&self, sheet_index: usize, address: Address) -> FormulaScalar;
}

pub type EagerFn = fn(&[EvalValue], &dyn EvalContext, &Scope) -> EvalValue;
pub type LazyFn = fn(&dyn EvalContext, &Scope, &[Ast]) -> EvalValue;

#[derive(Clone, Copy)]
pub enum FunctionEntry {
    Eager(EagerFn),
    Lazy(LazyFn),
}

static REGISTRY: Lazy<FxHashMap<&'static str, FunctionEntry>> = Lazy::new(build_registry);

pub fn lookup(name: &str) -> Option<FunctionEntry> {
    REGISTRY.get(name).copied()
}

fn build_registry() -> FxHashMap<&'static str, FunctionEntry> {
    let mut map = FxHashMap::default();
    for (name, entry) in crate::builtins::math::entries()
        .into_iter()
        .chain(crate::builtins::logical::entries())
        .chain(crate::builtins::text::entries())
        .chain(crate::builtins::lookup::entries())
        .chain(crate::builtins::stats::entries())
        .chain(crate::builtins::database::entries())
        .chain(crate::builtins::financial::entries())
        .chain(crate::builtins::datetime::entries())
        .chain(crate::builtins::info::entries())
        .chain(crate::builtins::array_fns::entries())
        .chain(crate::builtins::table_fns::entries())
    {
        map.insert(name, entry);
    }
    map
}
