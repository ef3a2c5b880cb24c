//! Synchronous formula evaluator: the workbook snapshot, the built-in
//! function registry, the AST-walking evaluator, and shared-formula
//! expansion (`spec.md` §3, §4.4-§4.6, §4.8).

pub mod builtins;
pub mod evaluator;
pub mod registry;
pub mod shared;
pub mod values;
pub mod workbook;

pub use evaluator::{Evaluator, Scope};
pub use registry::{EvalContext, FunctionEntry};
pub use shared::expand_shared_formulas;
pub use values::EvalValue;
pub use workbook::{Cell, Formula, FormulaKind, Sheet, SheetState, StyleSheet, Table, Workbook};
