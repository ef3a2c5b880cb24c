//! Shared-formula expansion (`spec.md` §4.8, C8): find each shared
//! group's base cell, then shift its expression by the delta to every
//! dependent cell recorded with the same `sharedIndex` and an empty
//! expression.

use rustc_hash::FxHashMap;

use crate::workbook::{FormulaKind, Sheet};

/// Mutates `sheet` in place, filling in every shared-formula dependent's
/// `expression` from its group's base cell (`spec.md` §6
/// `expandSharedFormulas`). A dependent whose group has no base cell keeps
/// its empty expression, which the evaluator later reports as `#NAME?`
/// (`spec.md` §3 "Formula").
pub fn expand_shared_formulas(sheet: &mut Sheet) {
    let mut bases: FxHashMap<u32, (u32, u32, String)> = FxHashMap::default();
    for (row, col) in sheet.cell_addresses() {
        if let Some(cell) = sheet.get_cell(row, col) {
            if let Some(formula) = &cell.formula {
                if formula.kind == FormulaKind::Shared && !formula.expression.is_empty() {
                    if let Some(index) = formula.shared_index {
                        bases.insert(index, (row, col, formula.expression.clone()));
                    }
                }
            }
        }
    }

    let addresses: Vec<(u32, u32)> = sheet.cell_addresses().collect();
    for (row, col) in addresses {
        let Some(cell) = sheet.get_cell_mut(row, col) else { continue };
        let Some(formula) = &mut cell.formula else { continue };
        if formula.kind != FormulaKind::Shared || !formula.expression.is_empty() {
            continue;
        }
        let Some(index) = formula.shared_index else { continue };
        let Some((base_row, base_col, base_expr)) = bases.get(&index) else { continue };
        let delta_col = col as i64 - *base_col as i64;
        let delta_row = row as i64 - *base_row as i64;
        formula.expression = gridcalc_parse::shift(base_expr, delta_col, delta_row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{Cell, Formula};
    use gridcalc_common::CellValue;

    #[test]
    fn dependent_inherits_shifted_base_expression() {
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(2, 1, Cell::formula(Formula::shared("A$1+A2", 3), CellValue::Empty));
        sheet.set_cell(41, 1, Cell::formula(
            Formula { kind: FormulaKind::Shared, expression: String::new(), shared_index: Some(3) },
            CellValue::Empty,
        ));
        expand_shared_formulas(&mut sheet);
        let dependent = sheet.get_cell(41, 1).unwrap().formula.as_ref().unwrap();
        assert_eq!(dependent.expression, "A$1+A41");
    }

    #[test]
    fn dependent_without_base_stays_empty() {
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(5, 1, Cell::formula(
            Formula { kind: FormulaKind::Shared, expression: String::new(), shared_index: Some(9) },
            CellValue::Empty,
        ));
        expand_shared_formulas(&mut sheet);
        let dependent = sheet.get_cell(5, 1).unwrap().formula.as_ref().unwrap();
        assert!(dependent.expression.is_empty());
    }
}
