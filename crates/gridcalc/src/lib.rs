//! Meta crate re-exporting the gridcalc building blocks: the address/range
//! model, the formula parser and reference shifter, the workbook snapshot
//! and evaluator, the number-format renderer, and the shared-formula
//! expander (`spec.md` §6 "External interfaces").

pub mod display;

pub use gridcalc_common::{
    Address, CellValue, DateSystem, ErrorCode, FormulaScalar, Range, DATE_SYSTEM_1904_OFFSET,
};
pub use gridcalc_eval::{
    Cell, EvalContext, EvalValue, Evaluator, Formula, FormulaKind, Scope, Sheet, SheetState,
    StyleSheet, Table, Workbook, expand_shared_formulas,
};
pub use gridcalc_format::{format_number, format_text};
pub use gridcalc_parse::{Ast, ParseError, parse, shift};

pub use display::{format_for_display, resolve_effective_format_code};

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_common::Address;

    fn addr(a: &str) -> Address {
        Address::parse(a).unwrap()
    }

    #[test]
    fn end_to_end_sum_and_display() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(1, 1, Cell::value(CellValue::Number(1.0)));
        sheet.set_cell(2, 1, Cell::value(CellValue::Number(2.0)));
        sheet.set_cell(1, 2, Cell::formula(Formula::normal("A1+A2"), CellValue::Empty));
        wb.styles.cell_num_fmt_ids.insert(1, 2);
        if let Some(cell) = sheet.get_cell_mut(1, 2) {
            cell.style_id = Some(1);
        }
        wb.add_sheet(sheet);

        let evaluator = Evaluator::new(&wb);
        let scalar = evaluator.evaluate_cell(0, addr("B1"));
        assert_eq!(scalar, FormulaScalar::Number(3.0));

        let cell = wb.sheet(0).unwrap().get_cell(1, 2).unwrap();
        let code = resolve_effective_format_code(&wb, cell);
        assert_eq!(format_for_display(&scalar, &code, wb.date_system), "3.00");
    }

    #[test]
    fn circular_reference_displays_ref_error() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(1, 1, Cell::formula(Formula::normal("B1"), CellValue::Empty));
        sheet.set_cell(1, 2, Cell::formula(Formula::normal("A1"), CellValue::Empty));
        wb.add_sheet(sheet);

        let evaluator = Evaluator::new(&wb);
        let scalar = evaluator.evaluate_cell(0, addr("A1"));
        assert_eq!(scalar, FormulaScalar::Error(ErrorCode::Ref));
        assert_eq!(format_for_display(&scalar, "General", wb.date_system), "#REF!");
    }

    #[test]
    fn cross_sheet_reference() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        let mut other = Sheet::new("Other", 1);
        other.set_cell(1, 1, Cell::value(CellValue::Number(41.0)));
        let mut sheet1 = Sheet::new("Sheet1", 2);
        sheet1.set_cell(1, 1, Cell::formula(Formula::normal("Other!A1+1"), CellValue::Empty));
        wb.add_sheet(other);
        wb.add_sheet(sheet1);

        let evaluator = Evaluator::new(&wb);
        let scalar = evaluator.evaluate_cell(1, addr("A1"));
        assert_eq!(scalar, FormulaScalar::Number(42.0));
    }
}
