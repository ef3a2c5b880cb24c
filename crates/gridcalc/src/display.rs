//! Display glue (`spec.md` §4.9, C9): resolve a cell's effective format
//! code, then render an evaluated scalar through it for on-grid display.

use gridcalc_common::{DateSystem, ErrorCode, FormulaScalar};
use gridcalc_eval::{Cell, Workbook};

/// A conditional-format override wins over the cell's base style; absent
/// that, fall back to the style sheet's `numFmtId` lookup, and absent a
/// style entirely, `General`.
pub fn resolve_effective_format_code(workbook: &Workbook, cell: &Cell) -> String {
    if let Some(code) = &cell.conditional_format_code {
        return code.clone();
    }
    match cell.style_id {
        Some(style_id) => workbook.styles.format_code_for_style(style_id),
        None => "General".to_string(),
    }
}

/// Render an evaluated scalar for display through `code`. Mirrors
/// `spec.md` §4.9's dispatch table exactly: text and booleans never pass
/// through the number-format grammar, only numbers do.
pub fn format_for_display(scalar: &FormulaScalar, code: &str, date_system: DateSystem) -> String {
    match scalar {
        FormulaScalar::Null => String::new(),
        FormulaScalar::Number(n) => gridcalc_format::format_number(*n, code, date_system),
        FormulaScalar::Text(s) => s.clone(),
        FormulaScalar::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        FormulaScalar::Error(e) => error_token(*e),
    }
}

fn error_token(e: ErrorCode) -> String {
    e.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditional_format_wins_over_style() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        wb.styles.cell_num_fmt_ids.insert(1, 9);
        let mut cell = Cell::value(gridcalc_common::CellValue::Number(0.5));
        cell.style_id = Some(1);
        cell.conditional_format_code = Some("0.00".to_string());
        assert_eq!(resolve_effective_format_code(&wb, &cell), "0.00");
    }

    #[test]
    fn style_lookup_falls_back_to_builtin_table() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        wb.styles.cell_num_fmt_ids.insert(2, 9);
        let mut cell = Cell::value(gridcalc_common::CellValue::Number(0.5));
        cell.style_id = Some(2);
        assert_eq!(resolve_effective_format_code(&wb, &cell), "0%");
    }

    #[test]
    fn no_style_is_general() {
        let wb = Workbook::new(DateSystem::Excel1900);
        let cell = Cell::value(gridcalc_common::CellValue::Number(42.0));
        assert_eq!(resolve_effective_format_code(&wb, &cell), "General");
    }

    #[test]
    fn dispatch_skips_number_format_for_text_and_booleans() {
        let code = "0.00%";
        assert_eq!(format_for_display(&FormulaScalar::Null, code, DateSystem::Excel1900), "");
        assert_eq!(
            format_for_display(&FormulaScalar::Text("hi".into()), code, DateSystem::Excel1900),
            "hi"
        );
        assert_eq!(
            format_for_display(&FormulaScalar::Boolean(true), code, DateSystem::Excel1900),
            "TRUE"
        );
        assert_eq!(
            format_for_display(&FormulaScalar::Error(ErrorCode::Div), code, DateSystem::Excel1900),
            "#DIV/0!"
        );
        assert_eq!(
            format_for_display(&FormulaScalar::Number(0.5), code, DateSystem::Excel1900),
            "50.00%"
        );
    }
}
