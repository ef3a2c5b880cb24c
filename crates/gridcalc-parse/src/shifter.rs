//! Reference shifting for copy/paste and row/column insertion
//! (`spec.md` §4.3).
//!
//! Absolute references (`$A$1`) never move; relative components shift with
//! the paste delta. A reference that would fall outside the grid collapses
//! to a `#REF!` literal in place, exactly where it sat in the tree -- the
//! rest of the formula still renders.

use gridcalc_common::ErrorCode;

use crate::parser::{self, ArithOp, Ast, CompareOp, Literal, StructuredItem};

/// Shift every relative reference in `expression` by `(delta_col, delta_row)`.
/// `expression` may or may not carry a leading `=`; the same convention is
/// preserved on output. Formulas that fail to parse are returned unchanged.
pub fn shift(expression: &str, delta_col: i64, delta_row: i64) -> String {
    let has_prefix = expression.trim_start().starts_with('=');
    let Ok(ast) = parser::parse(expression) else {
        return expression.to_string();
    };
    let shifted = shift_ast(&ast, delta_col, delta_row);
    let body = render(&shifted);
    if has_prefix { format!("={body}") } else { body }
}

fn shift_ast(ast: &Ast, dc: i64, dr: i64) -> Ast {
    match ast {
        Ast::Reference { sheet, address } => match address.shift(dc, dr) {
            Some(address) => Ast::Reference { sheet: sheet.clone(), address },
            None => Ast::Literal(Literal::Error(ErrorCode::Ref)),
        },
        Ast::RangeRef(range) => match (range.start.shift(dc, dr), range.end.shift(dc, dr)) {
            (Some(start), Some(end)) => {
                Ast::RangeRef(gridcalc_common::Range::new(start, end, range.sheet_name.clone()))
            }
            _ => Ast::Literal(Literal::Error(ErrorCode::Ref)),
        },
        Ast::ThreeDRange { start_sheet, end_sheet, address } => match address.shift(dc, dr) {
            Some(address) => {
                Ast::ThreeDRange { start_sheet: start_sheet.clone(), end_sheet: end_sheet.clone(), address }
            }
            None => Ast::Literal(Literal::Error(ErrorCode::Ref)),
        },
        Ast::Unary { negative, expr } => {
            Ast::Unary { negative: *negative, expr: Box::new(shift_ast(expr, dc, dr)) }
        }
        Ast::Percent(expr) => Ast::Percent(Box::new(shift_ast(expr, dc, dr))),
        Ast::Binary { op, left, right } => {
            Ast::Binary { op: *op, left: Box::new(shift_ast(left, dc, dr)), right: Box::new(shift_ast(right, dc, dr)) }
        }
        Ast::Compare { op, left, right } => {
            Ast::Compare { op: *op, left: Box::new(shift_ast(left, dc, dr)), right: Box::new(shift_ast(right, dc, dr)) }
        }
        Ast::Concat { left, right } => {
            Ast::Concat { left: Box::new(shift_ast(left, dc, dr)), right: Box::new(shift_ast(right, dc, dr)) }
        }
        Ast::Function { name, args } => {
            Ast::Function { name: name.clone(), args: args.iter().map(|a| shift_ast(a, dc, dr)).collect() }
        }
        Ast::Literal(_) | Ast::Array(_) | Ast::Name(_) | Ast::StructuredRef { .. } => ast.clone(),
    }
}

/// Render an [`Ast`] back to formula text (no leading `=`). Operands that
/// could change meaning if left bare are parenthesized, even where a
/// tighter precedence-aware printer could omit them.
pub fn render(ast: &Ast) -> String {
    match ast {
        Ast::Literal(lit) => render_literal(lit),
        Ast::Reference { sheet, address } => match sheet {
            Some(sheet) => format!("{}!{}", gridcalc_common::quote_sheet_name_if_needed(sheet), address.format()),
            None => address.format(),
        },
        Ast::RangeRef(range) => match &range.sheet_name {
            Some(sheet) => format!("{}!{}", gridcalc_common::quote_sheet_name_if_needed(sheet), range.format()),
            None => range.format(),
        },
        Ast::ThreeDRange { start_sheet, end_sheet, address } => format!(
            "{}:{}!{}",
            gridcalc_common::quote_sheet_name_if_needed(start_sheet),
            gridcalc_common::quote_sheet_name_if_needed(end_sheet),
            address.format()
        ),
        Ast::Array(rows) => {
            let rows: Vec<String> =
                rows.iter().map(|row| row.iter().map(render_literal).collect::<Vec<_>>().join(",")).collect();
            format!("{{{}}}", rows.join(";"))
        }
        Ast::Unary { negative, expr } => {
            format!("{}{}", if *negative { "-" } else { "" }, maybe_paren(expr))
        }
        Ast::Percent(expr) => format!("{}%", maybe_paren(expr)),
        Ast::Binary { op, left, right } => {
            format!("{}{}{}", maybe_paren(left), arith_symbol(*op), maybe_paren(right))
        }
        Ast::Compare { op, left, right } => {
            format!("{}{}{}", maybe_paren(left), compare_symbol(*op), maybe_paren(right))
        }
        Ast::Concat { left, right } => format!("{}&{}", maybe_paren(left), maybe_paren(right)),
        Ast::Function { name, args } => {
            format!("{name}({})", args.iter().map(render).collect::<Vec<_>>().join(","))
        }
        Ast::Name(name) => name.clone(),
        Ast::StructuredRef { table, item } => format!("{table}[{}]", render_structured_item(item)),
    }
}

fn maybe_paren(ast: &Ast) -> String {
    let rendered = render(ast);
    match ast {
        Ast::Binary { .. } | Ast::Compare { .. } | Ast::Concat { .. } | Ast::Unary { .. } => {
            format!("({rendered})")
        }
        _ => rendered,
    }
}

fn render_literal(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) => gridcalc_common::general_number_text(*n),
        Literal::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        Literal::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Literal::Error(e) => e.as_str().to_string(),
    }
}

fn render_structured_item(item: &StructuredItem) -> String {
    match item {
        StructuredItem::All => "#All".to_string(),
        StructuredItem::Data => "#Data".to_string(),
        StructuredItem::Headers => "#Headers".to_string(),
        StructuredItem::Totals => "#Totals".to_string(),
        StructuredItem::ThisRow => "#This Row".to_string(),
        StructuredItem::Column(name) => name.clone(),
    }
}

fn arith_symbol(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
        ArithOp::Pow => "^",
    }
}

fn compare_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "<>",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_relative_reference() {
        assert_eq!(shift("=A1", 1, 1), "=B2");
    }

    #[test]
    fn absolute_reference_is_unaffected() {
        assert_eq!(shift("=$A$1", 2, 3), "=$A$1");
    }

    #[test]
    fn mixed_absolute_shifts_only_relative_axis() {
        assert_eq!(shift("=$A1", 5, 5), "=$A6");
        assert_eq!(shift("=A$1", 5, 5), "=F$1");
    }

    #[test]
    fn overflow_collapses_to_ref_error() {
        assert_eq!(shift("=A1", -1, 0), "=#REF!");
    }

    #[test]
    fn shifts_range_bounds_independently() {
        assert_eq!(shift("=SUM(A1:B2)", 1, 0), "=SUM(B1:C2)");
    }

    #[test]
    fn invalid_formula_returned_unchanged() {
        let input = "=1+*2";
        assert_eq!(shift(input, 1, 1), input);
    }

    #[test]
    fn sheet_qualifier_preserved_verbatim() {
        assert_eq!(shift("='My Sheet'!A1", 1, 0), "='My Sheet'!B1");
    }
}
