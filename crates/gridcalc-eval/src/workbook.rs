//! Immutable workbook snapshot (`spec.md` §3, §4.4).
//!
//! Everything here is built once, ahead of evaluation, from a pre-parsed
//! XLSX payload; the evaluator never mutates it.

use rustc_hash::FxHashMap;

use gridcalc_common::{CellValue, DateSystem, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    Visible,
    Hidden,
    VeryHidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaKind {
    Normal,
    Shared,
    Array,
}

/// A cell's stored formula. `expression` may be empty for a shared-formula
/// dependent awaiting expansion (`spec.md` §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub kind: FormulaKind,
    pub expression: String,
    pub shared_index: Option<u32>,
}

impl Formula {
    pub fn normal(expression: impl Into<String>) -> Formula {
        Formula { kind: FormulaKind::Normal, expression: expression.into(), shared_index: None }
    }

    pub fn shared(expression: impl Into<String>, shared_index: u32) -> Formula {
        Formula { kind: FormulaKind::Shared, expression: expression.into(), shared_index: Some(shared_index) }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style_id: Option<u32>,
    pub formula: Option<Formula>,
    /// A differential (conditional) format's number-format code, when a
    /// matching rule overrides the cell's base style (`spec.md` §4.9,
    /// glossary "DXF"). Rule evaluation itself lives outside this crate;
    /// the snapshot builder resolves the winning rule ahead of time.
    pub conditional_format_code: Option<String>,
}

impl Cell {
    pub fn value(value: CellValue) -> Cell {
        Cell { value, style_id: None, formula: None, conditional_format_code: None }
    }

    pub fn formula(formula: Formula, cached_value: CellValue) -> Cell {
        Cell { value: cached_value, style_id: None, formula: Some(formula), conditional_format_code: None }
    }
}

/// Style-sheet slice this snapshot needs: `numFmtId` per cell style, plus
/// custom format codes for the ids a style sheet defines (`spec.md` §3
/// "Workbook" names `styles` without detailing it; `spec.md` §4.9 needs the
/// `numFmtId` → code lookup it implies).
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    /// `styleId` (a workbook-wide `xf` index) → `numFmtId`.
    pub cell_num_fmt_ids: FxHashMap<u32, u32>,
    /// Custom `numFmtId` → format code, for ids ≥ 164 plus any built-in id
    /// a workbook chooses to override.
    pub custom_num_fmts: FxHashMap<u32, String>,
}

impl StyleSheet {
    pub fn format_code_for_style(&self, style_id: u32) -> String {
        let num_fmt_id = self.cell_num_fmt_ids.get(&style_id).copied().unwrap_or(0);
        self.custom_num_fmts
            .get(&num_fmt_id)
            .cloned()
            .unwrap_or_else(|| builtin_format_code(num_fmt_id).to_string())
    }
}

/// The built-in `numFmtId` table (ECMA-376 Part 1 §18.8.30), covering the
/// ids worth special-casing beyond `General`.
fn builtin_format_code(id: u32) -> &'static str {
    match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => "General",
    }
}

/// A minimal table model -- `spec.md` §4.5 requires structured references
/// and `SUBTOTAL` but never names a `Table` type in §3. Grounded on the
/// same data needed by `Table[col]`/`[#Totals]` resolution: a name, the
/// backing range, and the column header order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub sheet_index: usize,
    pub range: Range,
    pub columns: Vec<String>,
    pub has_totals_row: bool,
}

impl Table {
    /// 1-based column index of `header`, matched case-insensitively.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(header))
    }

    pub fn header_row(&self) -> u32 {
        self.range.min_row()
    }

    pub fn first_data_row(&self) -> u32 {
        self.range.min_row() + 1
    }

    pub fn last_data_row(&self) -> u32 {
        if self.has_totals_row { self.range.max_row() - 1 } else { self.range.max_row() }
    }

    pub fn totals_row(&self) -> Option<u32> {
        self.has_totals_row.then(|| self.range.max_row())
    }
}

pub struct Sheet {
    pub name: String,
    pub sheet_id: u32,
    pub state: SheetState,
    pub date_system: DateSystem,
    pub dimension: Option<Range>,
    rows: FxHashMap<u32, FxHashMap<u32, Cell>>,
    max_row: u32,
    max_col: u32,
}

impl Sheet {
    pub fn new(name: impl Into<String>, sheet_id: u32) -> Sheet {
        Sheet {
            name: name.into(),
            sheet_id,
            state: SheetState::Visible,
            date_system: DateSystem::default(),
            dimension: None,
            rows: FxHashMap::default(),
            max_row: 0,
            max_col: 0,
        }
    }

    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.rows.entry(row).or_default().insert(col, cell);
    }

    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    pub fn get_cell_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        self.rows.get_mut(&row).and_then(|r| r.get_mut(&col))
    }

    /// Every populated `(row, col)` address, in no particular order --
    /// used by the shared-formula expander to find a shared group's cells
    /// without needing its full layout up front.
    pub fn cell_addresses(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.rows.iter().flat_map(|(row, cols)| cols.keys().map(move |col| (*row, *col)))
    }

    /// Used bounds, widened by the `<dimension>` hint when present
    /// (`spec.md` §4.4).
    pub fn max_row(&self) -> u32 {
        self.dimension.as_ref().map(|d| d.max_row().max(self.max_row)).unwrap_or(self.max_row).max(1)
    }

    pub fn max_col(&self) -> u32 {
        self.dimension.as_ref().map(|d| d.max_col().max(self.max_col)).unwrap_or(self.max_col).max(1)
    }
}

pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub date_system: DateSystem,
    pub tables: Vec<Table>,
    pub styles: StyleSheet,
    /// User-defined names, expanded to their formula text at the calling
    /// sheet's scope before evaluation (`spec.md` §4.6 "Defined names").
    pub defined_names: FxHashMap<String, String>,
}

impl Workbook {
    pub fn new(date_system: DateSystem) -> Workbook {
        Workbook {
            sheets: Vec::new(),
            date_system,
            tables: Vec::new(),
            styles: StyleSheet::default(),
            defined_names: FxHashMap::default(),
        }
    }

    pub fn add_sheet(&mut self, sheet: Sheet) -> usize {
        self.sheets.push(sheet);
        self.sheets.len() - 1
    }

    /// Case-insensitive, trim-folded sheet lookup (`spec.md` §6
    /// "Sheet-name matching").
    pub fn resolve_sheet_index_by_name(&self, name: &str) -> Option<usize> {
        let needle = normalize_sheet_name(name);
        self.sheets.iter().position(|s| normalize_sheet_name(&s.name) == needle)
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn define_name(&mut self, name: impl Into<String>, expression: impl Into<String>) {
        self.defined_names.insert(name.into().to_ascii_uppercase(), expression.into());
    }

    pub fn resolve_defined_name(&self, name: &str) -> Option<&str> {
        self.defined_names.get(&name.to_ascii_uppercase()).map(String::as_str)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

fn normalize_sheet_name(name: &str) -> String {
    let trimmed = name.trim();
    let unquoted = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')).unwrap_or(trimmed);
    unquoted.replace("''", "'").to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_common::Address;

    #[test]
    fn sheet_lookup_is_case_and_quote_insensitive() {
        let mut wb = Workbook::new(DateSystem::Excel1900);
        wb.add_sheet(Sheet::new("My Sheet", 1));
        assert_eq!(wb.resolve_sheet_index_by_name("'my sheet'"), Some(0));
        assert_eq!(wb.resolve_sheet_index_by_name("MY SHEET"), Some(0));
        assert_eq!(wb.resolve_sheet_index_by_name("Nope"), None);
    }

    #[test]
    fn sheet_bounds_widen_with_dimension_hint() {
        let mut sheet = Sheet::new("Sheet1", 1);
        sheet.set_cell(2, 2, Cell::value(CellValue::Number(1.0)));
        assert_eq!(sheet.max_row(), 2);
        sheet.dimension = Some(Range::from_cell(Address::parse("A1").unwrap(), None));
        let wide = Range::new(Address::parse("A1").unwrap(), Address::parse("E10").unwrap(), None);
        sheet.dimension = Some(wide);
        assert_eq!(sheet.max_row(), 10);
        assert_eq!(sheet.max_col(), 5);
    }

    #[test]
    fn table_row_bounds_account_for_totals_row() {
        let table = Table {
            name: "Table1".into(),
            sheet_index: 0,
            range: Range::new(Address::parse("A1").unwrap(), Address::parse("B5").unwrap(), None),
            columns: vec!["Item".into(), "Amount".into()],
            has_totals_row: true,
        };
        assert_eq!(table.header_row(), 1);
        assert_eq!(table.first_data_row(), 2);
        assert_eq!(table.last_data_row(), 4);
        assert_eq!(table.totals_row(), Some(5));
        assert_eq!(table.column_index("amount"), Some(1));
    }
}
