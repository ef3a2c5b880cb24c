//! Inclusive rectangular ranges, with whole-column/row sentinels.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::{Address, AddressParseError, MAX_COLS, MAX_ROWS};

/// Inclusive range of cells. `start`/`end` need not be ordered; consumers
/// take min/max of each axis (`spec.md` §3 "Range").
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Address,
    pub end: Address,
    pub sheet_name: Option<String>,
}

impl Range {
    pub fn new(start: Address, end: Address, sheet_name: Option<String>) -> Range {
        Range { start, end, sheet_name }
    }

    /// A single-cell range.
    pub fn from_cell(addr: Address, sheet_name: Option<String>) -> Range {
        Range::new(addr, addr, sheet_name)
    }

    pub fn min_col(&self) -> u32 {
        self.start.col.min(self.end.col)
    }
    pub fn max_col(&self) -> u32 {
        self.start.col.max(self.end.col)
    }
    pub fn min_row(&self) -> u32 {
        self.start.row.min(self.end.row)
    }
    pub fn max_row(&self) -> u32 {
        self.start.row.max(self.end.row)
    }

    pub fn is_whole_column(&self) -> bool {
        self.min_row() == 1 && self.max_row() == MAX_ROWS
    }

    pub fn is_whole_row(&self) -> bool {
        self.min_col() == 1 && self.max_col() == MAX_COLS
    }

    /// Clamp whole-column/row sentinels to a sheet's observed bounds
    /// (`spec.md` §3 and §4.6 "Range resolution").
    pub fn clamped(&self, sheet_max_row: u32, sheet_max_col: u32) -> (u32, u32, u32, u32) {
        let max_row = if self.is_whole_column() { sheet_max_row.max(1) } else { self.max_row() };
        let max_col = if self.is_whole_row() { sheet_max_col.max(1) } else { self.max_col() };
        (self.min_row(), max_row, self.min_col(), max_col)
    }

    /// Parse `A1:B2`, `A:A` (whole column), or `1:1` (whole row), with an
    /// optional caller-supplied sheet name (from the enclosing reference
    /// text's qualifier).
    pub fn parse(s: &str, sheet_name: Option<String>) -> Result<Range, AddressParseError> {
        let Some((lhs, rhs)) = s.split_once(':') else {
            let addr = Address::parse(s)?;
            return Ok(Range::from_cell(addr, sheet_name));
        };

        if let (Ok(start_col), Ok(end_col)) = (parse_bare_column(lhs), parse_bare_column(rhs)) {
            let start = Address::new(start_col.0, 1, start_col.1, false);
            let end = Address::new(end_col.0, MAX_ROWS, end_col.1, false);
            return Ok(Range::new(start, end, sheet_name));
        }
        if let (Ok(start_row), Ok(end_row)) = (parse_bare_row(lhs), parse_bare_row(rhs)) {
            let start = Address::new(1, start_row.0, false, start_row.1);
            let end = Address::new(MAX_COLS, end_row.0, false, end_row.1);
            return Ok(Range::new(start, end, sheet_name));
        }

        let start = Address::parse(lhs)?;
        let end = Address::parse(rhs)?;
        Ok(Range::new(start, end, sheet_name))
    }

    pub fn format(&self) -> String {
        if self.start == self.end {
            self.start.format()
        } else {
            format!("{}:{}", self.start.format(), self.end.format())
        }
    }
}

fn parse_bare_column(s: &str) -> Result<(u32, bool), ()> {
    let (abs, letters) = match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(());
    }
    crate::address::letters_to_col(letters).map(|c| (c, abs)).map_err(|_| ())
}

fn parse_bare_row(s: &str) -> Result<(u32, bool), ()> {
    let (abs, digits) = match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    digits.parse::<u32>().map(|r| (r, abs)).map_err(|_| ())
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_column() {
        let r = Range::parse("A:A", None).unwrap();
        assert!(r.is_whole_column());
        assert_eq!(r.min_col(), 1);
        assert_eq!(r.max_col(), 1);
        assert_eq!(r.max_row(), MAX_ROWS);
    }

    #[test]
    fn parses_whole_row() {
        let r = Range::parse("1:1", None).unwrap();
        assert!(r.is_whole_row());
        assert_eq!(r.min_row(), 1);
        assert_eq!(r.max_row(), 1);
    }

    #[test]
    fn round_trip_modulo_normalization() {
        let r = Range::parse("B3:A1", None).unwrap();
        let text = r.format();
        // The parsed range keeps the literal corners; width/height use min/max.
        assert_eq!(text, "B3:A1");
        assert_eq!(r.min_row(), 1);
        assert_eq!(r.max_row(), 3);
        assert_eq!(r.min_col(), 1);
        assert_eq!(r.max_col(), 2);
    }

    #[test]
    fn clamped_whole_column_uses_sheet_bounds() {
        let r = Range::parse("A:A", None).unwrap();
        assert_eq!(r.clamped(10, 5), (1, 10, 1, 1));
    }
}
