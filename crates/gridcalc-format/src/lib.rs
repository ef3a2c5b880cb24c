//! SpreadsheetML number-format code renderer (`spec.md` §4.7, C7): section
//! selection, numeric/date dispatch, and the `General` fallback.
//!
//! Two entry points mirror the public contract in `spec.md` §6:
//! [`format_number`] renders a numeric value and [`format_text`] applies a
//! format code's text section (if any) to a string value.

pub mod date;
pub mod number;
pub mod pattern;

use gridcalc_common::DateSystem;
use pattern::{parse_section, split_sections, Section};

/// Render `value` through a SpreadsheetML format code.
pub fn format_number(value: f64, code: &str, date_system: DateSystem) -> String {
    if code.trim().is_empty() || code.trim().eq_ignore_ascii_case("general") {
        return number::format_general(value);
    }

    let raw_sections = split_sections(code);
    let sections: Vec<Section> = raw_sections.iter().map(|s| parse_section(s)).collect();
    let Some(index) = select_section(&sections, value) else {
        return number::format_general(value);
    };
    if raw_sections[index].trim().eq_ignore_ascii_case("general") {
        return number::format_general(value);
    }
    let section = &sections[index];
    let auto_minus = sections.len() == 1;

    if pattern::is_date_pattern(&section.tokens) {
        date::render_date(&section.tokens, value, date_system)
    } else {
        number::render_numeric(&section.tokens, value, auto_minus)
    }
}

/// Apply a format code's text section (the 4th, when present) to `value`.
/// Codes with fewer than four sections have no text section; `value`
/// passes through unchanged, matching Excel's behavior for text input
/// against a numeric-only format code.
pub fn format_text(value: &str, code: &str) -> String {
    let sections = split_sections(code);
    if sections.len() < 4 {
        return value.to_string();
    }
    let section = parse_section(&sections[3]);
    let mut out = String::new();
    for token in &section.tokens {
        match token {
            pattern::Token::At => out.push_str(value),
            pattern::Token::Literal(c) => out.push(*c),
            _ => {}
        }
    }
    out
}

/// Pick which section applies to `value`, following `spec.md` §4.7:
/// explicit `[op n]` conditions are tried in order (an unconditioned
/// section always matches, acting as the fallback); when no section
/// carries a condition, fall back to the standard positive/negative/zero
/// split implied by the section count.
fn select_section(sections: &[Section], value: f64) -> Option<usize> {
    if sections.is_empty() {
        return None;
    }
    if sections.iter().any(|s| s.condition.is_some()) {
        for (i, s) in sections.iter().enumerate() {
            match &s.condition {
                Some(cond) if cond.matches(value) => return Some(i),
                None => return Some(i),
                _ => {}
            }
        }
        return Some(sections.len() - 1);
    }

    Some(match sections.len() {
        1 => 0,
        2 => {
            if value < 0.0 {
                1
            } else {
                0
            }
        }
        _ => {
            if value > 0.0 {
                0
            } else if value < 0.0 {
                1
            } else {
                2
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_sections() {
        assert_eq!(format_number(0.1, "0%", DateSystem::Excel1900), "10%");
        assert_eq!(format_number(0.1, "0.0%", DateSystem::Excel1900), "10.0%");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(format_number(314159.0, "#,##0.00", DateSystem::Excel1900), "314,159.00");
    }

    #[test]
    fn required_digit_padding() {
        assert_eq!(format_number(12.3, "000.00", DateSystem::Excel1900), "012.30");
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(format_number(1234.5678, "0.00E+00", DateSystem::Excel1900), "1.23E+03");
    }

    #[test]
    fn negative_section_suppresses_auto_minus() {
        assert_eq!(format_number(-5.0, "0.00;(0.00)", DateSystem::Excel1900), "(5.00)");
    }

    #[test]
    fn single_section_gets_auto_minus() {
        assert_eq!(format_number(-5.0, "0.00", DateSystem::Excel1900), "-5.00");
    }

    #[test]
    fn date_1904_epoch() {
        assert_eq!(format_number(0.0, "yyyy-mm-dd", DateSystem::Excel1904), "1904-01-01");
    }

    #[test]
    fn elapsed_time_mixes_total_hours_with_time_of_day_minutes_and_seconds() {
        // `[h]` is total hours since serial 0 (spec.md §4.7); `mm`/`ss` are
        // the ordinary, non-bracketed (modulo-within-day) minute/second --
        // 3.1416 days = 271434.24s = 75h23m54.24s.
        assert_eq!(
            format_number(3.1416, "[h]:mm:ss.000", DateSystem::Excel1904),
            "75:23:54.240"
        );
    }

    #[test]
    fn text_section_substitutes_at() {
        assert_eq!(format_text("abc", "General;General;General;\"X\"@\"Y\""), "XabcY");
    }

    #[test]
    fn general_fallback_for_empty_code() {
        assert_eq!(format_number(3.5, "", DateSystem::Excel1900), "3.5");
    }
}
