//! Date/time token rendering: `y/m/d/h/s` runs, `AM/PM`, sub-second
//! fractions, and the elapsed-time brackets `[h]/[m]/[s]` (`spec.md` §4.7).
//!
//! `m` is ambiguous between month and minute; it resolves to minute only
//! when it sits next to an hour or second token, matching the rule Excel
//! itself applies when scanning a section left to right.

use chrono::{Datelike, Timelike};
use gridcalc_common::DateSystem;

use crate::pattern::Token;

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    SubSecond(usize),
    AmPm,
    ElapsedH,
    ElapsedM,
    ElapsedS,
}

/// Render `serial` (an Excel date serial) against a date/time section's
/// tokens.
pub fn render_date(tokens: &[Token], serial: f64, date_system: DateSystem) -> String {
    let kinds = classify(tokens);
    let subsecond_digits = kinds
        .iter()
        .find_map(|k| if let Some(Kind::SubSecond(n)) = k { Some(*n) } else { None })
        .unwrap_or(0);
    let has_ampm = kinds.iter().any(|k| matches!(k, Some(Kind::AmPm)));

    let unit_divisor = 10f64.powi(subsecond_digits as i32);
    let serial_units = (serial * 86_400.0 * unit_divisor).round();
    let mut day_part = (serial_units / (86_400.0 * unit_divisor)).floor();
    let mut time_units_today = serial_units - day_part * 86_400.0 * unit_divisor;
    if time_units_today >= 86_400.0 * unit_divisor {
        time_units_today -= 86_400.0 * unit_divisor;
        day_part += 1.0;
    }
    let total_seconds_today = (time_units_today / unit_divisor).floor();
    let subsecond_units = (time_units_today - total_seconds_today * unit_divisor).round() as i64;
    let whole_second_serial = day_part + total_seconds_today / 86_400.0;

    let dt = date_system.serial_to_datetime(whole_second_serial);
    let total_seconds_abs = (whole_second_serial * 86_400.0).round() as i64;

    let hour24 = dt.hour();
    let hour12 = match hour24 % 12 {
        0 => 12,
        h => h,
    };
    let is_pm = hour24 >= 12;

    let mut out = String::new();
    for (token, kind) in tokens.iter().zip(kinds.iter()) {
        match token {
            Token::Literal(c) => out.push(*c),
            Token::Decimal => {
                out.push('.');
                if let Some(Kind::SubSecond(digits)) = kind {
                    out.push_str(&format!("{:0width$}", subsecond_units, width = *digits));
                }
            }
            Token::DateTime(raw) if kind.is_some() => match kind.unwrap() {
                Kind::Year => {
                    if raw.len() >= 4 {
                        out.push_str(&format!("{:04}", dt.year()));
                    } else {
                        out.push_str(&format!("{:02}", dt.year().rem_euclid(100)));
                    }
                }
                Kind::Month => match raw.len() {
                    1 => out.push_str(&dt.month().to_string()),
                    2 => out.push_str(&format!("{:02}", dt.month())),
                    3 => out.push_str(month_abbrev(dt.month())),
                    _ => out.push_str(month_name(dt.month())),
                },
                Kind::Day => match raw.len() {
                    1 => out.push_str(&dt.day().to_string()),
                    2 => out.push_str(&format!("{:02}", dt.day())),
                    3 => out.push_str(weekday_abbrev(dt.weekday())),
                    _ => out.push_str(weekday_name(dt.weekday())),
                },
                Kind::Hour => {
                    let h = if has_ampm { hour12 } else { hour24 };
                    if raw.len() >= 2 {
                        out.push_str(&format!("{h:02}"));
                    } else {
                        out.push_str(&h.to_string());
                    }
                }
                Kind::Minute => {
                    let m = dt.minute();
                    if raw.len() >= 2 {
                        out.push_str(&format!("{m:02}"));
                    } else {
                        out.push_str(&m.to_string());
                    }
                }
                Kind::Second => {
                    let s = dt.second();
                    if raw.len() >= 2 {
                        out.push_str(&format!("{s:02}"));
                    } else {
                        out.push_str(&s.to_string());
                    }
                }
                // Sub-second digits are attached to the `.` token, not a
                // `DateTime` token; see the `Token::Decimal` arm above.
                Kind::SubSecond(_) => {}
                Kind::AmPm => {
                    let rendered = if raw.eq_ignore_ascii_case("AM/PM") {
                        if is_pm { "PM" } else { "AM" }
                    } else if is_pm {
                        "P"
                    } else {
                        "A"
                    };
                    let lowercase = raw.chars().next().map(|c| c.is_lowercase()).unwrap_or(false);
                    if lowercase {
                        out.push_str(&rendered.to_ascii_lowercase());
                    } else {
                        out.push_str(rendered);
                    }
                }
                Kind::ElapsedH => out.push_str(&(total_seconds_abs / 3600).to_string()),
                Kind::ElapsedM => out.push_str(&(total_seconds_abs / 60).to_string()),
                Kind::ElapsedS => out.push_str(&total_seconds_abs.to_string()),
            },
            _ => {}
        }
    }
    out
}

fn classify(tokens: &[Token]) -> Vec<Option<Kind>> {
    let mut kinds: Vec<Option<Kind>> = tokens
        .iter()
        .map(|t| match t {
            Token::DateTime(s) => Some(raw_kind(s)),
            _ => None,
        })
        .collect();

    // Resolve month/minute ambiguity and attach sub-second digit counts to
    // the `.0+` run that follows a seconds token.
    for i in 0..tokens.len() {
        if kinds[i] == Some(Kind::Month) && is_month_minute_ambiguous(tokens, i) {
            let prev_is_hour =
                prev_date_kind(&kinds, i).map(|k| k == Kind::Hour).unwrap_or(false);
            let next_is_second = next_date_kind(&kinds, i).map(|k| k == Kind::Second).unwrap_or(false);
            if prev_is_hour || next_is_second {
                kinds[i] = Some(Kind::Minute);
            }
        }
    }

    for i in 0..tokens.len() {
        if matches!(kinds[i], Some(Kind::Second)) && matches!(tokens.get(i + 1), Some(Token::Decimal)) {
            let mut digits = 0;
            let mut j = i + 2;
            while matches!(tokens.get(j), Some(Token::Digit0)) {
                digits += 1;
                j += 1;
            }
            if digits > 0 {
                kinds[i + 1] = Some(Kind::SubSecond(digits));
                for k in kinds.iter_mut().take(j).skip(i + 2) {
                    *k = None;
                }
            }
        }
    }

    kinds
}

fn is_month_minute_ambiguous(tokens: &[Token], i: usize) -> bool {
    matches!(&tokens[i], Token::DateTime(s) if s.chars().next().map(|c| c == 'm' || c == 'M').unwrap_or(false))
}

fn prev_date_kind(kinds: &[Option<Kind>], i: usize) -> Option<Kind> {
    kinds[..i].iter().rev().find_map(|k| *k)
}

fn next_date_kind(kinds: &[Option<Kind>], i: usize) -> Option<Kind> {
    kinds[i + 1..].iter().find_map(|k| *k)
}

fn raw_kind(s: &str) -> Kind {
    if s.starts_with('[') {
        return match s.to_ascii_lowercase().as_str() {
            "[h]" => Kind::ElapsedH,
            "[m]" => Kind::ElapsedM,
            _ => Kind::ElapsedS,
        };
    }
    if s.eq_ignore_ascii_case("AM/PM") || s.eq_ignore_ascii_case("A/P") {
        return Kind::AmPm;
    }
    let lower = s.to_ascii_lowercase();
    if lower.starts_with('y') {
        Kind::Year
    } else if lower.starts_with('d') {
        Kind::Day
    } else if lower.starts_with('h') {
        Kind::Hour
    } else if lower.starts_with('s') {
        Kind::Second
    } else {
        Kind::Month
    }
}

fn month_name(m: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ];
    NAMES[(m.clamp(1, 12) - 1) as usize]
}

fn month_abbrev(m: u32) -> &'static str {
    const NAMES: [&str; 12] =
        ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
    NAMES[(m.clamp(1, 12) - 1) as usize]
}

fn weekday_name(d: chrono::Weekday) -> &'static str {
    match d {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

fn weekday_abbrev(d: chrono::Weekday) -> &'static str {
    match d {
        chrono::Weekday::Mon => "Mon",
        chrono::Weekday::Tue => "Tue",
        chrono::Weekday::Wed => "Wed",
        chrono::Weekday::Thu => "Thu",
        chrono::Weekday::Fri => "Fri",
        chrono::Weekday::Sat => "Sat",
        chrono::Weekday::Sun => "Sun",
    }
}
