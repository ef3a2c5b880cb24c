//! Date and time functions (`spec.md` §4.5, §4.7 date-system glossary).
//! `TODAY`/`NOW` read the wall clock rather than the workbook, so they are
//! the one place this crate calls into `chrono`'s `Local::now` directly.

use chrono::{Datelike, Local, NaiveDate};

use gridcalc_common::ErrorCode;

use crate::builtins::support::{optional_number, single_number};
use crate::evaluator::Scope;
use crate::registry::{EvalContext, FunctionEntry};
use crate::values::EvalValue;

type Entries = Vec<(&'static str, FunctionEntry)>;

pub fn entries() -> Entries {
    vec![
        ("TODAY", FunctionEntry::Eager(today)),
        ("NOW", FunctionEntry::Eager(now)),
        ("DATE", FunctionEntry::Eager(date)),
        ("YEAR", FunctionEntry::Eager(year)),
        ("MONTH", FunctionEntry::Eager(month)),
        ("DAY", FunctionEntry::Eager(day)),
        ("WEEKDAY", FunctionEntry::Eager(weekday)),
        ("EDATE", FunctionEntry::Eager(edate)),
        ("EOMONTH", FunctionEntry::Eager(eomonth)),
        ("DATEDIF", FunctionEntry::Eager(datedif)),
        ("WORKDAY", FunctionEntry::Eager(workday)),
    ]
}

fn today(_: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let date = Local::now().date_naive();
    let dt = date.and_hms_opt(0, 0, 0).unwrap();
    EvalValue::number(ctx.workbook().date_system.datetime_to_serial(&dt))
}

fn now(_: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let dt = Local::now().naive_local();
    EvalValue::number(ctx.workbook().date_system.datetime_to_serial(&dt))
}

fn date(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let y = match single_number(args, 0) {
        Ok(n) => n as i32,
        Err(e) => return EvalValue::error(e),
    };
    let m = match single_number(args, 1) {
        Ok(n) => n as i32,
        Err(e) => return EvalValue::error(e),
    };
    let d = match single_number(args, 2) {
        Ok(n) => n as i32,
        Err(e) => return EvalValue::error(e),
    };
    // Normalize month/day overflow the way Excel does: DATE(2024,13,1) is
    // 2025-01-01, DATE(2024,1,32) is 2024-02-01.
    let total_months = y * 12 + (m - 1);
    let norm_year = total_months.div_euclid(12);
    let norm_month = total_months.rem_euclid(12) + 1;
    let Some(base) = NaiveDate::from_ymd_opt(norm_year, norm_month as u32, 1) else {
        return EvalValue::error(ErrorCode::Num);
    };
    let target = base + chrono::Duration::days((d - 1) as i64);
    let dt = target.and_hms_opt(0, 0, 0).unwrap();
    EvalValue::number(ctx.workbook().date_system.datetime_to_serial(&dt))
}

fn to_date(args: &[EvalValue], ctx: &dyn EvalContext, index: usize) -> Result<NaiveDate, ErrorCode> {
    let serial = single_number(args, index)?;
    Ok(ctx.workbook().date_system.serial_to_datetime(serial).date())
}

fn year(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    match to_date(args, ctx, 0) {
        Ok(d) => EvalValue::number(d.year() as f64),
        Err(e) => EvalValue::error(e),
    }
}

fn month(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    match to_date(args, ctx, 0) {
        Ok(d) => EvalValue::number(d.month() as f64),
        Err(e) => EvalValue::error(e),
    }
}

fn day(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    match to_date(args, ctx, 0) {
        Ok(d) => EvalValue::number(d.day() as f64),
        Err(e) => EvalValue::error(e),
    }
}

/// `WEEKDAY(serial, [type])`: type 1 (default) is Sunday=1..Saturday=7.
fn weekday(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let d = match to_date(args, ctx, 0) {
        Ok(d) => d,
        Err(e) => return EvalValue::error(e),
    };
    let kind = match optional_number(args, 1, 1.0) {
        Ok(n) => n as i32,
        Err(e) => return EvalValue::error(e),
    };
    let sunday_based = d.weekday().num_days_from_sunday() as i64 + 1;
    let value = match kind {
        1 => sunday_based,
        2 => ((sunday_based + 5) % 7) + 1,
        3 => (sunday_based + 5) % 7,
        _ => return EvalValue::error(ErrorCode::Num),
    };
    EvalValue::number(value as f64)
}

fn edate(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let d = match to_date(args, ctx, 0) {
        Ok(d) => d,
        Err(e) => return EvalValue::error(e),
    };
    let months = match single_number(args, 1) {
        Ok(n) => n as i32,
        Err(e) => return EvalValue::error(e),
    };
    match shift_months(d, months) {
        Some(result) => {
            let dt = result.and_hms_opt(0, 0, 0).unwrap();
            EvalValue::number(ctx.workbook().date_system.datetime_to_serial(&dt))
        }
        None => EvalValue::error(ErrorCode::Num),
    }
}

fn eomonth(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let d = match to_date(args, ctx, 0) {
        Ok(d) => d,
        Err(e) => return EvalValue::error(e),
    };
    let months = match single_number(args, 1) {
        Ok(n) => n as i32,
        Err(e) => return EvalValue::error(e),
    };
    let Some(shifted) = shift_months(d, months) else {
        return EvalValue::error(ErrorCode::Num);
    };
    let Some(first_of_next) = NaiveDate::from_ymd_opt(
        shifted.year() + (shifted.month() == 12) as i32,
        if shifted.month() == 12 { 1 } else { shifted.month() + 1 },
        1,
    ) else {
        return EvalValue::error(ErrorCode::Num);
    };
    let last_day = first_of_next.pred_opt().unwrap();
    let dt = last_day.and_hms_opt(0, 0, 0).unwrap();
    EvalValue::number(ctx.workbook().date_system.datetime_to_serial(&dt))
}

fn shift_months(d: NaiveDate, months: i32) -> Option<NaiveDate> {
    let total = d.year() * 12 + (d.month() as i32 - 1) + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) + 1;
    let last_day_of_month = NaiveDate::from_ymd_opt(year + (month == 12) as i32, if month == 12 { 1 } else { month as u32 + 1 }, 1)?
        .pred_opt()?
        .day();
    NaiveDate::from_ymd_opt(year, month as u32, d.day().min(last_day_of_month))
}

/// `DATEDIF(start, end, unit)`: `"Y"`, `"M"`, `"D"`, `"YM"`, `"MD"`, `"YD"`.
fn datedif(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let start = match to_date(args, ctx, 0) {
        Ok(d) => d,
        Err(e) => return EvalValue::error(e),
    };
    let end = match to_date(args, ctx, 1) {
        Ok(d) => d,
        Err(e) => return EvalValue::error(e),
    };
    let unit = match args.get(2).map(|v| v.coerce_text()) {
        Some(Ok(s)) => s.to_ascii_uppercase(),
        Some(Err(e)) => return EvalValue::error(e),
        None => return EvalValue::error(ErrorCode::Value),
    };
    if end < start {
        return EvalValue::error(ErrorCode::Num);
    }
    let months_total = (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
        - if end.day() < start.day() { 1 } else { 0 };
    match unit.as_str() {
        "D" => EvalValue::number((end - start).num_days() as f64),
        "Y" => EvalValue::number((months_total / 12) as f64),
        "M" => EvalValue::number(months_total as f64),
        "YM" => EvalValue::number((months_total % 12) as f64),
        "MD" => {
            let anchor = shift_months(end, -months_total).unwrap_or(end);
            EvalValue::number((end - anchor.max(start)).num_days().max(0) as f64)
        }
        "YD" => {
            let anchor = shift_months(end, -(months_total - (months_total % 12))).unwrap_or(end);
            EvalValue::number((end - anchor.max(start)).num_days().max(0) as f64)
        }
        _ => EvalValue::error(ErrorCode::Num),
    }
}

/// `WORKDAY(start, days, [holidays])` -- holidays (a range of serials) are
/// an optional exclusion list; weekends are always Saturday/Sunday.
fn workday(args: &[EvalValue], ctx: &dyn EvalContext, _: &Scope) -> EvalValue {
    let start = match to_date(args, ctx, 0) {
        Ok(d) => d,
        Err(e) => return EvalValue::error(e),
    };
    let days = match single_number(args, 1) {
        Ok(n) => n as i64,
        Err(e) => return EvalValue::error(e),
    };
    let holidays: Vec<NaiveDate> = match args.get(2) {
        Some(v) => v
            .flatten()
            .into_iter()
            .filter_map(|s| s.coerce_number().ok())
            .map(|serial| ctx.workbook().date_system.serial_to_datetime(serial).date())
            .collect(),
        None => Vec::new(),
    };
    let step: i64 = if days >= 0 { 1 } else { -1 };
    let mut remaining = days.abs();
    let mut current = start;
    while remaining > 0 {
        current += chrono::Duration::days(step);
        let is_weekend = matches!(current.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun);
        if !is_weekend && !holidays.contains(&current) {
            remaining -= 1;
        }
    }
    let dt = current.and_hms_opt(0, 0, 0).unwrap();
    EvalValue::number(ctx.workbook().date_system.datetime_to_serial(&dt))
}
