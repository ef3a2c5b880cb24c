//! Numeric section rendering: placeholders, grouping, percent scaling,
//! comma-scaling, scientific notation, and the `General` fallback
//! (`spec.md` §4.7).

use crate::pattern::Token;

/// `General`: up to 11 significant digits in `[1e-9, 1e11)`, else
/// scientific with 14 significant digits and `E+n`/`E-n`.
pub fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let abs = value.abs();
    if (1e-9..1e11).contains(&abs) {
        let mut s = format_significant(value, 11);
        trim_trailing_fraction_zeros(&mut s);
        s
    } else {
        format_scientific_general(value, 14)
    }
}

fn format_significant(value: f64, sig_digits: u32) -> String {
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (sig_digits as i32 - 1 - magnitude).max(0) as usize;
    format!("{value:.decimals$}")
}

fn format_scientific_general(value: f64, sig_digits: u32) -> String {
    let exponent = value.abs().log10().floor() as i32;
    let mantissa = value / 10f64.powi(exponent);
    let decimals = (sig_digits - 1) as usize;
    let mut mantissa_str = format!("{mantissa:.decimals$}");
    trim_trailing_fraction_zeros(&mut mantissa_str);
    let sign = if exponent >= 0 { "+" } else { "-" };
    format!("{mantissa_str}E{sign}{}", exponent.abs())
}

fn trim_trailing_fraction_zeros(s: &mut String) {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
}

pub fn round_half_away_from_zero(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    if value >= 0.0 { (value * factor + 0.5).floor() / factor } else { (value * factor - 0.5).ceil() / factor }
}

fn group_integer(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = Vec::new();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(b',');
        }
        out.push(*b);
    }
    String::from_utf8(out).unwrap()
}

struct Shape {
    int_required: usize,
    frac_tokens: Vec<Token>,
    grouped: bool,
    comma_scale: u32,
    percent_count: u32,
    scientific: Option<(bool, usize)>,
}

fn analyze(tokens: &[Token]) -> Shape {
    let mut int_required = 0;
    let mut frac_tokens = Vec::new();
    let mut grouped = false;
    let mut percent_count = 0;
    let mut scientific = None;
    let mut seen_decimal = false;
    let mut trailing_commas = 0u32;
    let mut last_was_int_digit = false;

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Digit0 if !seen_decimal => {
                int_required += 1;
                last_was_int_digit = true;
            }
            Token::DigitHash | Token::DigitQuestion if !seen_decimal => {
                last_was_int_digit = true;
            }
            Token::Comma if !seen_decimal => {
                trailing_commas += 1;
                if last_was_int_digit {
                    grouped = true;
                }
            }
            Token::Decimal => {
                seen_decimal = true;
                trailing_commas = 0;
            }
            Token::Digit0 | Token::DigitHash | Token::DigitQuestion if seen_decimal => {
                frac_tokens.push(tokens[i].clone());
            }
            Token::Percent => percent_count += 1,
            Token::EPlus | Token::EMinus => {
                let force_sign = matches!(tokens[i], Token::EPlus);
                let mut exp_digits = 0;
                let mut j = i + 1;
                while j < tokens.len() && matches!(tokens[j], Token::Digit0) {
                    exp_digits += 1;
                    j += 1;
                }
                scientific = Some((force_sign, exp_digits.max(1)));
                // Skip the exponent's own `0` placeholders so they aren't
                // mistaken for mantissa fraction digits below.
                i = j - 1;
            }
            _ => last_was_int_digit = false,
        }
        i += 1;
    }

    // Trailing commas with no digit placeholder following them (only
    // literals/end-of-pattern after) scale the value down by 1000 each,
    // rather than requesting a grouping separator.
    let comma_scale = if !grouped { trailing_commas } else { 0 };

    Shape { int_required, frac_tokens, grouped, comma_scale, percent_count, scientific }
}

/// Render `value` against a numeric section's tokens (not `General`, not a
/// date/time pattern). `auto_minus` controls whether a negative value gets
/// an implicit leading `-` -- true only when this section is doing double
/// duty for negatives (a single-section or 1-section-fallback pattern);
/// an explicit negative section is expected to encode its own sign
/// handling (a literal `-`, parentheses, ...).
pub fn render_numeric(tokens: &[Token], value: f64, auto_minus: bool) -> String {
    let shape = analyze(tokens);

    let mut scaled = value.abs();
    if shape.percent_count > 0 {
        scaled *= 100f64.powi(shape.percent_count as i32);
    }
    if shape.comma_scale > 0 {
        scaled /= 1000f64.powi(shape.comma_scale as i32);
    }

    let exponent = match shape.scientific {
        Some(_) if scaled != 0.0 => scaled.log10().floor() as i32,
        _ => 0,
    };
    let mantissa = if shape.scientific.is_some() && scaled != 0.0 { scaled / 10f64.powi(exponent) } else { scaled };

    let frac_len = shape.frac_tokens.len();
    let rounded = round_half_away_from_zero(mantissa, frac_len as i32);
    let int_part = rounded.trunc() as i64;
    let frac_part = rounded - int_part as f64;

    let mut int_str = int_part.to_string();
    while int_str.len() < shape.int_required {
        int_str.insert(0, '0');
    }
    if shape.grouped {
        int_str = group_integer(&int_str);
    }

    let frac_str = if frac_len > 0 {
        let scaled_frac = (frac_part * 10f64.powi(frac_len as i32)).round() as i64;
        let mut digits = scaled_frac.to_string();
        while digits.len() < frac_len {
            digits.insert(0, '0');
        }
        digits
    } else {
        String::new()
    };

    let mut out = String::new();
    if auto_minus && value < 0.0 {
        out.push('-');
    }

    let mut emitted_int = false;
    let mut emitted_frac = false;
    let mut emitted_sci = false;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Digit0 | Token::DigitHash | Token::DigitQuestion => {
                let in_fraction = emitted_frac_region(tokens, i);
                if in_fraction {
                    if !emitted_frac {
                        out.push_str(&frac_str);
                        emitted_frac = true;
                    }
                } else if !emitted_int {
                    out.push_str(&int_str);
                    emitted_int = true;
                }
            }
            Token::Decimal => {
                if !frac_str.is_empty() {
                    out.push('.');
                }
            }
            Token::Comma => {}
            Token::Percent => out.push('%'),
            Token::EPlus | Token::EMinus => {
                if !emitted_sci {
                    if let Some((force_sign, exp_digits)) = shape.scientific {
                        let mut exp_str = exponent.unsigned_abs().to_string();
                        while exp_str.len() < exp_digits {
                            exp_str.insert(0, '0');
                        }
                        out.push('E');
                        out.push(if exponent < 0 { '-' } else if force_sign { '+' } else { '+' });
                        out.push_str(&exp_str);
                    }
                    emitted_sci = true;
                }
            }
            Token::Literal(c) => out.push(*c),
            Token::At | Token::DateTime(_) => {}
        }
        i += 1;
    }
    out
}

fn emitted_frac_region(tokens: &[Token], index: usize) -> bool {
    tokens[..index].iter().any(|t| matches!(t, Token::Decimal))
}
