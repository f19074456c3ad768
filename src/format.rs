//! Formatting helpers for prices and plain numbers shown on the page.

/// Non-breaking space placed between the amount and the currency sign.
const NBSP: char = '\u{a0}';

/// Rounds half-way cases towards positive infinity, like `Math.round`.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 { floor + 1.0 } else { floor }
}

/// Formats an amount in euros the way the Spanish locale does with no decimals.
///
/// Thousands separators (`.`) only appear from five integer digits upwards,
/// so `1196` stays `1196 €` while `12345` becomes `12.345 €`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn format_eur(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}{NBSP}€", format_number(value));
    }

    let rounded = value.abs().round();
    let digits = (rounded as u64).to_string();
    let negative = value < 0.0 && rounded > 0.0;

    let grouped = if digits.len() >= 5 {
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push('.');
            }
            out.push(ch);
        }
        out
    } else {
        digits
    };

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}{NBSP}€")
}

/// Renders a number the way the page prints control values: integral values
/// without a fractional part, everything else in shortest form.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return (value as i64).to_string();
    }
    format!("{value}")
}
