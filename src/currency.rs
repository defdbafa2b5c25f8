//! Brazilian Real amounts as they appear in sales reports.
//!
//! Accepted shapes, after an optional `R$` prefix and an optional minus sign:
//! - `1234`, `1234,5`, `1.234,56` (decimal comma, dot-grouped thousands)
//! - `1234.5`, `1234.56` (decimal point, as numeric spreadsheet cells render)
//!
//! Anything else is not an amount, and `format_brl` hands it back untouched.

use bigdecimal::num_bigint::Sign;
use bigdecimal::{BigDecimal, RoundingMode};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static DECIMAL_COMMA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<int>[0-9]{1,3}(?:\.[0-9]{3})+|[0-9]+)(?:,(?P<frac>[0-9]+))?$")
        .expect("decimal comma pattern")
});

static DECIMAL_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<int>[0-9]+)\.(?P<frac>[0-9]{1,2})$").expect("decimal point pattern")
});

/// Parses a BRL amount. Returns `None` when `raw` is not one of the accepted shapes.
pub fn parse_brl(raw: &str) -> Option<BigDecimal> {
    let mut rest = raw.trim();
    let mut negative = false;

    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped.trim_start();
    }
    if let Some(stripped) = rest.strip_prefix("R$") {
        rest = stripped.trim_start();
    }
    if !negative {
        if let Some(stripped) = rest.strip_prefix('-') {
            negative = true;
            rest = stripped.trim_start();
        }
    }

    let caps = DECIMAL_COMMA
        .captures(rest)
        .or_else(|| DECIMAL_POINT.captures(rest))?;

    let int_part: String = caps["int"].chars().filter(|c| c.is_ascii_digit()).collect();
    let literal = match caps.name("frac") {
        Some(frac) => format!("{}.{}", int_part, frac.as_str()),
        None => int_part,
    };

    let amount = BigDecimal::from_str(&literal).ok()?;
    Some(if negative { -amount } else { amount })
}

/// Renders an amount as `R$ 1234,56`: two fraction digits, decimal comma,
/// no thousands separator. Amounts that round to zero render unsigned.
pub fn render_brl(amount: &BigDecimal) -> String {
    // `Display` drops the scale of a zero value, so the digits are laid out
    // from the integer mantissa instead.
    let (cents, scale) = amount
        .with_scale_round(2, RoundingMode::HalfEven)
        .as_bigint_and_exponent();
    debug_assert_eq!(scale, 2);

    let magnitude = cents.magnitude();
    let sign = if cents.sign() == Sign::Minus { "-" } else { "" };
    format!(
        "R$ {}{},{:0>2}",
        sign,
        magnitude / 100u32,
        (magnitude % 100u32).to_string()
    )
}

/// Normalizes a currency cell, or returns it unchanged if it does not parse.
pub fn format_brl(raw: &str) -> String {
    match parse_brl(raw) {
        Some(amount) => render_brl(&amount),
        None => {
            tracing::debug!("Currency value kept as-is (unparseable): {:?}", raw);
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_grouped_thousands() {
        assert_eq!(format_brl("1.234,56"), "R$ 1234,56");
        assert_eq!(format_brl("1.234.567,8"), "R$ 1234567,80");
        assert_eq!(format_brl("1.234"), "R$ 1234,00");
    }

    #[test]
    fn formats_prefixed_values() {
        assert_eq!(format_brl("R$ 50,00"), "R$ 50,00");
        assert_eq!(format_brl("R$1.000,5"), "R$ 1000,50");
        assert_eq!(format_brl("  R$ 7  "), "R$ 7,00");
    }

    #[test]
    fn formats_numeric_cells() {
        assert_eq!(format_brl("1234.5"), "R$ 1234,50");
        assert_eq!(format_brl("99.99"), "R$ 99,99");
        assert_eq!(format_brl("0"), "R$ 0,00");
        assert_eq!(format_brl("0.5"), "R$ 0,50");
    }

    #[test]
    fn zero_amounts_keep_two_places() {
        assert_eq!(format_brl("0,00"), "R$ 0,00");
        assert_eq!(format_brl("R$ 0,00"), "R$ 0,00");
        assert_eq!(format_brl("0,004"), "R$ 0,00");
        assert_eq!(format_brl("-0,001"), "R$ 0,00");
        assert_eq!(format_brl("0,05"), "R$ 0,05");
        assert_eq!(format_brl("-0,05"), "R$ -0,05");
    }

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(format_brl("10,005"), "R$ 10,00");
        assert_eq!(format_brl("10,015"), "R$ 10,02");
        assert_eq!(format_brl("10,019"), "R$ 10,02");
        // exact decimal arithmetic, not binary float rounding
        assert_eq!(format_brl("2,675"), "R$ 2,68");
    }

    #[test]
    fn keeps_sign() {
        assert_eq!(format_brl("-R$ 5,00"), "R$ -5,00");
        assert_eq!(format_brl("R$ -12,3"), "R$ -12,30");
    }

    #[test]
    fn garbage_passes_through() {
        assert_eq!(format_brl("abc"), "abc");
        assert_eq!(format_brl(""), "");
        assert_eq!(format_brl("R$"), "R$");
        assert_eq!(format_brl("12,34,56"), "12,34,56");
        assert_eq!(format_brl("1.2345"), "1.2345");
        assert_eq!(format_brl("nan"), "nan");
    }

    #[test]
    fn parse_rejects_exponents_and_words() {
        assert!(parse_brl("1e5").is_none());
        assert!(parse_brl("inf").is_none());
        assert_eq!(parse_brl("1.234,56"), BigDecimal::from_str("1234.56").ok());
    }
}
