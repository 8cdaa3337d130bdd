//! Numeric coercion for extractor output.
//!
//! The extractor returns amounts as JSON numbers or as strings with
//! thousands separators and sometimes an embedded currency code
//! ("MYR 1,234.56"). Uncoercible values are skipped, never fatal.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Parse an amount string, returning the embedded currency code (if any)
/// and the numeric value.
pub fn parse_amount(s: &str) -> Option<(Option<String>, Decimal)> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Leading alphabetic run is treated as a currency code.
    let currency: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let rest = &trimmed[currency.len()..];

    let cleaned: String = rest
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let value = Decimal::from_str(&cleaned).ok()?;
    let currency = if currency.is_empty() {
        None
    } else {
        Some(currency.to_uppercase())
    };
    Some((currency, value))
}

/// Coerce a loosely-typed JSON value to a decimal. Strings go through
/// [`parse_amount`]; numbers are converted via their display form to avoid
/// binary float artifacts.
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => parse_amount(s).map(|(_, d)| d),
        _ => None,
    }
}
