use rust_decimal::Decimal;
use std::str::FromStr;

use crate::types::Money;

/// A cell value before normalization. Exports are text, but callers that
/// already hold a number can pass it through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Missing,
    Number(Decimal),
    Text(&'a str),
}

impl<'a> From<Option<&'a str>> for RawValue<'a> {
    fn from(value: Option<&'a str>) -> Self {
        match value {
            Some(s) => RawValue::Text(s),
            None => RawValue::Missing,
        }
    }
}

impl From<Decimal> for RawValue<'_> {
    fn from(value: Decimal) -> Self {
        RawValue::Number(value)
    }
}

/// Normalize any raw amount to a finite Decimal. Missing or unparseable → 0.
pub fn normalize_amount(raw: RawValue<'_>) -> Money {
    match raw {
        RawValue::Missing => Decimal::ZERO,
        RawValue::Number(n) => n,
        RawValue::Text(s) => parse_currency_text(s),
    }
}

/// Parse a currency cell such as `$1,234.56` or `(100.00)`.
pub fn parse_currency(raw: Option<&str>) -> Money {
    normalize_amount(RawValue::from(raw))
}

fn parse_currency_text(raw: &str) -> Money {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    // Accounting notation: (123.45) → -123.45
    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };

    let parsed = parse_decimal(body).unwrap_or(Decimal::ZERO);
    if negative {
        -parsed
    } else {
        parsed
    }
}

/// Plain or scientific decimal parse; `None` when neither form applies.
pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
