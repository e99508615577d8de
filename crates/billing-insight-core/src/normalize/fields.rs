use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::currency::parse_decimal;
use crate::types::Rate;

/// Date-time layouts seen in Brightree exports, tried in order.
const DATETIME_FORMATS: [&str; 3] = [
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// Insurance flag cell. `"true"` (any case) or a nonzero number is set;
/// blanks, `"false"` and anything unrecognised are unset.
pub fn parse_flag(raw: Option<&str>) -> bool {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };
    if s.eq_ignore_ascii_case("true") {
        return true;
    }
    match parse_decimal(s) {
        Some(n) => !n.is_zero(),
        None => false,
    }
}

/// Rental billing period (1 = first/one-time charge). Fractions are
/// truncated; missing, unparseable or non-positive values mean period 1.
pub fn parse_billing_period(raw: Option<&str>) -> u32 {
    raw.and_then(parse_decimal)
        .and_then(|d| d.trunc().to_u32())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Discount percentage (10 = 10%) to a fraction (0.10). Unparseable → 0.
pub fn parse_discount_rate(raw: Option<&str>) -> Rate {
    raw.and_then(parse_decimal)
        .map(|pct| pct / dec!(100))
        .unwrap_or(Decimal::ZERO)
}

/// Line quantity. Unparseable → 0.
pub fn parse_quantity(raw: Option<&str>) -> Decimal {
    raw.and_then(parse_decimal).unwrap_or(Decimal::ZERO)
}

/// Calendar date from any of the export layouts. `None` when nothing matches.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let s = raw.map(str::trim).filter(|s| !s.is_empty())?;

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_flag_true_variants() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some(" TRUE ")));
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("2.0")));
    }

    #[test]
    fn test_flag_false_variants() {
        assert!(!parse_flag(None));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(Some("False")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(Some("maybe")));
    }

    #[test]
    fn test_billing_period_defaults_to_one() {
        assert_eq!(parse_billing_period(None), 1);
        assert_eq!(parse_billing_period(Some("")), 1);
        assert_eq!(parse_billing_period(Some("abc")), 1);
        assert_eq!(parse_billing_period(Some("0")), 1);
        assert_eq!(parse_billing_period(Some("-3")), 1);
    }

    #[test]
    fn test_billing_period_parses() {
        assert_eq!(parse_billing_period(Some("1")), 1);
        assert_eq!(parse_billing_period(Some("13")), 13);
        assert_eq!(parse_billing_period(Some("4.0")), 4);
    }

    #[test]
    fn test_discount_rate() {
        assert_eq!(parse_discount_rate(Some("10")), dec!(0.10));
        assert_eq!(parse_discount_rate(Some("100")), Decimal::ONE);
        assert_eq!(parse_discount_rate(Some("oops")), Decimal::ZERO);
        assert_eq!(parse_discount_rate(None), Decimal::ZERO);
    }

    #[test]
    fn test_quantity() {
        assert_eq!(parse_quantity(Some("3")), dec!(3));
        assert_eq!(parse_quantity(Some("")), Decimal::ZERO);
    }

    #[test]
    fn test_date_us_with_time_12h() {
        assert_eq!(parse_date(Some("9/29/2020 3:06:15 AM")), Some(ymd(2020, 9, 29)));
    }

    #[test]
    fn test_date_us_with_time_24h() {
        assert_eq!(parse_date(Some("9/29/2020 15:06:15")), Some(ymd(2020, 9, 29)));
    }

    #[test]
    fn test_date_only_layouts() {
        assert_eq!(parse_date(Some("12/31/2025")), Some(ymd(2025, 12, 31)));
        assert_eq!(parse_date(Some("2025-12-31")), Some(ymd(2025, 12, 31)));
        assert_eq!(parse_date(Some("2025-12-31 08:00:00")), Some(ymd(2025, 12, 31)));
    }

    #[test]
    fn test_date_unparseable() {
        assert_eq!(parse_date(Some("yesterday")), None);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(None), None);
    }
}
