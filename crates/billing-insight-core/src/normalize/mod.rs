//! Lenient parsers for the raw text found in Brightree CSV exports.
//!
//! Every function here is total: malformed input degrades to a documented
//! default instead of an error, so a single bad cell never aborts a load.

pub mod currency;
pub mod fields;
pub mod proc_code;

pub use currency::{normalize_amount, parse_currency, RawValue};
pub use fields::{parse_billing_period, parse_date, parse_discount_rate, parse_flag, parse_quantity};
pub use proc_code::ProcCodeMap;
