//! Raw export rows → classified line items.

pub mod line_item;
pub mod records;

pub use line_item::{ClassifiedItem, LineItem, OrderPricing};
pub use records::{InvoiceRecord, SalesOrderRecord};

use crate::classify::PayorSignal;
use crate::normalize::{
    parse_billing_period, parse_currency, parse_date, parse_discount_rate, parse_flag,
    parse_quantity, ProcCodeMap,
};

/// Branch name used when the export leaves it blank.
pub const UNKNOWN_BRANCH: &str = "Unknown";

/// Per-file context applied to every record.
#[derive(Debug, Clone, Copy)]
pub struct IngestContext<'a> {
    pub source_label: &'a str,
    pub proc_codes: &'a ProcCodeMap,
}

/// A row type that can become a [`LineItem`].
pub trait RawRecord {
    /// `None` when the row has no usable identifier.
    fn to_line_item(&self, ctx: &IngestContext<'_>) -> Option<LineItem>;
}

/// Items kept and rows dropped from one ingest pass.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub items: Vec<ClassifiedItem>,
    pub skipped: usize,
}

impl IngestOutcome {
    pub fn extend(&mut self, other: IngestOutcome) {
        self.items.extend(other.items);
        self.skipped += other.skipped;
    }
}

/// Normalize and classify a batch of rows. Rows without an identifier are
/// counted in `skipped`; nothing else can reject a row.
pub fn ingest_records<R, I>(records: I, ctx: &IngestContext<'_>) -> IngestOutcome
where
    R: RawRecord,
    I: IntoIterator<Item = R>,
{
    let mut outcome = IngestOutcome::default();
    for record in records {
        match record.to_line_item(ctx) {
            Some(item) => outcome.items.push(item.classify()),
            None => outcome.skipped += 1,
        }
    }
    if outcome.skipped > 0 {
        log::warn!(
            "{}: skipped {} row(s) without an identifier",
            ctx.source_label,
            outcome.skipped
        );
    }
    outcome
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn branch_name(value: &Option<String>) -> String {
    non_blank(value).unwrap_or(UNKNOWN_BRANCH).to_string()
}

impl RawRecord for InvoiceRecord {
    fn to_line_item(&self, ctx: &IngestContext<'_>) -> Option<LineItem> {
        let id = non_blank(&self.number)?.to_string();
        let date = parse_date(self.date_of_service.as_deref())
            .or_else(|| parse_date(self.date_created.as_deref()));

        Some(LineItem {
            id,
            branch: branch_name(&self.branch),
            date,
            payor: PayorSignal::Level(self.payor_level.clone()),
            payment_amount: parse_currency(self.payments.as_deref()),
            balance_amount: parse_currency(self.balance.as_deref()),
            billing_period: parse_billing_period(self.billing_period.as_deref()),
            proc_code: ctx.proc_codes.standardize(self.proc_code.as_deref()),
            order_ref: non_blank(&self.so_number).map(String::from),
            quantity: parse_quantity(self.qty.as_deref()),
            source_label: ctx.source_label.to_string(),
            pricing: None,
        })
    }
}

impl RawRecord for SalesOrderRecord {
    fn to_line_item(&self, ctx: &IngestContext<'_>) -> Option<LineItem> {
        let id = non_blank(&self.number)?.to_string();
        let date = parse_date(self.date_created_iso.as_deref())
            .or_else(|| parse_date(self.date_created.as_deref()));

        let pricing = OrderPricing {
            charge: parse_currency(self.charge.as_deref()),
            allow: parse_currency(self.allow.as_deref()),
            discount_rate: parse_discount_rate(self.discount_pct.as_deref()),
        };

        Some(LineItem {
            id,
            branch: branch_name(&self.branch),
            date,
            payor: PayorSignal::Flags {
                primary: parse_flag(self.flag_primary.as_deref()),
                secondary: parse_flag(self.flag_secondary.as_deref()),
                tertiary: parse_flag(self.flag_tertiary.as_deref()),
            },
            // Sales orders carry no payment/balance; the discounted allowed
            // amount is the revenue recognised for the line.
            payment_amount: pricing.net_allow(),
            balance_amount: rust_decimal::Decimal::ZERO,
            billing_period: 1,
            proc_code: ctx.proc_codes.standardize(self.proc_code.as_deref()),
            order_ref: None,
            quantity: parse_quantity(self.qty.as_deref()),
            source_label: ctx.source_label.to_string(),
            pricing: Some(pricing),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PayorClass;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ctx(map: &ProcCodeMap) -> IngestContext<'_> {
        IngestContext {
            source_label: "2024",
            proc_codes: map,
        }
    }

    fn invoice(number: &str, level: &str, payments: &str, balance: &str) -> InvoiceRecord {
        InvoiceRecord {
            number: Some(number.into()),
            branch: Some(" North ".into()),
            date_of_service: Some("3/15/2024 10:00:00 AM".into()),
            payor_level: Some(level.into()),
            payments: Some(payments.into()),
            balance: Some(balance.into()),
            billing_period: Some("3".into()),
            proc_code: Some("e0601".into()),
            so_number: Some("SO-77".into()),
            qty: Some("2".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_invoice_row_normalized() {
        let map = ProcCodeMap::default();
        let item = invoice("INV-1", "Patient", "$1,000.00", "(25.00)")
            .to_line_item(&ctx(&map))
            .unwrap();
        assert_eq!(item.id, "INV-1");
        assert_eq!(item.branch, "North");
        assert_eq!(item.date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(item.payment_amount, dec!(1000.00));
        assert_eq!(item.balance_amount, dec!(-25.00));
        assert_eq!(item.billing_period, 3);
        assert_eq!(item.proc_code.as_deref(), Some("E0601"));
        assert_eq!(item.order_ref.as_deref(), Some("SO-77"));
        assert_eq!(item.source_label, "2024");
    }

    #[test]
    fn test_invoice_falls_back_to_created_date() {
        let map = ProcCodeMap::default();
        let mut rec = invoice("INV-2", "Primary", "0", "0");
        rec.date_of_service = Some("not a date".into());
        rec.date_created = Some("2024-01-02".into());
        let item = rec.to_line_item(&ctx(&map)).unwrap();
        assert_eq!(item.date, NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn test_blank_branch_is_unknown() {
        let map = ProcCodeMap::default();
        let mut rec = invoice("INV-3", "Primary", "0", "0");
        rec.branch = Some("   ".into());
        assert_eq!(rec.to_line_item(&ctx(&map)).unwrap().branch, UNKNOWN_BRANCH);
    }

    #[test]
    fn test_sales_order_uses_discounted_allow() {
        let map = ProcCodeMap::default();
        let rec = SalesOrderRecord {
            number: Some("1001".into()),
            date_created: Some("6/1/2025".into()),
            discount_pct: Some("10".into()),
            charge: Some("$200.00".into()),
            allow: Some("$150.00".into()),
            flag_primary: Some("False".into()),
            ..Default::default()
        };
        let item = rec.to_line_item(&ctx(&map)).unwrap();
        assert_eq!(item.payment_amount, dec!(135));
        assert_eq!(item.balance_amount, Decimal::ZERO);
        assert_eq!(item.billing_period, 1);
        assert_eq!(item.branch, UNKNOWN_BRANCH);
        assert_eq!(item.clone().classify().class, PayorClass::Retail);
    }

    #[test]
    fn test_rows_without_id_are_skipped() {
        let map = ProcCodeMap::default();
        let rows = vec![
            invoice("INV-1", "Patient", "10", "0"),
            InvoiceRecord::default(),
            invoice("  ", "Primary", "10", "0"),
            invoice("INV-2", "Primary", "garbage", "0"),
        ];
        let out = ingest_records(rows, &ctx(&map));
        assert_eq!(out.items.len(), 2);
        assert_eq!(out.skipped, 2);
        assert!(out.items[0].is_retail());
        assert!(out.items[1].is_insurance());
        assert_eq!(out.items[1].payment_amount, Decimal::ZERO);
    }
}
