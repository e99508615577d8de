pub mod filter;
pub mod metrics;
pub mod reports;
pub mod windows;

pub use filter::{ItemFilter, PayorFilter, ProcCodeSelector};
pub use metrics::{
    aggregate, group_by, mean_collection_rate, AggregateReport, BranchPeriodAggregate, GroupKey,
    Grouping, PricingTotals,
};
pub use reports::{
    billing_period_buckets, key_metrics, line_items, period_summary, retail_ids, search,
    top_proc_codes, BillingPeriodBucket, KeyMetrics, LineItemRow, PeriodSummaryRow, ProcCodeRow,
    SearchHit,
};
pub use windows::TimeWindow;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::classify::PayorSignal;
    use crate::ingest::{ClassifiedItem, LineItem};

    /// Undated invoice item from the "test" source.
    pub fn item(
        id: &str,
        branch: &str,
        retail: bool,
        payment: Decimal,
        balance: Decimal,
        billing_period: u32,
    ) -> ClassifiedItem {
        let level = if retail { "Patient" } else { "Primary" };
        LineItem {
            id: id.to_string(),
            branch: branch.to_string(),
            date: None,
            payor: PayorSignal::Level(Some(level.to_string())),
            payment_amount: payment,
            balance_amount: balance,
            billing_period,
            proc_code: None,
            order_ref: None,
            quantity: Decimal::ONE,
            source_label: "test".to_string(),
            pricing: None,
        }
        .classify()
    }

    pub fn dated(mut item: ClassifiedItem, y: i32, m: u32, d: u32) -> ClassifiedItem {
        item.item.date = NaiveDate::from_ymd_opt(y, m, d);
        item
    }

    pub fn with_source(mut item: ClassifiedItem, source: &str) -> ClassifiedItem {
        item.item.source_label = source.to_string();
        item
    }

    pub fn with_proc(mut item: ClassifiedItem, code: &str) -> ClassifiedItem {
        item.item.proc_code = Some(code.to_string());
        item
    }

    pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }
}
