//! Tabular reports over a filtered item set: the per-source summary, the
//! key-metrics panel, billing-period buckets, retail ids, top procedure
//! codes and record search.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use super::metrics::{accumulate, aggregate, group_by, percentage, BranchPeriodAggregate, Grouping};
use crate::classify::PayorClass;
use crate::error::BillingInsightError;
use crate::ingest::ClassifiedItem;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::BillingInsightResult;

/// Label of the summary row built from all the others.
pub const TOTAL_LABEL: &str = "TOTAL";
/// Display name for items without a procedure code.
pub const UNSPECIFIED_PROC_CODE: &str = "[Unspecified]";
/// Shortest accepted search term, in characters.
pub const MIN_SEARCH_LEN: usize = 2;
/// Most rows a search returns.
pub const MAX_SEARCH_RESULTS: usize = 100;

const CREDITS_NOTE: &str = "* Balance includes credits/overpayments (negative balances)";
const NO_BILLING_NOTE: &str = "N/A indicates no billable activity in the selected period";

// ---------------------------------------------------------------------------
// Period summary
// ---------------------------------------------------------------------------

/// One row of the per-source summary. Money and percentages are rounded
/// to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummaryRow {
    pub label: String,
    pub total_items: u64,
    pub unique_ids: u64,
    pub unique_orders: u64,
    pub retail_items: u64,
    pub insurance_items: u64,
    pub retail_pct: Option<Rate>,
    pub insurance_pct: Option<Rate>,
    pub total_payments: Money,
    pub total_balance: Money,
    pub total_billed: Money,
    pub collection_rate: Option<Rate>,
    pub net_collection_rate: Option<Rate>,
    pub retail_payments: Money,
    pub insurance_payments: Money,
    pub retail_balance: Money,
    pub insurance_balance: Money,
    pub new_items: u64,
    pub recurring_items: u64,
    pub recurring_pct: Option<Rate>,
    pub avg_billing_period: Option<Decimal>,
    pub max_billing_period: u32,
    pub total_quantity: Decimal,
}

impl PeriodSummaryRow {
    fn from_aggregate(label: String, agg: &BranchPeriodAggregate) -> Self {
        PeriodSummaryRow {
            label,
            total_items: agg.item_count,
            unique_ids: agg.invoice_count,
            unique_orders: agg.order_count,
            retail_items: agg.retail_item_count,
            insurance_items: agg.insurance_item_count(),
            retail_pct: round_opt(agg.retail_mix()),
            insurance_pct: round_opt(agg.insurance_mix()),
            total_payments: round2(agg.total_payments),
            total_balance: round2(agg.total_balance),
            total_billed: round2(agg.gross_total_billed()),
            collection_rate: round_opt(agg.collection_rate()),
            net_collection_rate: round_opt(agg.net_collection_rate()),
            retail_payments: round2(agg.retail_payments),
            insurance_payments: round2(agg.insurance_payments),
            retail_balance: round2(agg.retail_balance),
            insurance_balance: round2(agg.insurance_balance),
            new_items: agg.new_item_count(),
            recurring_items: agg.recurring_item_count,
            recurring_pct: round_opt(agg.recurring_ratio()),
            avg_billing_period: round_opt(agg.avg_billing_period()),
            max_billing_period: agg.max_billing_period,
            total_quantity: round2(agg.total_quantity),
        }
    }
}

/// One row per source label (in label order) followed by a `TOTAL` row.
///
/// The total is the sum of the source rows, so an id appearing under two
/// sources is counted once per source.
pub fn period_summary<'a, I>(items: I) -> BillingInsightResult<ComputationOutput<Vec<PeriodSummaryRow>>>
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    let start = Instant::now();
    let groups = group_by(items, Grouping::Source);
    if groups.is_empty() {
        return Err(BillingInsightError::InsufficientData(
            "no line items to summarize".into(),
        ));
    }

    let mut warnings = Vec::new();
    let mut total = BranchPeriodAggregate::default();
    let mut rows = Vec::with_capacity(groups.len() + 1);
    for (key, agg) in &groups {
        if agg.has_credits {
            warnings.push(format!("{}: balance includes credits (negative balances)", key));
        }
        total.merge(agg);
        rows.push(PeriodSummaryRow::from_aggregate(key.to_string(), agg));
    }
    rows.push(PeriodSummaryRow::from_aggregate(TOTAL_LABEL.to_string(), &total));

    let item_count = total.item_count as usize;
    let assumptions = serde_json::json!({
        "grouping": "source",
        "collection_rate": "payments / (payments + |balance|), N/A when nothing billed",
        "recurring": "billing period > 1",
    });
    Ok(with_metadata(
        "Per-source billing summary with TOTAL row",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        item_count,
        rows,
    ))
}

// ---------------------------------------------------------------------------
// Key metrics
// ---------------------------------------------------------------------------

/// Headline figures for the current selection. Ratios are rounded to two
/// decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub total_items: u64,
    pub total_payments: Money,
    pub total_balance: Money,
    pub collection_rate: Option<Rate>,
    pub net_collection_rate: Option<Rate>,
    pub unique_ids: u64,
    pub retail_items: u64,
    pub insurance_items: u64,
    pub retail_payments: Money,
    pub insurance_payments: Money,
    pub retail_mix: Option<Rate>,
    pub recurring_pct: Option<Rate>,
    pub avg_billing_period: Option<Decimal>,
    pub has_credits: bool,
    /// Footnotes for the figures above.
    pub notes: Vec<String>,
}

pub fn key_metrics<'a, I>(items: I) -> KeyMetrics
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    let agg = aggregate(items);
    let mut notes = Vec::new();
    if agg.has_credits {
        notes.push(CREDITS_NOTE.to_string());
    }
    if agg.collection_rate().is_none() {
        notes.push(NO_BILLING_NOTE.to_string());
    }
    KeyMetrics {
        total_items: agg.item_count,
        total_payments: agg.total_payments,
        total_balance: agg.total_balance,
        collection_rate: round_opt(agg.collection_rate()),
        net_collection_rate: round_opt(agg.net_collection_rate()),
        unique_ids: agg.invoice_count,
        retail_items: agg.retail_item_count,
        insurance_items: agg.insurance_item_count(),
        retail_payments: agg.retail_payments,
        insurance_payments: agg.insurance_payments,
        retail_mix: round_opt(agg.retail_mix()),
        recurring_pct: round_opt(agg.recurring_ratio()),
        avg_billing_period: round_opt(agg.avg_billing_period()),
        has_credits: agg.has_credits,
        notes,
    }
}

// ---------------------------------------------------------------------------
// Billing-period buckets
// ---------------------------------------------------------------------------

/// Rental billing-period ranges, inclusive. `None` is open-ended.
const PERIOD_BUCKETS: [(u32, Option<u32>, &str); 7] = [
    (1, Some(1), "Period 1 (New)"),
    (2, Some(3), "Period 2-3"),
    (4, Some(6), "Period 4-6"),
    (7, Some(12), "Period 7-12"),
    (13, Some(24), "Period 13-24"),
    (25, Some(36), "Period 25-36"),
    (37, None, "Period 37+"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingPeriodBucket {
    pub label: String,
    pub period_start: u32,
    pub period_end: Option<u32>,
    pub item_count: u64,
    /// Share of all items in the selection.
    pub item_pct: Option<Rate>,
    pub total_payments: Money,
    /// Share of all payments; `None` when total payments are not positive.
    pub payment_pct: Option<Rate>,
    pub retail_items: u64,
    pub insurance_items: u64,
    pub avg_payment: Money,
}

/// Distribution of items over billing-period buckets. Empty buckets are
/// left out.
pub fn billing_period_buckets<'a, I>(items: I) -> Vec<BillingPeriodBucket>
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    let items: Vec<&ClassifiedItem> = items.into_iter().collect();
    let all_count = Decimal::from(items.len() as u64);
    let all_payments = items
        .iter()
        .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.payment_amount));

    PERIOD_BUCKETS
        .iter()
        .filter_map(|&(lo, hi, label)| {
            let members: Vec<&ClassifiedItem> = items
                .iter()
                .copied()
                .filter(|i| i.billing_period >= lo && hi.map_or(true, |hi| i.billing_period <= hi))
                .collect();
            if members.is_empty() {
                return None;
            }
            let agg = aggregate(members);
            let count = Decimal::from(agg.item_count);
            Some(BillingPeriodBucket {
                label: label.to_string(),
                period_start: lo,
                period_end: hi,
                item_count: agg.item_count,
                item_pct: round_opt(percentage(count, all_count)),
                total_payments: round2(agg.total_payments),
                payment_pct: round_opt(percentage(agg.total_payments, all_payments)),
                retail_items: agg.retail_item_count,
                insurance_items: agg.insurance_item_count(),
                avg_payment: round2(agg.total_payments / count),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Retail ids
// ---------------------------------------------------------------------------

/// Sorted distinct ids of retail items.
pub fn retail_ids<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    items
        .into_iter()
        .filter(|i| i.is_retail())
        .map(|i| i.id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Procedure codes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcCodeRow {
    pub proc_code: String,
    pub item_count: u64,
    pub total_payments: Money,
    /// Payments per branch for this code.
    pub by_branch: BTreeMap<String, Money>,
}

/// The `n` procedure codes with the highest payments, highest first.
/// Items without a code are pooled under `[Unspecified]`.
pub fn top_proc_codes<'a, I>(items: I, n: usize) -> Vec<ProcCodeRow>
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    let mut by_code: BTreeMap<String, ProcCodeRow> = BTreeMap::new();
    for item in items {
        let code = item
            .proc_code
            .clone()
            .unwrap_or_else(|| UNSPECIFIED_PROC_CODE.to_string());
        let row = by_code.entry(code.clone()).or_insert_with(|| ProcCodeRow {
            proc_code: code,
            item_count: 0,
            total_payments: Decimal::ZERO,
            by_branch: BTreeMap::new(),
        });
        row.item_count += 1;
        accumulate(&mut row.total_payments, item.payment_amount);
        accumulate(
            row.by_branch.entry(item.branch.clone()).or_insert(Decimal::ZERO),
            item.payment_amount,
        );
    }

    let mut rows: Vec<ProcCodeRow> = by_code.into_values().collect();
    // Stable sort keeps code order among equal totals.
    rows.sort_by(|a, b| b.total_payments.cmp(&a.total_payments));
    rows.truncate(n);
    rows
}

// ---------------------------------------------------------------------------
// Line-item export
// ---------------------------------------------------------------------------

/// One line item flattened for export. Every field is always present so
/// CSV columns line up across invoice and sales-order rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemRow {
    pub source: String,
    pub id: String,
    pub order_ref: Option<String>,
    pub date: Option<NaiveDate>,
    pub branch: String,
    pub payor: String,
    pub class: PayorClass,
    pub proc_code: Option<String>,
    pub billing_period: u32,
    pub quantity: Decimal,
    pub payment_amount: Money,
    pub balance_amount: Money,
    /// `payment / (payment + |balance|)`; `None` when nothing was billed.
    pub collection_rate: Option<Rate>,
    /// Discounted allowed amount, sales orders only.
    pub net_allow: Option<Money>,
}

impl From<&ClassifiedItem> for LineItemRow {
    fn from(item: &ClassifiedItem) -> Self {
        let billed = item
            .payment_amount
            .saturating_add(item.balance_amount.abs());
        LineItemRow {
            source: item.source_label.clone(),
            id: item.id.clone(),
            order_ref: item.order_ref.clone(),
            date: item.date,
            branch: item.branch.clone(),
            payor: item.payor.label(),
            class: item.class,
            proc_code: item.proc_code.clone(),
            billing_period: item.billing_period,
            quantity: item.quantity,
            payment_amount: item.payment_amount,
            balance_amount: item.balance_amount,
            collection_rate: round_opt(percentage(item.payment_amount, billed)),
            net_allow: item.pricing.as_ref().map(|p| round2(p.net_allow())),
        }
    }
}

/// Every selected line item in load order, uncapped.
pub fn line_items<'a, I>(items: I) -> Vec<LineItemRow>
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    items.into_iter().map(LineItemRow::from).collect()
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub order_ref: Option<String>,
    pub date: Option<NaiveDate>,
    pub branch: String,
    pub payor: String,
    pub proc_code: Option<String>,
    pub payment_amount: Money,
    pub balance_amount: Money,
    pub source: String,
}

impl From<&ClassifiedItem> for SearchHit {
    fn from(item: &ClassifiedItem) -> Self {
        SearchHit {
            id: item.id.clone(),
            order_ref: item.order_ref.clone(),
            date: item.date,
            branch: item.branch.clone(),
            payor: item.payor.label(),
            proc_code: item.proc_code.clone(),
            payment_amount: item.payment_amount,
            balance_amount: item.balance_amount,
            source: item.source_label.clone(),
        }
    }
}

/// Case-insensitive substring search over ids and order references.
/// Terms shorter than two characters match nothing. Identical hits are
/// collapsed and at most 100 are returned.
pub fn search<'a, I>(items: I, term: &str) -> Vec<SearchHit>
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    let needle = term.trim().to_lowercase();
    if needle.chars().count() < MIN_SEARCH_LEN {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = Vec::new();
    for item in items {
        let matched = item.id.to_lowercase().contains(&needle)
            || item
                .order_ref
                .as_deref()
                .is_some_and(|o| o.to_lowercase().contains(&needle));
        if !matched {
            continue;
        }
        let hit = SearchHit::from(item);
        if !hits.contains(&hit) {
            hits.push(hit);
        }
        if hits.len() == MAX_SEARCH_RESULTS {
            break;
        }
    }
    hits
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}

fn round_opt(value: Option<Decimal>) -> Option<Decimal> {
    value.map(round2)
}
