//! Per-group sums and the ratios derived from them.
//!
//! Collection rate uses `payments / total_billed`. Two billed bases are
//! kept because balances can be negative (credits, overpayments):
//! gross adds `|balance|`, net adds only positive balances. A zero base
//! yields `None`, never a default of 100%.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::ingest::ClassifiedItem;
use crate::types::{Money, Rate};

/// Charge/allow totals for sales-order groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingTotals {
    pub gross_charge: Money,
    pub net_charge: Money,
    pub gross_allow: Money,
    pub net_allow: Money,
}

impl PricingTotals {
    /// Allowed amount given away through order discounts.
    pub fn total_discount(&self) -> Money {
        self.gross_allow.saturating_sub(self.net_allow)
    }
}

/// Sums for one (branch, time-window) cell, or any other grouping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchPeriodAggregate {
    pub total_payments: Money,
    pub total_balance: Money,
    /// Σ |balance| per item.
    pub absolute_balance: Money,
    /// Σ max(balance, 0) per item.
    pub positive_balance: Money,
    pub item_count: u64,
    pub retail_item_count: u64,
    /// Distinct invoice (or order) ids.
    pub invoice_count: u64,
    /// Distinct sales-order references.
    pub order_count: u64,
    /// Items with billing period > 1.
    pub recurring_item_count: u64,
    pub retail_payments: Money,
    pub insurance_payments: Money,
    pub retail_balance: Money,
    pub insurance_balance: Money,
    /// Items billing more than one insurance level.
    pub multi_payor_item_count: u64,
    pub total_quantity: Decimal,
    pub billing_period_sum: u64,
    pub max_billing_period: u32,
    /// At least one negative balance was seen.
    pub has_credits: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PricingTotals>,
}

impl BranchPeriodAggregate {
    pub fn insurance_item_count(&self) -> u64 {
        self.item_count - self.retail_item_count
    }

    /// New (period 1) items.
    pub fn new_item_count(&self) -> u64 {
        self.item_count - self.recurring_item_count
    }

    /// `payments + Σ|balance|`
    pub fn gross_total_billed(&self) -> Money {
        self.total_payments.saturating_add(self.absolute_balance)
    }

    /// `payments + Σ max(balance, 0)`
    pub fn net_total_billed(&self) -> Money {
        self.total_payments.saturating_add(self.positive_balance)
    }

    /// Payments as a percentage of gross billed; `None` when nothing was billed.
    pub fn collection_rate(&self) -> Option<Rate> {
        percentage(self.total_payments, self.gross_total_billed())
    }

    /// Payments as a percentage of net billed; `None` when nothing was billed.
    pub fn net_collection_rate(&self) -> Option<Rate> {
        percentage(self.total_payments, self.net_total_billed())
    }

    /// Retail share of items, in percent.
    pub fn retail_mix(&self) -> Option<Rate> {
        percentage(
            Decimal::from(self.retail_item_count),
            Decimal::from(self.item_count),
        )
    }

    pub fn insurance_mix(&self) -> Option<Rate> {
        percentage(
            Decimal::from(self.insurance_item_count()),
            Decimal::from(self.item_count),
        )
    }

    /// Recurring share of items, in percent.
    pub fn recurring_ratio(&self) -> Option<Rate> {
        percentage(
            Decimal::from(self.recurring_item_count),
            Decimal::from(self.item_count),
        )
    }

    pub fn avg_billing_period(&self) -> Option<Decimal> {
        if self.item_count == 0 {
            None
        } else {
            Some(Decimal::from(self.billing_period_sum) / Decimal::from(self.item_count))
        }
    }

    /// Fold another group's sums into this one. Distinct-id counts are
    /// added, so ids shared between the two groups are counted twice;
    /// callers combining overlapping groups should re-aggregate items.
    pub fn merge(&mut self, other: &BranchPeriodAggregate) {
        accumulate(&mut self.total_payments, other.total_payments);
        accumulate(&mut self.total_balance, other.total_balance);
        accumulate(&mut self.absolute_balance, other.absolute_balance);
        accumulate(&mut self.positive_balance, other.positive_balance);
        self.item_count += other.item_count;
        self.retail_item_count += other.retail_item_count;
        self.invoice_count += other.invoice_count;
        self.order_count += other.order_count;
        self.recurring_item_count += other.recurring_item_count;
        accumulate(&mut self.retail_payments, other.retail_payments);
        accumulate(&mut self.insurance_payments, other.insurance_payments);
        accumulate(&mut self.retail_balance, other.retail_balance);
        accumulate(&mut self.insurance_balance, other.insurance_balance);
        self.multi_payor_item_count += other.multi_payor_item_count;
        accumulate(&mut self.total_quantity, other.total_quantity);
        self.billing_period_sum += other.billing_period_sum;
        self.max_billing_period = self.max_billing_period.max(other.max_billing_period);
        self.has_credits |= other.has_credits;
        self.pricing = match (self.pricing.take(), &other.pricing) {
            (Some(mut mine), Some(theirs)) => {
                accumulate(&mut mine.gross_charge, theirs.gross_charge);
                accumulate(&mut mine.net_charge, theirs.net_charge);
                accumulate(&mut mine.gross_allow, theirs.gross_allow);
                accumulate(&mut mine.net_allow, theirs.net_allow);
                Some(mine)
            }
            (mine, theirs) => mine.or_else(|| theirs.clone()),
        };
    }
}

/// `part / whole × 100`, or `None` for a zero (or negative) whole or a
/// ratio too large to represent.
pub(crate) fn percentage(part: Decimal, whole: Decimal) -> Option<Rate> {
    if whole <= Decimal::ZERO {
        return None;
    }
    part.checked_div(whole)?.checked_mul(dec!(100))
}

/// Saturating `+=`; sums of extreme amounts pin at the Decimal bounds.
pub(crate) fn accumulate(total: &mut Decimal, amount: Decimal) {
    *total = total.saturating_add(amount);
}

/// Sum a set of items into one aggregate.
pub fn aggregate<'a, I>(items: I) -> BranchPeriodAggregate
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    let mut agg = BranchPeriodAggregate::default();
    let mut ids: HashSet<&'a str> = HashSet::new();
    let mut orders: HashSet<&'a str> = HashSet::new();

    for item in items {
        let payment = item.payment_amount;
        let balance = item.balance_amount;

        agg.item_count += 1;
        accumulate(&mut agg.total_payments, payment);
        accumulate(&mut agg.total_balance, balance);
        accumulate(&mut agg.absolute_balance, balance.abs());
        accumulate(&mut agg.positive_balance, balance.max(Decimal::ZERO));
        if balance < Decimal::ZERO {
            agg.has_credits = true;
        }

        if item.is_retail() {
            agg.retail_item_count += 1;
            accumulate(&mut agg.retail_payments, payment);
            accumulate(&mut agg.retail_balance, balance);
        } else {
            accumulate(&mut agg.insurance_payments, payment);
            accumulate(&mut agg.insurance_balance, balance);
        }

        if item.is_recurring() {
            agg.recurring_item_count += 1;
        }
        if item.payor.insurance_levels() > 1 {
            agg.multi_payor_item_count += 1;
        }
        accumulate(&mut agg.total_quantity, item.quantity);
        agg.billing_period_sum += u64::from(item.billing_period);
        agg.max_billing_period = agg.max_billing_period.max(item.billing_period);

        if let Some(pricing) = &item.pricing {
            let totals = agg.pricing.get_or_insert_with(PricingTotals::default);
            accumulate(&mut totals.gross_charge, pricing.charge);
            accumulate(&mut totals.net_charge, pricing.net_charge());
            accumulate(&mut totals.gross_allow, pricing.allow);
            accumulate(&mut totals.net_allow, pricing.net_allow());
        }

        ids.insert(item.id.as_str());
        if let Some(order) = item.order_ref.as_deref() {
            orders.insert(order);
        }
    }

    agg.invoice_count = ids.len() as u64;
    agg.order_count = orders.len() as u64;
    agg
}

/// Grouping dimension for [`group_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    Overall,
    Branch,
    Source,
    BranchAndSource,
}

/// Key of one group. Unused dimensions are `None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl GroupKey {
    fn for_item(item: &ClassifiedItem, grouping: Grouping) -> GroupKey {
        let branch = || Some(item.branch.clone());
        let source = || Some(item.source_label.clone());
        match grouping {
            Grouping::Overall => GroupKey {
                source: None,
                branch: None,
            },
            Grouping::Branch => GroupKey {
                source: None,
                branch: branch(),
            },
            Grouping::Source => GroupKey {
                source: source(),
                branch: None,
            },
            Grouping::BranchAndSource => GroupKey {
                source: source(),
                branch: branch(),
            },
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.source, &self.branch) {
            (Some(s), Some(b)) => write!(f, "{} / {}", s, b),
            (Some(s), None) => write!(f, "{}", s),
            (None, Some(b)) => write!(f, "{}", b),
            (None, None) => write!(f, "ALL"),
        }
    }
}

/// One aggregate per group, ordered by key.
pub fn group_by<'a, I>(items: I, grouping: Grouping) -> BTreeMap<GroupKey, BranchPeriodAggregate>
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    let mut buckets: BTreeMap<GroupKey, Vec<&'a ClassifiedItem>> = BTreeMap::new();
    for item in items {
        buckets
            .entry(GroupKey::for_item(item, grouping))
            .or_default()
            .push(item);
    }
    buckets
        .into_iter()
        .map(|(key, members)| (key, aggregate(members)))
        .collect()
}

/// Mean of the defined collection rates. Groups with nothing billed are
/// skipped rather than counted as 0 or 100.
pub fn mean_collection_rate<'a, I>(aggregates: I) -> Option<Rate>
where
    I: IntoIterator<Item = &'a BranchPeriodAggregate>,
{
    let rates: Vec<Rate> = aggregates
        .into_iter()
        .filter_map(BranchPeriodAggregate::collection_rate)
        .collect();
    if rates.is_empty() {
        None
    } else {
        let sum = rates.iter().fold(Decimal::ZERO, |acc, r| acc.saturating_add(*r));
        Some(sum / Decimal::from(rates.len() as u64))
    }
}

fn round2(value: Option<Decimal>) -> Option<Decimal> {
    value.map(|v| v.round_dp(2))
}

/// Serializable view of an aggregate with its derived ratios spelled out,
/// rounded to two decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    #[serde(flatten)]
    pub key: GroupKey,
    #[serde(flatten)]
    pub totals: BranchPeriodAggregate,
    pub gross_total_billed: Money,
    pub net_total_billed: Money,
    pub collection_rate: Option<Rate>,
    pub net_collection_rate: Option<Rate>,
    pub retail_mix: Option<Rate>,
    pub recurring_ratio: Option<Rate>,
    pub avg_billing_period: Option<Decimal>,
}

impl AggregateReport {
    pub fn new(key: GroupKey, totals: BranchPeriodAggregate) -> Self {
        AggregateReport {
            gross_total_billed: totals.gross_total_billed(),
            net_total_billed: totals.net_total_billed(),
            collection_rate: round2(totals.collection_rate()),
            net_collection_rate: round2(totals.net_collection_rate()),
            retail_mix: round2(totals.retail_mix()),
            recurring_ratio: round2(totals.recurring_ratio()),
            avg_billing_period: round2(totals.avg_billing_period()),
            key,
            totals,
        }
    }
}
