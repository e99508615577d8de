use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, PayorClass, PayorSignal};
use crate::types::{Money, Rate};

/// Charge/allow/discount detail carried by sales-order lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPricing {
    pub charge: Money,
    pub allow: Money,
    /// Fraction, 0.10 = 10% off.
    pub discount_rate: Rate,
}

impl OrderPricing {
    /// `charge × (1 − discount)`
    pub fn net_charge(&self) -> Money {
        self.charge
            .saturating_mul(Decimal::ONE.saturating_sub(self.discount_rate))
    }

    /// `allow × (1 − discount)`; the revenue figure for sales orders.
    pub fn net_allow(&self) -> Money {
        self.allow
            .saturating_mul(Decimal::ONE.saturating_sub(self.discount_rate))
    }

    pub fn discount_amount(&self) -> Money {
        self.allow.saturating_sub(self.net_allow())
    }
}

/// One billed or invoiced unit after normalization. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub branch: String,
    pub date: Option<NaiveDate>,
    pub payor: PayorSignal,
    pub payment_amount: Money,
    pub balance_amount: Money,
    pub billing_period: u32,
    pub proc_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_ref: Option<String>,
    pub quantity: Decimal,
    pub source_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<OrderPricing>,
}

impl LineItem {
    pub fn is_recurring(&self) -> bool {
        self.billing_period > 1
    }

    pub fn classify(self) -> ClassifiedItem {
        let class = classify(&self.payor);
        ClassifiedItem { item: self, class }
    }
}

/// A line item tagged retail or insurance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    #[serde(flatten)]
    pub item: LineItem,
    pub class: PayorClass,
}

impl ClassifiedItem {
    pub fn is_retail(&self) -> bool {
        self.class.is_retail()
    }

    pub fn is_insurance(&self) -> bool {
        self.class.is_insurance()
    }
}

impl std::ops::Deref for ClassifiedItem {
    type Target = LineItem;

    fn deref(&self) -> &LineItem {
        &self.item
    }
}
