//! Raw Brightree export rows, keyed by the export's column headers.
//!
//! Every field is optional text: columns may be missing from an export,
//! and cells are normalized later by [`crate::normalize`].

use serde::{Deserialize, Serialize};

/// One row of an invoice line-item export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceRecord {
    #[serde(rename = "Invoice Number")]
    pub number: Option<String>,
    #[serde(rename = "Invoice Status")]
    pub status: Option<String>,
    #[serde(rename = "Invoice Sales Order Number")]
    pub so_number: Option<String>,
    #[serde(rename = "Invoice Date Created")]
    pub date_created: Option<String>,
    #[serde(rename = "Invoice Date of Service")]
    pub date_of_service: Option<String>,
    #[serde(rename = "Invoice Branch")]
    pub branch: Option<String>,
    #[serde(rename = "Policy Payor Level")]
    pub payor_level: Option<String>,
    #[serde(rename = "Policy Payor Name")]
    pub payor_name: Option<String>,
    #[serde(rename = "Invoice Detail Item Name")]
    pub item_name: Option<String>,
    #[serde(rename = "Invoice Detail Billing Period")]
    pub billing_period: Option<String>,
    #[serde(rename = "Invoice Detail Payments")]
    pub payments: Option<String>,
    #[serde(rename = "Invoice Detail Balance")]
    pub balance: Option<String>,
    #[serde(rename = "Invoice Detail Qty")]
    pub qty: Option<String>,
    #[serde(rename = "Invoice Detail Proc Code")]
    pub proc_code: Option<String>,
}

/// One row of a sales-order line-item export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesOrderRecord {
    #[serde(rename = "Sales Order Number")]
    pub number: Option<String>,
    #[serde(rename = "Sales Order Date Created")]
    pub date_created: Option<String>,
    /// Normalized date column written by the year splitter.
    #[serde(rename = "Sales Order Date Created (YYYY-MM-DD)")]
    pub date_created_iso: Option<String>,
    #[serde(rename = "Sales Order Branch Office")]
    pub branch: Option<String>,
    #[serde(rename = "Sales Order Status")]
    pub status: Option<String>,
    #[serde(rename = "Sales Order Discount Pct")]
    pub discount_pct: Option<String>,
    #[serde(rename = "Insurance Flags Primary")]
    pub flag_primary: Option<String>,
    #[serde(rename = "Insurance Flags Secondary")]
    pub flag_secondary: Option<String>,
    #[serde(rename = "Insurance Flags Tertiary")]
    pub flag_tertiary: Option<String>,
    #[serde(rename = "Sales Order Detail Item Name")]
    pub item_name: Option<String>,
    #[serde(rename = "Sales Order Detail Proc Code")]
    pub proc_code: Option<String>,
    #[serde(rename = "Sales Order Detail Qty")]
    pub qty: Option<String>,
    #[serde(rename = "Sales Order Detail Charge")]
    pub charge: Option<String>,
    #[serde(rename = "Sales Order Detail Allow")]
    pub allow: Option<String>,
    #[serde(rename = "Sales Order Detail Sale Type")]
    pub sale_type: Option<String>,
}
