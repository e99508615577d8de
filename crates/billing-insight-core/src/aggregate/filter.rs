//! Item selection for every view: window, branches, payor, procedure
//! codes and sources. Filters only borrow; the item set is never touched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use super::windows::TimeWindow;
use crate::config::ReportingCalendar;
use crate::error::BillingInsightError;
use crate::ingest::ClassifiedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayorFilter {
    #[default]
    All,
    RetailOnly,
    InsuranceOnly,
}

impl PayorFilter {
    fn accepts(&self, item: &ClassifiedItem) -> bool {
        match self {
            PayorFilter::All => true,
            PayorFilter::RetailOnly => item.is_retail(),
            PayorFilter::InsuranceOnly => item.is_insurance(),
        }
    }
}

impl FromStr for PayorFilter {
    type Err = BillingInsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(PayorFilter::All),
            "retail" | "retail-only" => Ok(PayorFilter::RetailOnly),
            "insurance" | "insurance-only" => Ok(PayorFilter::InsuranceOnly),
            _ => Err(BillingInsightError::InvalidInput {
                field: "payor".into(),
                reason: format!("'{}' is not one of all, retail, insurance", s),
            }),
        }
    }
}

/// One accepted procedure code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcCodeSelector {
    Code(String),
    /// Items with no procedure code.
    Unspecified,
}

impl ProcCodeSelector {
    fn matches(&self, code: Option<&str>) -> bool {
        match (self, code) {
            (ProcCodeSelector::Unspecified, None) => true,
            (ProcCodeSelector::Code(want), Some(have)) => want.eq_ignore_ascii_case(have),
            _ => false,
        }
    }
}

impl FromStr for ProcCodeSelector {
    type Err = BillingInsightError;

    /// `[Unspecified]` (or `unspecified`) selects items without a code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(BillingInsightError::InvalidInput {
                field: "proc_code".into(),
                reason: "empty procedure code".into(),
            });
        }
        let bare = trimmed.trim_start_matches('[').trim_end_matches(']');
        if bare.eq_ignore_ascii_case("unspecified") {
            Ok(ProcCodeSelector::Unspecified)
        } else {
            Ok(ProcCodeSelector::Code(trimmed.to_ascii_uppercase()))
        }
    }
}

/// Conjunction of all selection criteria. Empty sets accept everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFilter {
    pub window: TimeWindow,
    pub branches: BTreeSet<String>,
    pub payor: PayorFilter,
    pub proc_codes: Vec<ProcCodeSelector>,
    pub sources: BTreeSet<String>,
}

impl ItemFilter {
    pub fn new(window: TimeWindow) -> Self {
        ItemFilter {
            window,
            ..Default::default()
        }
    }

    pub fn with_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches = branches.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_payor(mut self, payor: PayorFilter) -> Self {
        self.payor = payor;
        self
    }

    pub fn with_proc_codes(mut self, selectors: Vec<ProcCodeSelector>) -> Self {
        self.proc_codes = selectors;
        self
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn matches(&self, item: &ClassifiedItem, cal: &ReportingCalendar) -> bool {
        self.window.contains(item.date, cal)
            && (self.branches.is_empty() || self.branches.contains(&item.branch))
            && self.payor.accepts(item)
            && (self.proc_codes.is_empty()
                || self
                    .proc_codes
                    .iter()
                    .any(|sel| sel.matches(item.proc_code.as_deref())))
            && (self.sources.is_empty() || self.sources.contains(&item.source_label))
    }

    /// Borrowed view of the matching items, in input order.
    pub fn apply<'a>(
        &self,
        items: &'a [ClassifiedItem],
        cal: &ReportingCalendar,
    ) -> Vec<&'a ClassifiedItem> {
        items.iter().filter(|item| self.matches(item, cal)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::test_support::{dated, item, with_proc, with_source};
    use rust_decimal_macros::dec;

    fn sample() -> Vec<ClassifiedItem> {
        vec![
            with_source(
                with_proc(dated(item("1", "North", true, dec!(10), dec!(0), 1), 2025, 3, 1), "E0601"),
                "2025",
            ),
            with_source(
                dated(item("2", "South", false, dec!(20), dec!(0), 1), 2024, 6, 1),
                "2024",
            ),
            with_source(item("3", "North", false, dec!(30), dec!(0), 1), "2025"),
        ]
    }

    fn ids(view: &[&ClassifiedItem]) -> Vec<String> {
        view.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn test_default_filter_keeps_everything() {
        let items = sample();
        let view = ItemFilter::default().apply(&items, &ReportingCalendar::default());
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_window_drops_undated_and_out_of_range() {
        let items = sample();
        let view = ItemFilter::new(TimeWindow::FiscalYear).apply(&items, &ReportingCalendar::default());
        assert_eq!(ids(&view), vec!["1"]);
    }

    #[test]
    fn test_branch_and_payor() {
        let items = sample();
        let cal = ReportingCalendar::default();
        let view = ItemFilter::default()
            .with_branches(["North"])
            .with_payor(PayorFilter::InsuranceOnly)
            .apply(&items, &cal);
        assert_eq!(ids(&view), vec!["3"]);
    }

    #[test]
    fn test_proc_code_selectors() {
        let items = sample();
        let cal = ReportingCalendar::default();
        let coded = ItemFilter::default()
            .with_proc_codes(vec!["e0601".parse().unwrap()])
            .apply(&items, &cal);
        assert_eq!(ids(&coded), vec!["1"]);

        let missing = ItemFilter::default()
            .with_proc_codes(vec!["[Unspecified]".parse().unwrap()])
            .apply(&items, &cal);
        assert_eq!(ids(&missing), vec!["2", "3"]);
    }

    #[test]
    fn test_source_filter() {
        let items = sample();
        let view = ItemFilter::default()
            .with_sources(["2024"])
            .apply(&items, &ReportingCalendar::default());
        assert_eq!(ids(&view), vec!["2"]);
    }

    #[test]
    fn test_parse_payor_filter() {
        assert_eq!("retail".parse::<PayorFilter>().unwrap(), PayorFilter::RetailOnly);
        assert!("cash".parse::<PayorFilter>().is_err());
    }
}
