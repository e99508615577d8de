//! Reporting configuration: the calendar anchoring time windows, and the
//! tables driving the branch performance score.
//!
//! Every field has a default so a config file only needs to name what it
//! overrides.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BillingInsightError;
use crate::BillingInsightResult;

/// Dates that anchor every time window. Passed in explicitly so views are
/// reproducible; nothing here reads the wall clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingCalendar {
    /// "Today" for rolling and to-date windows.
    pub reference_date: NaiveDate,
    /// First day of the reporting fiscal year.
    pub fiscal_year_start: NaiveDate,
    /// Last day of the reporting fiscal year.
    pub fiscal_year_end: NaiveDate,
}

impl Default for ReportingCalendar {
    fn default() -> Self {
        // FY2025 reporting period.
        ReportingCalendar {
            reference_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MIN),
            fiscal_year_start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN),
            fiscal_year_end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MIN),
        }
    }
}

/// Component weights of the composite performance score. Must sum to 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileWeights {
    pub collection_rate: Decimal,
    pub payments: Decimal,
    pub volume: Decimal,
    pub retail_mix: Decimal,
}

impl Default for PercentileWeights {
    fn default() -> Self {
        PercentileWeights {
            collection_rate: dec!(0.40),
            payments: dec!(0.30),
            volume: dec!(0.20),
            retail_mix: dec!(0.10),
        }
    }
}

impl PercentileWeights {
    pub fn total(&self) -> Decimal {
        [self.payments, self.volume, self.retail_mix]
            .iter()
            .fold(self.collection_rate, |acc, w| acc.saturating_add(*w))
    }
}

/// Branch-count thresholds for the small-sample policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleThresholds {
    /// Below this, ranking is suppressed.
    pub minimum: usize,
    /// Below this (and at or above `minimum`), ranking is flagged weak.
    pub recommended: usize,
}

impl Default for SampleThresholds {
    fn default() -> Self {
        SampleThresholds {
            minimum: 5,
            recommended: 10,
        }
    }
}

/// Branch-level metrics that can be ranked or used to break ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    Payments,
    CollectionRate,
    RetailMix,
    /// Distinct invoice/order count.
    InvoiceVolume,
    ItemCount,
}

/// Secondary metric used to separate branches tied on each primary metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiebreakerTable {
    pub payments: RankMetric,
    pub collection_rate: RankMetric,
    pub retail_mix: RankMetric,
    pub volume: RankMetric,
}

impl Default for TiebreakerTable {
    fn default() -> Self {
        TiebreakerTable {
            payments: RankMetric::InvoiceVolume,
            collection_rate: RankMetric::Payments,
            retail_mix: RankMetric::ItemCount,
            volume: RankMetric::Payments,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub calendar: ReportingCalendar,
    pub weights: PercentileWeights,
    pub thresholds: SampleThresholds,
    pub tiebreakers: TiebreakerTable,
}

impl ReportingConfig {
    /// Deserialize from JSON and validate.
    pub fn from_json_value(value: serde_json::Value) -> BillingInsightResult<Self> {
        let config: ReportingConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BillingInsightResult<()> {
        let cal = &self.calendar;
        if cal.fiscal_year_start > cal.fiscal_year_end {
            return Err(BillingInsightError::DateError(format!(
                "fiscal year start {} is after fiscal year end {}",
                cal.fiscal_year_start, cal.fiscal_year_end
            )));
        }

        let w = &self.weights;
        for (name, value) in [
            ("weights.collection_rate", w.collection_rate),
            ("weights.payments", w.payments),
            ("weights.volume", w.volume),
            ("weights.retail_mix", w.retail_mix),
        ] {
            if value < Decimal::ZERO {
                return Err(BillingInsightError::InvalidInput {
                    field: name.into(),
                    reason: "weight cannot be negative".into(),
                });
            }
        }
        if w.total() != Decimal::ONE {
            return Err(BillingInsightError::InvalidInput {
                field: "weights".into(),
                reason: format!("weights must sum to 1, got {}", w.total()),
            });
        }

        let t = &self.thresholds;
        if t.minimum == 0 || t.minimum > t.recommended {
            return Err(BillingInsightError::InvalidInput {
                field: "thresholds".into(),
                reason: format!(
                    "need 0 < minimum <= recommended, got {} and {}",
                    t.minimum, t.recommended
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ReportingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_value() {
        let cfg = ReportingConfig::from_json_value(serde_json::json!({
            "thresholds": {"minimum": 3, "recommended": 8}
        }))
        .unwrap();
        assert_eq!(cfg.thresholds.minimum, 3);
        assert_eq!(cfg.weights, PercentileWeights::default());

        let bad = ReportingConfig::from_json_value(serde_json::json!({"thresholds": "five"}));
        assert!(matches!(bad, Err(BillingInsightError::SerializationError(_))));
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert_eq!(PercentileWeights::default().total(), Decimal::ONE);
    }

    #[test]
    fn test_weights_not_summing_to_one_rejected() {
        let mut cfg = ReportingConfig::default();
        cfg.weights.retail_mix = dec!(0.20);
        assert!(matches!(
            cfg.validate(),
            Err(BillingInsightError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut cfg = ReportingConfig::default();
        cfg.weights.collection_rate = dec!(0.60);
        cfg.weights.retail_mix = dec!(-0.10);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_inverted_fiscal_year_rejected() {
        let mut cfg = ReportingConfig::default();
        cfg.calendar.fiscal_year_start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(matches!(cfg.validate(), Err(BillingInsightError::DateError(_))));
    }

    #[test]
    fn test_thresholds_out_of_order_rejected() {
        let mut cfg = ReportingConfig::default();
        cfg.thresholds.minimum = 12;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: ReportingConfig = serde_json::from_str(
            r#"{"thresholds": {"minimum": 3, "recommended": 8}}"#,
        )
        .unwrap();
        assert_eq!(cfg.thresholds.minimum, 3);
        assert_eq!(cfg.weights, PercentileWeights::default());
        assert_eq!(cfg.tiebreakers.volume, RankMetric::Payments);
    }
}
