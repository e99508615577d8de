//! Peer-group percentiles for branches and the composite performance score.
//!
//! Each branch is ranked on payments, collection rate, retail mix and
//! invoice volume. Ties on a metric are broken by the secondary metric
//! named in the [`TiebreakerTable`]. A branch with nothing billed has no
//! collection rate; it is left out of that population and scored 50 on
//! that component.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::percentile::{percentile_rank, RankedValue, Tiebreak};
use crate::aggregate::{group_by, BranchPeriodAggregate, Grouping};
use crate::config::{PercentileWeights, RankMetric, ReportingConfig, SampleThresholds};
use crate::ingest::ClassifiedItem;
use crate::types::{with_metadata, ComputationOutput, Money, Percentile, Rate};
use crate::BillingInsightResult;

/// Component score used when a branch's collection rate is undefined.
const UNDEFINED_COMPONENT_SCORE: Decimal = dec!(50);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The per-branch figures that are ranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMetrics {
    pub branch: String,
    pub payments: Money,
    pub gross_total_billed: Money,
    pub net_total_billed: Money,
    /// `None` when nothing was billed.
    pub collection_rate: Option<Rate>,
    pub retail_mix: Rate,
    pub invoice_volume: u64,
    pub item_count: u64,
}

impl BranchMetrics {
    pub fn from_aggregate(branch: impl Into<String>, agg: &BranchPeriodAggregate) -> Self {
        BranchMetrics {
            branch: branch.into(),
            payments: agg.total_payments,
            gross_total_billed: agg.gross_total_billed(),
            net_total_billed: agg.net_total_billed(),
            collection_rate: agg.collection_rate(),
            retail_mix: agg.retail_mix().unwrap_or(Decimal::ZERO),
            invoice_volume: agg.invoice_count,
            item_count: agg.item_count,
        }
    }

    /// Value of `metric` for this branch, `None` when undefined.
    pub fn value(&self, metric: RankMetric) -> Option<Decimal> {
        match metric {
            RankMetric::Payments => Some(self.payments),
            RankMetric::CollectionRate => self.collection_rate,
            RankMetric::RetailMix => Some(self.retail_mix),
            RankMetric::InvoiceVolume => Some(Decimal::from(self.invoice_volume)),
            RankMetric::ItemCount => Some(Decimal::from(self.item_count)),
        }
    }
}

/// Percentiles and composite score for one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchPercentile {
    pub metrics: BranchMetrics,
    pub payments: RankedValue,
    /// `None` when the branch has no collection rate.
    pub collection_rate: Option<RankedValue>,
    pub retail_mix: RankedValue,
    pub volume: RankedValue,
    pub performance_score: Percentile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleTier {
    /// At least the minimum but fewer than the recommended branch count.
    Weak,
    Adequate,
}

/// Ranking outcome. Too few branches is a result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BranchRanking {
    InsufficientData {
        branch_count: usize,
        warning: String,
    },
    Ranked {
        tier: SampleTier,
        branch_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        /// Highest performance score first.
        branches: Vec<BranchPercentile>,
    },
}

impl BranchRanking {
    /// The fixed message to show alongside the ranking, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            BranchRanking::InsufficientData { warning, .. } => Some(warning.as_str()),
            BranchRanking::Ranked { note, .. } => note.as_deref(),
        }
    }
}

pub fn insufficient_data_warning(branch_count: usize, thresholds: &SampleThresholds) -> String {
    format!(
        "Insufficient data for percentile analysis. Only {} branches in selection. Minimum {} required for meaningful comparison.",
        branch_count, thresholds.minimum
    )
}

pub fn weak_sample_note(branch_count: usize, thresholds: &SampleThresholds) -> String {
    format!(
        "Note: Percentiles based on {} branches. Statistical significance increases with larger samples ({}+ recommended).",
        branch_count, thresholds.recommended
    )
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Weighted sum of the component percentiles. An undefined collection
/// rate contributes 50.
pub fn composite_score(
    weights: &PercentileWeights,
    collection_rate: Option<Percentile>,
    payments: Percentile,
    volume: Percentile,
    retail_mix: Percentile,
) -> Percentile {
    weights.collection_rate * collection_rate.unwrap_or(UNDEFINED_COMPONENT_SCORE)
        + weights.payments * payments
        + weights.volume * volume
        + weights.retail_mix * retail_mix
}

/// Rank a set of branches. Fails only on an invalid configuration.
pub fn rank_branches(
    branches: &[BranchMetrics],
    config: &ReportingConfig,
) -> BillingInsightResult<BranchRanking> {
    config.validate()?;
    let thresholds = &config.thresholds;
    let n = branches.len();

    if n < thresholds.minimum {
        return Ok(BranchRanking::InsufficientData {
            branch_count: n,
            warning: insufficient_data_warning(n, thresholds),
        });
    }
    let (tier, note) = if n < thresholds.recommended {
        (SampleTier::Weak, Some(weak_sample_note(n, thresholds)))
    } else {
        (SampleTier::Adequate, None)
    };

    let tb = &config.tiebreakers;
    let payments_col = MetricColumn::new(branches, RankMetric::Payments, tb.payments);
    let collection_col =
        MetricColumn::new(branches, RankMetric::CollectionRate, tb.collection_rate);
    let retail_col = MetricColumn::new(branches, RankMetric::RetailMix, tb.retail_mix);
    let volume_col = MetricColumn::new(branches, RankMetric::InvoiceVolume, tb.volume);

    let mut ranked: Vec<BranchPercentile> = branches
        .iter()
        .map(|b| {
            let payments = payments_col.rank(b).unwrap_or_else(neutral);
            let collection_rate = collection_col.rank(b);
            let retail_mix = retail_col.rank(b).unwrap_or_else(neutral);
            let volume = volume_col.rank(b).unwrap_or_else(neutral);
            let performance_score = composite_score(
                &config.weights,
                collection_rate.map(|r| r.percentile),
                payments.percentile,
                volume.percentile,
                retail_mix.percentile,
            );
            BranchPercentile {
                metrics: b.clone(),
                payments,
                collection_rate,
                retail_mix,
                volume,
                performance_score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.performance_score
            .cmp(&a.performance_score)
            .then_with(|| a.metrics.branch.cmp(&b.metrics.branch))
    });

    Ok(BranchRanking::Ranked {
        tier,
        branch_count: n,
        note,
        branches: ranked,
    })
}

/// Group items by branch and rank the branches, wrapped in the standard
/// output envelope.
pub fn benchmark_branches<'a, I>(
    items: I,
    config: &ReportingConfig,
) -> BillingInsightResult<ComputationOutput<BranchRanking>>
where
    I: IntoIterator<Item = &'a ClassifiedItem>,
{
    let start = Instant::now();
    let groups = group_by(items, Grouping::Branch);
    let item_count = groups.values().map(|a| a.item_count as usize).sum();
    let metrics: Vec<BranchMetrics> = groups
        .iter()
        .map(|(key, agg)| BranchMetrics::from_aggregate(key.to_string(), agg))
        .collect();

    let mut warnings = Vec::new();
    let undefined: Vec<&str> = metrics
        .iter()
        .filter(|m| m.collection_rate.is_none())
        .map(|m| m.branch.as_str())
        .collect();
    if !undefined.is_empty() {
        warnings.push(format!(
            "No billable activity for {}; collection rate scored as 50",
            undefined.join(", ")
        ));
    }

    let ranking = rank_branches(&metrics, config)?;
    if let Some(message) = ranking.message() {
        warnings.push(message.to_string());
    }
    log::info!("ranked {} branches over {} items", metrics.len(), item_count);

    Ok(with_metadata(
        "Peer-group percentile rank (linear interpolation, C=1) with secondary tiebreak",
        &serde_json::json!({
            "weights": config.weights,
            "tiebreakers": config.tiebreakers,
            "thresholds": config.thresholds,
            "undefined_collection_rate": "excluded from population, scored 50 in composite",
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        item_count,
        ranking,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn neutral() -> RankedValue {
    percentile_rank(Decimal::ZERO, &[], None)
}

/// Primary and secondary populations for one ranked metric.
struct MetricColumn {
    primary: RankMetric,
    secondary: RankMetric,
    population: Vec<Decimal>,
    secondary_population: Vec<Decimal>,
}

impl MetricColumn {
    fn new(branches: &[BranchMetrics], primary: RankMetric, secondary: RankMetric) -> Self {
        MetricColumn {
            primary,
            secondary,
            population: branches.iter().filter_map(|b| b.value(primary)).collect(),
            secondary_population: branches.iter().filter_map(|b| b.value(secondary)).collect(),
        }
    }

    fn rank(&self, branch: &BranchMetrics) -> Option<RankedValue> {
        let value = branch.value(self.primary)?;
        let tiebreak = branch.value(self.secondary).map(|value| Tiebreak {
            value,
            population: &self.secondary_population,
        });
        Some(percentile_rank(value, &self.population, tiebreak))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn branch(name: &str, payments: Decimal, billed: Decimal, invoices: u64) -> BranchMetrics {
        BranchMetrics {
            branch: name.to_string(),
            payments,
            gross_total_billed: billed,
            net_total_billed: billed,
            collection_rate: if billed > Decimal::ZERO {
                Some(payments / billed * dec!(100))
            } else {
                None
            },
            retail_mix: dec!(20),
            invoice_volume: invoices,
            item_count: invoices,
        }
    }

    fn five_branches() -> Vec<BranchMetrics> {
        vec![
            branch("A", dec!(100), dec!(200), 10),
            branch("B", dec!(200), dec!(250), 20),
            branch("C", dec!(300), dec!(300), 30),
            branch("D", dec!(400), dec!(800), 40),
            branch("E", dec!(500), dec!(600), 50),
        ]
    }

    #[test]
    fn test_fewer_than_minimum_is_insufficient() {
        let branches = &five_branches()[..4];
        let ranking = rank_branches(branches, &ReportingConfig::default()).unwrap();
        assert_eq!(
            ranking,
            BranchRanking::InsufficientData {
                branch_count: 4,
                warning: "Insufficient data for percentile analysis. Only 4 branches in selection. Minimum 5 required for meaningful comparison.".to_string(),
            }
        );
    }

    #[test]
    fn test_weak_tier_note() {
        let ranking = rank_branches(&five_branches(), &ReportingConfig::default()).unwrap();
        match ranking {
            BranchRanking::Ranked { tier, note, branches, .. } => {
                assert_eq!(tier, SampleTier::Weak);
                assert_eq!(
                    note.as_deref(),
                    Some("Note: Percentiles based on 5 branches. Statistical significance increases with larger samples (10+ recommended).")
                );
                assert_eq!(branches.len(), 5);
            }
            other => panic!("expected ranked, got {:?}", other),
        }
    }

    #[test]
    fn test_adequate_tier() {
        let branches: Vec<BranchMetrics> = (1..=10)
            .map(|i| branch(&format!("B{:02}", i), Decimal::from(i * 10), dec!(1000), i as u64))
            .collect();
        let ranking = rank_branches(&branches, &ReportingConfig::default()).unwrap();
        assert!(matches!(
            ranking,
            BranchRanking::Ranked {
                tier: SampleTier::Adequate,
                note: None,
                ..
            }
        ));
    }

    #[test]
    fn test_composite_is_exact_weighted_sum() {
        let ranking = rank_branches(&five_branches(), &ReportingConfig::default()).unwrap();
        let BranchRanking::Ranked { branches, .. } = ranking else {
            panic!("expected ranked");
        };
        for b in &branches {
            let expected = dec!(0.40) * b.collection_rate.map_or(dec!(50), |r| r.percentile)
                + dec!(0.30) * b.payments.percentile
                + dec!(0.20) * b.volume.percentile
                + dec!(0.10) * b.retail_mix.percentile;
            assert_eq!(b.performance_score, expected);
            assert!(b.performance_score >= Decimal::ZERO && b.performance_score <= dec!(100));
        }
        let scores: Vec<Decimal> = branches.iter().map(|b| b.performance_score).collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(scores, sorted);
    }

    #[test]
    fn test_zero_billed_branch_excluded_from_collection_population() {
        let mut branches = five_branches();
        branches.push(branch("Z", dec!(0), dec!(0), 5));
        let ranking = rank_branches(&branches, &ReportingConfig::default()).unwrap();
        let BranchRanking::Ranked { branches, .. } = ranking else {
            panic!("expected ranked");
        };
        let z = branches.iter().find(|b| b.metrics.branch == "Z").unwrap();
        assert_eq!(z.collection_rate, None);
        let expected = dec!(0.40) * dec!(50)
            + dec!(0.30) * z.payments.percentile
            + dec!(0.20) * z.volume.percentile
            + dec!(0.10) * z.retail_mix.percentile;
        assert_eq!(z.performance_score, expected);

        // C collects 100% and is the unique maximum of the five defined rates.
        let c = branches.iter().find(|b| b.metrics.branch == "C").unwrap();
        assert_eq!(c.collection_rate.map(|r| r.percentile), Some(dec!(100)));
    }

    #[test]
    fn test_tied_collection_rates_broken_by_payments() {
        let mut branches = vec![
            branch("Hi", dec!(500), dec!(500), 5),
            branch("Lo", dec!(300), dec!(300), 5),
            branch("Mid", dec!(720), dec!(900), 5),
        ];
        branches.push(branch("X", dec!(10), dec!(100), 1));
        branches.push(branch("Y", dec!(20), dec!(100), 2));
        let ranking = rank_branches(&branches, &ReportingConfig::default()).unwrap();
        let BranchRanking::Ranked { branches, .. } = ranking else {
            panic!("expected ranked");
        };
        let get = |name: &str| {
            branches
                .iter()
                .find(|b| b.metrics.branch == name)
                .and_then(|b| b.collection_rate)
                .unwrap()
        };
        let (hi, lo) = (get("Hi"), get("Lo"));
        assert_eq!(hi.base, lo.base);
        assert!(hi.adjustment > lo.adjustment);
        assert!(hi.percentile > lo.percentile);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut config = ReportingConfig::default();
        config.weights.payments = dec!(0.50);
        assert!(rank_branches(&five_branches(), &config).is_err());
    }
}
