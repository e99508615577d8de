//! Percentile rank with a secondary-metric tiebreaker.
//!
//! Linear-interpolation rank (C = 1): `count(x < v) / (n − 1) × 100`.
//! Members tied on the primary value are nudged apart by at most half a
//! percentile point according to where their secondary value sits in the
//! secondary population. The nudge never exceeds half of one rank step
//! (`100 / (n − 1)`), so a tied member cannot overtake the next higher
//! primary value.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Percentile;

/// Largest tiebreak nudge, in percentile points.
const MAX_TIEBREAK_ADJUSTMENT: Decimal = dec!(0.5);
/// Rank given when the population is too small to order.
const NEUTRAL_PERCENTILE: Decimal = dec!(50);

/// Secondary value and population used to order tied members.
#[derive(Debug, Clone, Copy)]
pub struct Tiebreak<'a> {
    pub value: Decimal,
    pub population: &'a [Decimal],
}

/// A percentile and how it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedValue {
    pub base: Percentile,
    pub adjustment: Decimal,
    /// `clamp(base + adjustment, 0, 100)`
    pub percentile: Percentile,
}

impl RankedValue {
    fn neutral() -> Self {
        RankedValue {
            base: NEUTRAL_PERCENTILE,
            adjustment: Decimal::ZERO,
            percentile: NEUTRAL_PERCENTILE,
        }
    }
}

/// Rank `value` within `population`. A population of one (or none) ranks
/// everything at 50.
pub fn percentile_rank(
    value: Decimal,
    population: &[Decimal],
    tiebreak: Option<Tiebreak<'_>>,
) -> RankedValue {
    let n = population.len();
    if n <= 1 {
        return RankedValue::neutral();
    }

    let count_less = population.iter().filter(|x| **x < value).count();
    let count_equal = population.iter().filter(|x| **x == value).count();
    let base = Decimal::from(count_less as u64) / Decimal::from((n - 1) as u64) * dec!(100);

    let adjustment = match tiebreak {
        Some(tb) if count_equal > 1 => {
            let half_step = dec!(50) / Decimal::from((n - 1) as u64);
            tiebreak_position(tb) * MAX_TIEBREAK_ADJUSTMENT.min(half_step)
        }
        _ => Decimal::ZERO,
    };

    let percentile = (base + adjustment).clamp(Decimal::ZERO, dec!(100));
    RankedValue {
        base,
        adjustment,
        percentile,
    }
}

/// Position of the secondary value within its population, in `[0, 1]`.
fn tiebreak_position(tb: Tiebreak<'_>) -> Decimal {
    let (Some(min), Some(max)) = (
        tb.population.iter().copied().min(),
        tb.population.iter().copied().max(),
    ) else {
        return Decimal::ZERO;
    };
    let (Some(range), Some(offset)) = (max.checked_sub(min), tb.value.checked_sub(min)) else {
        return Decimal::ZERO;
    };
    if range <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (offset / range).clamp(Decimal::ZERO, Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_and_unique_max() {
        let pop = [dec!(10), dec!(20), dec!(30), dec!(40)];
        assert_eq!(percentile_rank(dec!(10), &pop, None).percentile, dec!(0));
        assert_eq!(percentile_rank(dec!(40), &pop, None).percentile, dec!(100));
    }

    #[test]
    fn test_interior_value() {
        let pop = [dec!(1), dec!(2), dec!(3)];
        let r = percentile_rank(dec!(2), &pop, None);
        assert_eq!(r.base, dec!(50));
        assert_eq!(r.adjustment, Decimal::ZERO);
    }

    #[test]
    fn test_small_population_is_neutral() {
        assert_eq!(percentile_rank(dec!(5), &[], None).percentile, dec!(50));
        assert_eq!(percentile_rank(dec!(5), &[dec!(5)], None).percentile, dec!(50));
    }

    #[test]
    fn test_tied_values_are_separated_by_secondary() {
        let rates = [dec!(100), dec!(100), dec!(80)];
        let volumes = [dec!(500), dec!(300), dec!(900)];
        let rank = |i: usize| {
            percentile_rank(
                rates[i],
                &rates,
                Some(Tiebreak {
                    value: volumes[i],
                    population: &volumes,
                }),
            )
        };
        let (a, b, c) = (rank(0), rank(1), rank(2));
        assert_eq!(a.base, b.base);
        assert!(a.adjustment > b.adjustment);
        assert!(a.percentile > b.percentile);
        assert_eq!(b.adjustment, Decimal::ZERO);
        assert!(a.adjustment <= dec!(0.5));
        assert_eq!(c.base, Decimal::ZERO);
        assert_eq!(c.adjustment, Decimal::ZERO);
    }

    #[test]
    fn test_no_adjustment_without_tie_or_range() {
        let pop = [dec!(1), dec!(1), dec!(2)];
        let flat = [dec!(7), dec!(7), dec!(7)];
        let r = percentile_rank(
            dec!(1),
            &pop,
            Some(Tiebreak {
                value: dec!(7),
                population: &flat,
            }),
        );
        assert_eq!(r.adjustment, Decimal::ZERO);

        let r = percentile_rank(
            dec!(2),
            &pop,
            Some(Tiebreak {
                value: dec!(9),
                population: &[dec!(1), dec!(9)],
            }),
        );
        assert_eq!(r.adjustment, Decimal::ZERO);
        assert_eq!(r.percentile, dec!(100));
    }

    #[test]
    fn test_percentile_is_clamped() {
        let pop = [dec!(5), dec!(5)];
        let r = percentile_rank(
            dec!(5),
            &pop,
            Some(Tiebreak {
                value: dec!(10),
                population: &[dec!(0), dec!(10)],
            }),
        );
        assert!(r.percentile >= Decimal::ZERO && r.percentile <= dec!(100));
        assert_eq!(r.percentile, dec!(0.5));
    }

    #[test]
    fn test_large_population_keeps_primary_order() {
        // 0..=499 plus a second 100: n = 501, one rank step is 0.2.
        let mut pop: Vec<Decimal> = (0..500u32).map(Decimal::from).collect();
        pop.push(dec!(100));
        let secondary: Vec<Decimal> = (0..=500u32).map(Decimal::from).collect();
        let top = Tiebreak {
            value: dec!(500),
            population: &secondary,
        };

        let tied = percentile_rank(dec!(100), &pop, Some(top));
        let next = percentile_rank(dec!(101), &pop, Some(top));
        assert_eq!(tied.base, dec!(20));
        assert_eq!(tied.adjustment, dec!(0.1));
        assert_eq!(next.base, dec!(20.4));
        assert!(tied.percentile < next.percentile);
    }

    #[test]
    fn test_extreme_secondary_range_gives_no_adjustment() {
        let r = percentile_rank(
            dec!(1),
            &[dec!(1), dec!(1), dec!(2)],
            Some(Tiebreak {
                value: Decimal::MAX,
                population: &[Decimal::MIN, Decimal::MAX],
            }),
        );
        assert_eq!(r.adjustment, Decimal::ZERO);
        assert_eq!(r.percentile, Decimal::ZERO);
    }
}
