pub mod percentile;
pub mod performance;

pub use percentile::{percentile_rank, RankedValue, Tiebreak};
pub use performance::{
    benchmark_branches, composite_score, rank_branches, BranchMetrics, BranchPercentile,
    BranchRanking, SampleTier,
};
