use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use billing_insight_core::ranking::{benchmark_branches, BranchPercentile, BranchRanking};
use billing_insight_core::types::{Money, Percentile, Rate};

use super::{DataArgs, FilterArgs};

/// Arguments for branch percentile benchmarking
#[derive(Args)]
pub struct BenchmarkArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Keep the base/adjustment breakdown of every percentile
    #[arg(long)]
    pub detail: bool,
}

/// One branch as shown in the benchmark table.
#[derive(Debug, Serialize)]
struct BenchmarkRow {
    rank: usize,
    branch: String,
    payments: Money,
    collection_rate: Option<Rate>,
    retail_mix: Rate,
    invoices: u64,
    payments_pctl: Percentile,
    collection_pctl: Option<Percentile>,
    retail_mix_pctl: Percentile,
    volume_pctl: Percentile,
    performance_score: Percentile,
}

impl BenchmarkRow {
    fn new(rank: usize, b: &BranchPercentile) -> Self {
        BenchmarkRow {
            rank,
            branch: b.metrics.branch.clone(),
            payments: round2(b.metrics.payments),
            collection_rate: b.metrics.collection_rate.map(round2),
            retail_mix: round2(b.metrics.retail_mix),
            invoices: b.metrics.invoice_volume,
            payments_pctl: round2(b.payments.percentile),
            collection_pctl: b.collection_rate.map(|r| round2(r.percentile)),
            retail_mix_pctl: round2(b.retail_mix.percentile),
            volume_pctl: round2(b.volume.percentile),
            performance_score: round2(b.performance_score),
        }
    }
}

fn round2(d: Decimal) -> Decimal {
    d.round_dp(2)
}

pub fn run_benchmark(args: BenchmarkArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let output = benchmark_branches(view, &dataset.config)?;

    if args.detail {
        return Ok(serde_json::to_value(output)?);
    }

    let mut value = serde_json::to_value(&output)?;
    if let BranchRanking::Ranked { branches, .. } = &output.result {
        let rows: Vec<BenchmarkRow> = branches
            .iter()
            .enumerate()
            .map(|(i, b)| BenchmarkRow::new(i + 1, b))
            .collect();
        value["result"]["branches"] = serde_json::to_value(rows)?;
    }
    Ok(value)
}
