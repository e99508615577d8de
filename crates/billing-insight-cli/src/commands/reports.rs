use clap::{Args, ValueEnum};
use serde_json::Value;
use std::time::Instant;

use billing_insight_core::aggregate::reports::MIN_SEARCH_LEN;
use billing_insight_core::aggregate::{
    billing_period_buckets, group_by, key_metrics, line_items, mean_collection_rate,
    period_summary, retail_ids, search, top_proc_codes, AggregateReport, Grouping,
};
use billing_insight_core::with_metadata;

use super::{DataArgs, Dataset, FilterArgs};

/// Arguments for the per-source summary
#[derive(Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GroupArg {
    Branch,
    Source,
    BranchSource,
    Overall,
}

impl From<GroupArg> for Grouping {
    fn from(g: GroupArg) -> Self {
        match g {
            GroupArg::Branch => Grouping::Branch,
            GroupArg::Source => Grouping::Source,
            GroupArg::BranchSource => Grouping::BranchAndSource,
            GroupArg::Overall => Grouping::Overall,
        }
    }
}

/// Arguments for grouped aggregates
#[derive(Args)]
pub struct BranchesArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Grouping dimension
    #[arg(long, value_enum, default_value = "branch")]
    pub group_by: GroupArg,
}

/// Arguments for the procedure-code ranking
#[derive(Args)]
pub struct ProcCodesArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Number of codes to show
    #[arg(long, default_value = "10")]
    pub top: usize,
}

/// Arguments for record search
#[derive(Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Invoice or sales-order number fragment (at least 2 characters)
    #[arg(long)]
    pub term: String,
}

fn skipped_warning(dataset: &Dataset) -> Vec<String> {
    if dataset.skipped > 0 {
        vec![format!(
            "{} row(s) without an identifier were skipped",
            dataset.skipped
        )]
    } else {
        Vec::new()
    }
}

pub fn run_summary(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let mut result = period_summary(view)?;
    result.warnings.extend(skipped_warning(&dataset));
    Ok(serde_json::to_value(result)?)
}

pub fn run_branches(args: BranchesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let grouping = Grouping::from(args.group_by);

    let groups = group_by(view.iter().copied(), grouping);
    let mut warnings = skipped_warning(&dataset);
    let undefined: Vec<String> = groups
        .iter()
        .filter(|(_, agg)| agg.collection_rate().is_none())
        .map(|(key, _)| key.to_string())
        .collect();
    if !undefined.is_empty() {
        warnings.push(format!(
            "No billable activity (collection rate N/A): {}",
            undefined.join(", ")
        ));
    }
    if let Some(mean) = mean_collection_rate(groups.values()) {
        warnings.push(format!(
            "Mean collection rate across groups: {}%",
            mean.round_dp(2)
        ));
    }

    let rows: Vec<AggregateReport> = groups
        .into_iter()
        .map(|(key, agg)| AggregateReport::new(key, agg))
        .collect();
    let result = with_metadata(
        "Grouped billing aggregates",
        &serde_json::json!({
            "grouping": grouping,
            "window": args.filter.window.label(),
            "source_kind": dataset.kind,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        view.len(),
        rows,
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_metrics(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let metrics = key_metrics(view.iter().copied());
    let mut warnings = metrics.notes.clone();
    warnings.extend(skipped_warning(&dataset));

    let result = with_metadata(
        &format!("Key metrics ({})", args.filter.window.label()),
        &serde_json::json!({
            "window": args.filter.window,
            "calendar": dataset.config.calendar,
            "id_count_of": dataset.kind.id_noun(),
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        view.len(),
        metrics,
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_billing_periods(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let buckets = billing_period_buckets(view.iter().copied());
    let result = with_metadata(
        "Rental billing-period distribution",
        &serde_json::json!({ "window": args.filter.window.label() }),
        skipped_warning(&dataset),
        start.elapsed().as_micros() as u64,
        view.len(),
        buckets,
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_retail_ids(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let ids = retail_ids(view);
    log::info!("{} retail {}", ids.len(), dataset.kind.id_noun());
    Ok(serde_json::to_value(ids)?)
}

/// Every selected line item, e.g. `--payor retail --output csv` for the
/// retail line-item export.
pub fn run_items(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let rows = line_items(view.iter().copied());
    log::info!("exporting {} line items", rows.len());
    let result = with_metadata(
        "Filtered line items",
        &serde_json::json!({
            "window": args.filter.window.label(),
            "payor": args.filter.payor,
            "source_kind": dataset.kind,
        }),
        skipped_warning(&dataset),
        start.elapsed().as_micros() as u64,
        view.len(),
        rows,
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_proc_codes(args: ProcCodesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let rows = top_proc_codes(view.iter().copied(), args.top);
    let result = with_metadata(
        &format!("Top {} procedure codes by payments", args.top),
        &serde_json::json!({ "window": args.filter.window.label() }),
        skipped_warning(&dataset),
        start.elapsed().as_micros() as u64,
        view.len(),
        rows,
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_search(args: SearchArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.term.trim().chars().count() < MIN_SEARCH_LEN {
        return Err(format!("--term needs at least {} characters", MIN_SEARCH_LEN).into());
    }
    let dataset = args.data.load()?;
    let view = dataset.select(&args.filter);
    let hits = search(view, &args.term);
    Ok(serde_json::to_value(hits)?)
}
