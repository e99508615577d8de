mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::benchmark::BenchmarkArgs;
use commands::reports::{BranchesArgs, ProcCodesArgs, SearchArgs, SummaryArgs};
use commands::split::SplitArgs;

/// Retail vs insurance billing analytics for Brightree exports
#[derive(Parser)]
#[command(
    name = "bix",
    version,
    about = "Retail vs insurance billing analytics for Brightree exports",
    long_about = "A CLI for classifying Brightree invoice and sales-order line items \
                  as retail or insurance, aggregating them by branch and time window \
                  with decimal precision, and benchmarking branches by percentile."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-source summary with a TOTAL row
    Summary(SummaryArgs),
    /// Aggregates per branch (or source) for a window
    Branches(BranchesArgs),
    /// Key metrics panel for a window
    Metrics(SummaryArgs),
    /// Branch percentile ranking and performance score
    Benchmark(BenchmarkArgs),
    /// Rental billing-period distribution
    BillingPeriods(SummaryArgs),
    /// Sorted distinct ids of retail items
    RetailIds(SummaryArgs),
    /// Selected line items (use --payor retail for the retail export)
    Items(SummaryArgs),
    /// Top procedure codes by payments
    ProcCodes(ProcCodesArgs),
    /// Find invoices or orders by number
    Search(SearchArgs),
    /// Split a combined sales-order export into yearly files
    SplitYears(SplitArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Summary(args) => commands::reports::run_summary(args),
        Commands::Branches(args) => commands::reports::run_branches(args),
        Commands::Metrics(args) => commands::reports::run_metrics(args),
        Commands::Benchmark(args) => commands::benchmark::run_benchmark(args),
        Commands::BillingPeriods(args) => commands::reports::run_billing_periods(args),
        Commands::RetailIds(args) => commands::reports::run_retail_ids(args),
        Commands::Items(args) => commands::reports::run_items(args),
        Commands::ProcCodes(args) => commands::reports::run_proc_codes(args),
        Commands::Search(args) => commands::reports::run_search(args),
        Commands::SplitYears(args) => commands::split::run_split_years(args),
        Commands::Version => {
            println!("bix {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
