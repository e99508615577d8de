pub mod benchmark;
pub mod reports;
pub mod split;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use std::path::Path;

use billing_insight_core::aggregate::{ItemFilter, PayorFilter, ProcCodeSelector, TimeWindow};
use billing_insight_core::config::ReportingConfig;
use billing_insight_core::ingest::ClassifiedItem;
use billing_insight_core::normalize::ProcCodeMap;
use billing_insight_core::SourceKind;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportKind {
    Invoices,
    SalesOrders,
}

impl From<ExportKind> for SourceKind {
    fn from(kind: ExportKind) -> Self {
        match kind {
            ExportKind::Invoices => SourceKind::Invoices,
            ExportKind::SalesOrders => SourceKind::SalesOrders,
        }
    }
}

/// Where the exports live and how to interpret them.
#[derive(Args)]
pub struct DataArgs {
    /// CSV export, or a directory of exports
    #[arg(long, short)]
    pub input: String,

    /// Export type
    #[arg(long, value_enum, default_value = "invoices")]
    pub kind: ExportKind,

    /// Procedure-code mapping CSV (final5, originals_pipe)
    #[arg(long)]
    pub proc_map: Option<String>,

    /// Reporting config (.json, .yaml or .yml); JSON may also be piped on stdin
    #[arg(long)]
    pub config: Option<String>,

    /// Reference date for rolling and to-date windows (YYYY-MM-DD)
    #[arg(long)]
    pub reference_date: Option<NaiveDate>,

    /// First day of the fiscal year (YYYY-MM-DD)
    #[arg(long)]
    pub fiscal_start: Option<NaiveDate>,

    /// Last day of the fiscal year (YYYY-MM-DD)
    #[arg(long)]
    pub fiscal_end: Option<NaiveDate>,
}

/// Selection applied before any view is computed.
#[derive(Args)]
pub struct FilterArgs {
    /// Time window: all, ytd, qtd, fy, 1m, 3m, 6m, <N>d or <N>y
    #[arg(long, default_value = "all")]
    pub window: TimeWindow,

    /// Restrict to a branch (repeatable)
    #[arg(long = "branch")]
    pub branches: Vec<String>,

    /// Payor filter: all, retail or insurance
    #[arg(long, default_value = "all")]
    pub payor: PayorFilter,

    /// Restrict to a procedure code, or [Unspecified] (repeatable)
    #[arg(long = "proc-code")]
    pub proc_codes: Vec<ProcCodeSelector>,

    /// Restrict to a source label such as a year (repeatable)
    #[arg(long = "source")]
    pub sources: Vec<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> ItemFilter {
        ItemFilter::new(self.window)
            .with_branches(self.branches.iter().cloned())
            .with_payor(self.payor)
            .with_proc_codes(self.proc_codes.clone())
            .with_sources(self.sources.iter().cloned())
    }
}

/// Loaded item set and the config it is reported under.
pub struct Dataset {
    pub kind: SourceKind,
    pub items: Vec<ClassifiedItem>,
    pub skipped: usize,
    pub config: ReportingConfig,
}

impl Dataset {
    /// Borrowed view of the items passing `filter`.
    pub fn select(&self, filter: &FilterArgs) -> Vec<&ClassifiedItem> {
        filter.to_filter().apply(&self.items, &self.config.calendar)
    }
}

impl DataArgs {
    pub fn load(&self) -> Result<Dataset, Box<dyn std::error::Error>> {
        let config = self.config()?;
        let kind = SourceKind::from(self.kind);

        let proc_codes = match &self.proc_map {
            Some(path) => input::csv_in::read_proc_map(&input::file::resolve_path(path)?)?,
            None => ProcCodeMap::default(),
        };
        let outcome = input::csv_in::load_items(Path::new(&self.input), kind, &proc_codes)?;
        log::info!(
            "loaded {} {} items ({} skipped)",
            outcome.items.len(),
            kind,
            outcome.skipped
        );

        Ok(Dataset {
            kind,
            items: outcome.items,
            skipped: outcome.skipped,
            config,
        })
    }

    /// Config file (or piped JSON), then the single-value overrides.
    pub fn config(&self) -> Result<ReportingConfig, Box<dyn std::error::Error>> {
        let mut config: ReportingConfig = if let Some(ref path) = self.config {
            input::file::read_config(path)?
        } else if let Some(data) = input::stdin::read_stdin()? {
            ReportingConfig::from_json_value(data)?
        } else {
            ReportingConfig::default()
        };

        apply_overrides(
            &mut config,
            self.reference_date,
            self.fiscal_start,
            self.fiscal_end,
        );
        config.validate()?;
        Ok(config)
    }
}

fn apply_overrides(
    config: &mut ReportingConfig,
    reference_date: Option<NaiveDate>,
    fiscal_start: Option<NaiveDate>,
    fiscal_end: Option<NaiveDate>,
) {
    let cal = &mut config.calendar;
    if let Some(d) = reference_date {
        cal.reference_date = d;
    }
    if let Some(d) = fiscal_start {
        cal.fiscal_year_start = d;
    }
    if let Some(d) = fiscal_end {
        cal.fiscal_year_end = d;
    }
}
