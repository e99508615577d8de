use chrono::Datelike;
use clap::Args;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use billing_insight_core::normalize::parse_date;

use crate::input;

/// Column holding the raw creation date.
const DATE_COLUMN: &str = "Sales Order Date Created";
/// Normalized date column added to every output row.
const ISO_DATE_COLUMN: &str = "Sales Order Date Created (YYYY-MM-DD)";

/// Arguments for splitting a sales-order export by year
#[derive(Args)]
pub struct SplitArgs {
    /// Combined sales-order CSV export
    #[arg(long, short)]
    pub input: String,

    /// Directory for the <year>_SalesOrders.csv files
    #[arg(long, short = 'd', default_value = "data/output")]
    pub out_dir: String,
}

/// Rows grouped by year, each with the ISO date inserted as column 1.
struct YearSplit {
    headers: Vec<String>,
    years: BTreeMap<i32, Vec<Vec<String>>>,
    dropped: usize,
}

fn split_rows(path: &Path) -> Result<YearSplit, Box<dyn std::error::Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;

    let source_headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let date_idx = source_headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| format!("'{}' has no '{}' column", path.display(), DATE_COLUMN))?;

    // A rerun over an already-split file replaces the ISO column.
    let existing_iso = source_headers.iter().position(|h| h == ISO_DATE_COLUMN);
    let mut headers: Vec<String> = source_headers
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != existing_iso)
        .map(|(_, h)| h.clone())
        .collect();
    headers.insert(1usize.min(headers.len()), ISO_DATE_COLUMN.to_string());

    let mut years: BTreeMap<i32, Vec<Vec<String>>> = BTreeMap::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::debug!("{}: {}", path.display(), e);
                dropped += 1;
                continue;
            }
        };
        let Some(date) = parse_date(record.get(date_idx)) else {
            dropped += 1;
            continue;
        };
        let mut row: Vec<String> = record
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != existing_iso)
            .map(|(_, v)| v.to_string())
            .collect();
        row.insert(1usize.min(row.len()), date.format("%Y-%m-%d").to_string());
        years.entry(date.year()).or_default().push(row);
    }

    Ok(YearSplit {
        headers,
        years,
        dropped,
    })
}

fn write_year(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn run_split_years(args: SplitArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let source = input::file::resolve_path(&args.input)?;
    let split = split_rows(&source)?;
    if split.dropped > 0 {
        log::warn!("dropped {} row(s) without a valid creation date", split.dropped);
    }

    let out_dir = PathBuf::from(&args.out_dir);
    fs::create_dir_all(&out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", out_dir.display(), e))?;

    let mut files = Vec::new();
    for (year, rows) in &split.years {
        let path = out_dir.join(format!("{}_SalesOrders.csv", year));
        write_year(&path, &split.headers, rows)?;
        log::info!("{}: {} rows", path.display(), rows.len());
        files.push(json!({
            "year": year,
            "rows": rows.len(),
            "path": path.display().to_string(),
        }));
    }

    let mut warnings = Vec::new();
    if split.dropped > 0 {
        warnings.push(format!(
            "{} row(s) without a valid creation date were dropped",
            split.dropped
        ));
    }
    Ok(json!({
        "result": files,
        "warnings": warnings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_by_year_inserts_iso_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("all.csv");
        fs::write(
            &input,
            "Sales Order Number,Sales Order Date Created,Sales Order Branch Office\n\
             SO-1,1/15/2024 9:30:00 AM,Dallas\n\
             SO-2,2025-03-01,Austin\n\
             SO-3,not a date,Austin\n\
             SO-4,12/31/2024,Austin\n",
        )
        .unwrap();

        let split = split_rows(&input).unwrap();
        assert_eq!(split.dropped, 1);
        assert_eq!(split.headers[1], ISO_DATE_COLUMN);
        assert_eq!(split.years.keys().copied().collect::<Vec<_>>(), vec![2024, 2025]);
        assert_eq!(split.years[&2024].len(), 2);
        assert_eq!(split.years[&2024][0][1], "2024-01-15");
        assert_eq!(split.years[&2025][0][0], "SO-2");
    }

    #[test]
    fn test_run_writes_year_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("all.csv");
        fs::write(
            &input,
            "Sales Order Number,Sales Order Date Created\nSO-1,01/02/2023\nSO-2,06/07/2024\n",
        )
        .unwrap();
        let out = dir.path().join("out");
        let value = run_split_years(SplitArgs {
            input: input.to_str().unwrap().to_string(),
            out_dir: out.to_str().unwrap().to_string(),
        })
        .unwrap();
        assert_eq!(value["result"].as_array().unwrap().len(), 2);
        assert!(out.join("2023_SalesOrders.csv").is_file());
        assert!(out.join("2024_SalesOrders.csv").is_file());
    }
}
