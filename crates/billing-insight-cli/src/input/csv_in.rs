use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use billing_insight_core::ingest::{
    ingest_records, IngestContext, IngestOutcome, InvoiceRecord, SalesOrderRecord,
};
use billing_insight_core::normalize::proc_code::ProcCodeMappingRow;
use billing_insight_core::normalize::ProcCodeMap;
use billing_insight_core::SourceKind;

/// File-name suffix of yearly sales-order exports.
const SALES_ORDER_SUFFIX: &str = "_SalesOrders.csv";

/// One export file and the label its rows are reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub label: String,
    pub path: PathBuf,
}

/// Export files under `path`, sorted by label. A single file is taken as
/// is; a directory is scanned (non-recursively) for the exports `kind`
/// names.
pub fn discover(path: &Path, kind: SourceKind) -> Result<Vec<SourceFile>, Box<dyn std::error::Error>> {
    if path.is_file() {
        return Ok(vec![SourceFile {
            label: source_label(path, kind),
            path: path.to_path_buf(),
        }]);
    }
    if !path.is_dir() {
        return Err(format!("Input not found: {}", path.display()).into());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?
    {
        let file = entry?.path();
        if file.is_file() && is_export(&file, kind) {
            files.push(SourceFile {
                label: source_label(&file, kind),
                path: file,
            });
        }
    }
    files.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.path.cmp(&b.path)));

    if files.is_empty() {
        return Err(format!("No {} exports found in {}", kind, path.display()).into());
    }
    Ok(files)
}

fn is_export(path: &Path, kind: SourceKind) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    match kind {
        SourceKind::Invoices => path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv")),
        SourceKind::SalesOrders => name.ends_with(SALES_ORDER_SUFFIX),
    }
}

/// Invoice exports are labelled by file stem; sales-order exports by the
/// stem up to the first `_` (`2024_SalesOrders.csv` → `2024`).
pub fn source_label(path: &Path, kind: SourceKind) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match kind {
        SourceKind::Invoices => stem.to_string(),
        SourceKind::SalesOrders => stem.split('_').next().unwrap_or(stem).to_string(),
    }
}

/// Deserialize every row of a CSV export. Rows that fail to deserialize
/// are logged and dropped.
pub fn read_records<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>, Box<dyn std::error::Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;

    let mut rows = Vec::new();
    let mut malformed = 0usize;
    for record in reader.deserialize::<R>() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                malformed += 1;
                log::debug!("{}: {}", path.display(), e);
            }
        }
    }
    if malformed > 0 {
        log::warn!("{}: dropped {} malformed row(s)", path.display(), malformed);
    }
    Ok(rows)
}

/// Procedure-code mapping table (`final5`, `originals_pipe` columns).
pub fn read_proc_map(path: &Path) -> Result<ProcCodeMap, Box<dyn std::error::Error>> {
    let rows: Vec<ProcCodeMappingRow> = read_records(path)?;
    let map = ProcCodeMap::from_rows(rows);
    log::info!("loaded {} procedure code spellings from {}", map.len(), path.display());
    Ok(map)
}

/// Load and classify every export under `path`.
pub fn load_items(
    path: &Path,
    kind: SourceKind,
    proc_codes: &ProcCodeMap,
) -> Result<IngestOutcome, Box<dyn std::error::Error>> {
    let mut outcome = IngestOutcome::default();
    for file in discover(path, kind)? {
        let ctx = IngestContext {
            source_label: &file.label,
            proc_codes,
        };
        let batch = match kind {
            SourceKind::Invoices => {
                ingest_records(read_records::<InvoiceRecord>(&file.path)?, &ctx)
            }
            SourceKind::SalesOrders => {
                ingest_records(read_records::<SalesOrderRecord>(&file.path)?, &ctx)
            }
        };
        log::info!(
            "{}: {} items from {}",
            file.label,
            batch.items.len(),
            file.path.display()
        );
        outcome.extend(batch);
    }
    Ok(outcome)
}
