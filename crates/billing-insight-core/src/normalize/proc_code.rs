use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the procedure-code mapping table: a standardized HCPCS code
/// and the pipe-separated raw spellings that should collapse onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcCodeMappingRow {
    pub final5: String,
    pub originals_pipe: String,
}

/// Raw procedure code → standardized code lookup.
#[derive(Debug, Clone, Default)]
pub struct ProcCodeMap {
    codes: HashMap<String, String>,
}

impl ProcCodeMap {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = ProcCodeMappingRow>,
    {
        let mut codes = HashMap::new();
        for row in rows {
            let standard = row.final5.trim().to_uppercase();
            if standard.is_empty() {
                continue;
            }
            for original in row.originals_pipe.split('|') {
                let original = original.trim();
                if original.is_empty() {
                    continue;
                }
                codes.insert(original.to_string(), standard.clone());
                codes.insert(original.to_uppercase(), standard.clone());
            }
        }
        log::debug!("procedure code map holds {} spellings", codes.len());
        ProcCodeMap { codes }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Standardize a raw code. Blank → `None`; unmapped codes come back
    /// uppercased.
    pub fn standardize(&self, raw: Option<&str>) -> Option<String> {
        let original = raw.map(str::trim).filter(|s| !s.is_empty())?;
        if let Some(code) = self.codes.get(original) {
            return Some(code.clone());
        }
        let upper = original.to_uppercase();
        Some(self.codes.get(&upper).cloned().unwrap_or(upper))
    }
}
