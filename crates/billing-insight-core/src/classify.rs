//! Retail (self-pay) versus insurance classification.
//!
//! Invoice exports carry a policy payor level; sales-order exports carry
//! three item-level insurance flags. Both feed the same total, exclusive
//! classification so the rest of the pipeline never needs to know which
//! export an item came from.

use serde::{Deserialize, Serialize};

/// Payor levels that bill an insurer.
const INSURANCE_LEVELS: [&str; 3] = ["primary", "secondary", "tertiary"];

/// Classification input carried on each line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayorSignal {
    /// `Policy Payor Level` from invoice exports.
    Level(Option<String>),
    /// `Insurance Flags Primary/Secondary/Tertiary` from sales-order exports.
    Flags {
        primary: bool,
        secondary: bool,
        tertiary: bool,
    },
}

impl PayorSignal {
    /// Trimmed payor level for display, `"Unknown"` when absent. Flag
    /// signals report the highest payor level they bill.
    pub fn label(&self) -> String {
        match self {
            PayorSignal::Level(Some(level)) if !level.trim().is_empty() => {
                level.trim().to_string()
            }
            PayorSignal::Level(_) => "Unknown".to_string(),
            PayorSignal::Flags {
                primary,
                secondary,
                tertiary,
            } => match (primary, secondary, tertiary) {
                (true, _, _) => "Primary",
                (false, true, _) => "Secondary",
                (false, false, true) => "Tertiary",
                _ => "Patient",
            }
            .to_string(),
        }
    }

    /// Number of insurance levels this item bills.
    pub fn insurance_levels(&self) -> u32 {
        match self {
            PayorSignal::Level(level) => {
                let normalized = normalize_level(level.as_deref());
                u32::from(INSURANCE_LEVELS.contains(&normalized.as_str()))
            }
            PayorSignal::Flags {
                primary,
                secondary,
                tertiary,
            } => u32::from(*primary) + u32::from(*secondary) + u32::from(*tertiary),
        }
    }
}

/// Result of classification. Exactly one of retail/insurance holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayorClass {
    Retail,
    Insurance,
}

impl PayorClass {
    pub fn is_retail(&self) -> bool {
        matches!(self, PayorClass::Retail)
    }

    pub fn is_insurance(&self) -> bool {
        matches!(self, PayorClass::Insurance)
    }
}

fn normalize_level(level: Option<&str>) -> String {
    level.map(|s| s.trim().to_lowercase()).unwrap_or_default()
}

/// Classify one item. Only an explicit `patient` payor level, or a flag
/// signal with no flag set, is retail; unknown or missing payor levels
/// count as insurance.
pub fn classify(signal: &PayorSignal) -> PayorClass {
    match signal {
        PayorSignal::Level(level) => {
            if normalize_level(level.as_deref()) == "patient" {
                PayorClass::Retail
            } else {
                PayorClass::Insurance
            }
        }
        PayorSignal::Flags {
            primary,
            secondary,
            tertiary,
        } => {
            if !primary && !secondary && !tertiary {
                PayorClass::Retail
            } else {
                PayorClass::Insurance
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(s: Option<&str>) -> PayorSignal {
        PayorSignal::Level(s.map(String::from))
    }

    fn flags(primary: bool, secondary: bool, tertiary: bool) -> PayorSignal {
        PayorSignal::Flags {
            primary,
            secondary,
            tertiary,
        }
    }

    #[test]
    fn test_patient_level_is_retail() {
        assert_eq!(classify(&level(Some("Patient"))), PayorClass::Retail);
        assert_eq!(classify(&level(Some("  PATIENT "))), PayorClass::Retail);
    }

    #[test]
    fn test_insurer_levels_are_insurance() {
        for l in ["Primary", "secondary", " Tertiary "] {
            assert_eq!(classify(&level(Some(l))), PayorClass::Insurance, "{l}");
        }
    }

    #[test]
    fn test_unknown_or_missing_level_defaults_to_insurance() {
        assert_eq!(classify(&level(None)), PayorClass::Insurance);
        assert_eq!(classify(&level(Some(""))), PayorClass::Insurance);
        assert_eq!(classify(&level(Some("Guarantor"))), PayorClass::Insurance);
    }

    #[test]
    fn test_no_flags_is_retail() {
        assert_eq!(classify(&flags(false, false, false)), PayorClass::Retail);
    }

    #[test]
    fn test_any_flag_is_insurance() {
        assert_eq!(classify(&flags(true, false, false)), PayorClass::Insurance);
        assert_eq!(classify(&flags(false, true, false)), PayorClass::Insurance);
        assert_eq!(classify(&flags(false, false, true)), PayorClass::Insurance);
    }

    #[test]
    fn test_classification_is_exclusive() {
        let signals = vec![
            level(Some("Patient")),
            level(Some("Primary")),
            level(None),
            flags(false, false, false),
            flags(true, true, true),
        ];
        for s in &signals {
            let c = classify(s);
            assert!(c.is_retail() ^ c.is_insurance());
        }
    }

    #[test]
    fn test_insurance_level_count() {
        assert_eq!(flags(true, true, false).insurance_levels(), 2);
        assert_eq!(flags(false, false, false).insurance_levels(), 0);
        assert_eq!(level(Some("Secondary")).insurance_levels(), 1);
        assert_eq!(level(Some("Patient")).insurance_levels(), 0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(level(Some(" Primary ")).label(), "Primary");
        assert_eq!(level(None).label(), "Unknown");
        assert_eq!(flags(false, true, true).label(), "Secondary");
        assert_eq!(flags(false, false, false).label(), "Patient");
    }
}
