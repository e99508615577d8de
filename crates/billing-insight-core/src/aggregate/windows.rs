//! Reporting windows resolved against a [`ReportingCalendar`].

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::ReportingCalendar;
use crate::error::BillingInsightError;

/// A date range over which items are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    #[default]
    AllTime,
    /// `[reference − days, reference]`
    Rolling { days: u32 },
    YearToDate,
    QuarterToDate,
    FiscalYear,
    /// The fiscal year plus the `n − 1` years before it.
    TrailingYears(u32),
}

impl TimeWindow {
    /// Inclusive `(start, end)` bounds, `None` for [`TimeWindow::AllTime`].
    pub fn bounds(&self, cal: &ReportingCalendar) -> Option<(NaiveDate, NaiveDate)> {
        let reference = cal.reference_date;
        match *self {
            TimeWindow::AllTime => None,
            TimeWindow::Rolling { days } => {
                let start = reference
                    .checked_sub_signed(Duration::days(i64::from(days)))
                    .unwrap_or(NaiveDate::MIN);
                Some((start, reference))
            }
            TimeWindow::YearToDate => Some((
                cal.fiscal_year_start,
                reference.min(cal.fiscal_year_end),
            )),
            TimeWindow::QuarterToDate => Some((fiscal_quarter_start(cal), reference)),
            TimeWindow::FiscalYear => Some((cal.fiscal_year_start, cal.fiscal_year_end)),
            TimeWindow::TrailingYears(years) => {
                let back = Months::new(12 * years.saturating_sub(1));
                let start = cal
                    .fiscal_year_start
                    .checked_sub_months(back)
                    .unwrap_or(NaiveDate::MIN);
                Some((start, cal.fiscal_year_end))
            }
        }
    }

    /// Whether an item dated `date` falls in the window. Undated items
    /// belong only to the unbounded window.
    pub fn contains(&self, date: Option<NaiveDate>, cal: &ReportingCalendar) -> bool {
        match (self.bounds(cal), date) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some((start, end)), Some(d)) => start <= d && d <= end,
        }
    }

    /// Human label used in report headers.
    pub fn label(&self) -> String {
        match *self {
            TimeWindow::AllTime => "All Time".to_string(),
            TimeWindow::Rolling { days: 30 } => "1 Month".to_string(),
            TimeWindow::Rolling { days: 90 } => "3 Months".to_string(),
            TimeWindow::Rolling { days: 180 } => "6 Months".to_string(),
            TimeWindow::Rolling { days } => format!("{} Days", days),
            TimeWindow::YearToDate => "YTD".to_string(),
            TimeWindow::QuarterToDate => "QTD".to_string(),
            TimeWindow::FiscalYear => "Fiscal Year".to_string(),
            TimeWindow::TrailingYears(1) => "1 Year".to_string(),
            TimeWindow::TrailingYears(n) => format!("{} Years", n),
        }
    }
}

/// First day of the fiscal quarter containing the reference date.
fn fiscal_quarter_start(cal: &ReportingCalendar) -> NaiveDate {
    let quarter = Months::new(3);
    let mut start = cal.fiscal_year_start;
    if cal.reference_date >= start {
        while let Some(next) = start.checked_add_months(quarter) {
            if next > cal.reference_date {
                break;
            }
            start = next;
        }
    } else {
        while start > cal.reference_date {
            match start.checked_sub_months(quarter) {
                Some(prev) => start = prev,
                None => break,
            }
        }
    }
    start
}

impl FromStr for TimeWindow {
    type Err = BillingInsightError;

    /// Accepts `all`, `ytd`, `qtd`, `fy`, `1m`, `3m`, `6m`, `<N>d` and `<N>y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let window = match name.as_str() {
            "all" | "all-time" => TimeWindow::AllTime,
            "ytd" => TimeWindow::YearToDate,
            "qtd" => TimeWindow::QuarterToDate,
            "fy" | "fiscal-year" => TimeWindow::FiscalYear,
            "1m" => TimeWindow::Rolling { days: 30 },
            "3m" => TimeWindow::Rolling { days: 90 },
            "6m" => TimeWindow::Rolling { days: 180 },
            other => {
                let parsed = if let Some(n) = other.strip_suffix('d') {
                    n.parse::<u32>().ok().map(|days| TimeWindow::Rolling { days })
                } else if let Some(n) = other.strip_suffix('y') {
                    n.parse::<u32>()
                        .ok()
                        .filter(|years| *years > 0)
                        .map(TimeWindow::TrailingYears)
                } else {
                    None
                };
                parsed.ok_or_else(|| {
                    BillingInsightError::DateError(format!(
                        "unknown time window '{}' (expected all, ytd, qtd, fy, 1m, 3m, 6m, <N>d or <N>y)",
                        s
                    ))
                })?
            }
        };
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::test_support::ymd;

    fn fy2025() -> ReportingCalendar {
        ReportingCalendar {
            reference_date: ymd(2025, 11, 15),
            fiscal_year_start: ymd(2025, 1, 1),
            fiscal_year_end: ymd(2025, 12, 31),
        }
    }

    #[test]
    fn test_all_time_is_unbounded() {
        let cal = fy2025();
        assert_eq!(TimeWindow::AllTime.bounds(&cal), None);
        assert!(TimeWindow::AllTime.contains(None, &cal));
    }

    #[test]
    fn test_rolling_window_bounds() {
        let cal = fy2025();
        let w = TimeWindow::Rolling { days: 90 };
        assert_eq!(w.bounds(&cal), Some((ymd(2025, 8, 17), ymd(2025, 11, 15))));
        assert!(w.contains(Some(ymd(2025, 8, 17)), &cal));
        assert!(!w.contains(Some(ymd(2025, 8, 16)), &cal));
        assert!(!w.contains(Some(ymd(2025, 11, 16)), &cal));
    }

    #[test]
    fn test_bounded_window_excludes_undated() {
        assert!(!TimeWindow::FiscalYear.contains(None, &fy2025()));
    }

    #[test]
    fn test_ytd_capped_at_fiscal_end() {
        let mut cal = fy2025();
        cal.reference_date = ymd(2026, 2, 1);
        assert_eq!(
            TimeWindow::YearToDate.bounds(&cal),
            Some((ymd(2025, 1, 1), ymd(2025, 12, 31)))
        );
    }

    #[test]
    fn test_qtd_calendar_fiscal_year() {
        assert_eq!(
            TimeWindow::QuarterToDate.bounds(&fy2025()),
            Some((ymd(2025, 10, 1), ymd(2025, 11, 15)))
        );
    }

    #[test]
    fn test_qtd_offset_fiscal_year() {
        let cal = ReportingCalendar {
            reference_date: ymd(2025, 9, 10),
            fiscal_year_start: ymd(2025, 7, 1),
            fiscal_year_end: ymd(2026, 6, 30),
        };
        assert_eq!(
            TimeWindow::QuarterToDate.bounds(&cal),
            Some((ymd(2025, 7, 1), ymd(2025, 9, 10)))
        );
    }

    #[test]
    fn test_trailing_years() {
        assert_eq!(
            TimeWindow::TrailingYears(5).bounds(&fy2025()),
            Some((ymd(2021, 1, 1), ymd(2025, 12, 31)))
        );
        assert_eq!(
            TimeWindow::TrailingYears(1).bounds(&fy2025()),
            TimeWindow::FiscalYear.bounds(&fy2025())
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("ytd".parse::<TimeWindow>().unwrap(), TimeWindow::YearToDate);
        assert_eq!(
            "3m".parse::<TimeWindow>().unwrap(),
            TimeWindow::Rolling { days: 90 }
        );
        assert_eq!(
            "45d".parse::<TimeWindow>().unwrap(),
            TimeWindow::Rolling { days: 45 }
        );
        assert_eq!(
            "5Y".parse::<TimeWindow>().unwrap(),
            TimeWindow::TrailingYears(5)
        );
        assert!("0y".parse::<TimeWindow>().is_err());
        assert!("fortnight".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_labels() {
        let label = |s: &str| s.parse::<TimeWindow>().unwrap().label();
        assert_eq!(label("1m"), "1 Month");
        assert_eq!(label("3m"), "3 Months");
        assert_eq!(label("6m"), "6 Months");
        assert_eq!(label("45d"), "45 Days");
        assert_eq!(label("1y"), "1 Year");
        assert_eq!(label("5y"), "5 Years");
        assert_eq!(label("all"), "All Time");
    }
}
