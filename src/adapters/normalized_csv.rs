//! Normalized wearable CSV adapter
//!
//! Schema: `date,sleep_hours,recovery,strain,hrv,rhr` with `dd-mmm-yy` dates.
//! Header names are case-insensitive and may appear in any order; strain,
//! hrv and rhr are optional.

use super::{ImportError, ImportOutcome, WearableImportAdapter};
use crate::types::{WearableDay, WearableMetrics, WearableSource};
use chrono::NaiveDate;
use std::collections::BTreeMap;

const REQUIRED_COLUMNS: [&str; 3] = ["date", "sleep_hours", "recovery"];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse a `dd-mmm-yy` date (case-insensitive).
///
/// Two-digit years pivot at 70: `00..=69` map to 2000-2069 and `70..=99` to
/// 1970-1999. Dates that do not exist on the calendar are rejected.
pub fn parse_dd_mmm_yy(input: &str) -> Option<NaiveDate> {
    let s = input.trim().to_ascii_lowercase();
    let mut parts = s.split('-');
    let (dd, mmm, yy) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    if dd.len() != 2 || yy.len() != 2 || !dd.bytes().chain(yy.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !matches!(dd.as_bytes()[0], b'0'..=b'3') {
        return None;
    }

    let month = MONTHS.iter().position(|m| *m == mmm)? as u32 + 1;
    let day: u32 = dd.parse().ok()?;
    let yy: i32 = yy.parse().ok()?;
    let year = if yy >= 70 { 1900 + yy } else { 2000 + yy };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn to_number(value: &str) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    v.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn require_number(row: usize, field: &str, value: &str, min: f64, max: f64, errors: &mut Vec<ImportError>) -> Option<f64> {
    let Some(n) = to_number(value) else {
        errors.push(ImportError::new(row, field, "Missing or non-numeric value."));
        return None;
    };
    if n < min {
        errors.push(ImportError::new(row, field, format!("Value must be ≥ {min}.")));
        return None;
    }
    if n > max {
        errors.push(ImportError::new(row, field, format!("Value must be ≤ {max}.")));
        return None;
    }
    Some(n)
}

/// Adapter for the normalized wearable CSV export
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedCsvAdapter;

impl WearableImportAdapter for NormalizedCsvAdapter {
    fn source(&self) -> WearableSource {
        WearableSource::NormalizedCsv
    }

    fn parse(&self, input: &str) -> ImportOutcome {
        // Blank lines are dropped before rows are numbered
        let text = input.replace("\r\n", "\n").replace('\r', "\n");
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            return ImportOutcome {
                days: Vec::new(),
                errors: vec![ImportError::new(1, "csv", "CSV is empty.")],
            };
        }
        let normalized = lines.join("\n");

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(normalized.as_bytes());

        let header: Vec<String> = match reader.headers() {
            Ok(h) => h.iter().map(|name| name.to_ascii_lowercase()).collect(),
            Err(e) => {
                return ImportOutcome {
                    days: Vec::new(),
                    errors: vec![ImportError::new(1, "header", format!("Unreadable header: {e}"))],
                }
            }
        };
        let column = |name: &str| header.iter().position(|h| h == name);

        let header_errors: Vec<ImportError> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| column(name).is_none())
            .map(|name| ImportError::new(1, "header", format!("Missing required column: {name}")))
            .collect();
        if !header_errors.is_empty() {
            return ImportOutcome {
                days: Vec::new(),
                errors: header_errors,
            };
        }

        let (i_date, i_sleep, i_recovery) = match (column("date"), column("sleep_hours"), column("recovery")) {
            (Some(d), Some(s), Some(r)) => (d, s, r),
            _ => return ImportOutcome::default(),
        };
        let (i_strain, i_hrv, i_rhr) = (column("strain"), column("hrv"), column("rhr"));

        let mut errors = Vec::new();
        let mut by_date: BTreeMap<NaiveDate, WearableMetrics> = BTreeMap::new();

        for (ri, result) in reader.records().enumerate() {
            let row = ri + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    errors.push(ImportError::new(row, "csv", format!("Unreadable row: {e}")));
                    continue;
                }
            };
            let cell = |i: usize| record.get(i).unwrap_or("");
            let optional = |i: Option<usize>| i.and_then(|i| to_number(cell(i)));

            let Some(date) = parse_dd_mmm_yy(cell(i_date)) else {
                errors.push(ImportError::new(
                    row,
                    "date",
                    "Invalid date. Expected dd-mmm-yy (e.g. 01-Jan-26).",
                ));
                continue;
            };

            let sleep_hours = require_number(row, "sleep_hours", cell(i_sleep), 0.0, 24.0, &mut errors);
            let recovery = require_number(row, "recovery", cell(i_recovery), 0.0, 100.0, &mut errors);
            let (Some(sleep_hours), Some(recovery)) = (sleep_hours, recovery) else {
                continue;
            };

            by_date.insert(
                date,
                WearableMetrics {
                    recovery,
                    sleep_hours,
                    strain: optional(i_strain),
                    hrv: optional(i_hrv),
                    resting_hr: optional(i_rhr),
                },
            );
        }

        ImportOutcome {
            days: by_date
                .into_iter()
                .map(|(date, wearable)| WearableDay {
                    date,
                    wearable,
                    source: self.source(),
                })
                .collect(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(csv: &str) -> ImportOutcome {
        NormalizedCsvAdapter.parse(csv)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_dd_mmm_yy() {
        assert_eq!(parse_dd_mmm_yy("01-Jan-26"), Some(ymd(2026, 1, 1)));
        assert_eq!(parse_dd_mmm_yy(" 15-DEC-99 "), Some(ymd(1999, 12, 15)));
        assert_eq!(parse_dd_mmm_yy("29-feb-24"), Some(ymd(2024, 2, 29)));
        assert_eq!(parse_dd_mmm_yy("01-jan-69"), Some(ymd(2069, 1, 1)));
        assert_eq!(parse_dd_mmm_yy("01-jan-70"), Some(ymd(1970, 1, 1)));
        assert!(parse_dd_mmm_yy("29-feb-25").is_none());
        assert!(parse_dd_mmm_yy("31-apr-26").is_none());
        assert!(parse_dd_mmm_yy("1-jan-26").is_none());
        assert!(parse_dd_mmm_yy("01-january-26").is_none());
        assert!(parse_dd_mmm_yy("2026-01-01").is_none());
        assert!(parse_dd_mmm_yy("00-jan-26").is_none());
    }

    #[test]
    fn test_minimal_row() {
        let outcome = parse("date,sleep_hours,recovery,strain,hrv,rhr\n01-Jan-26,7.5,80,,,\n");
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.days.len(), 1);
        let day = &outcome.days[0];
        assert_eq!(day.date, ymd(2026, 1, 1));
        assert_eq!(day.wearable, WearableMetrics::new(80.0, 7.5, None));
        assert_eq!(day.source, WearableSource::NormalizedCsv);
    }

    #[test]
    fn test_out_of_range_recovery_excluded() {
        let outcome = parse("date,sleep_hours,recovery\n01-Jan-26,7.5,150\n02-Jan-26,7.0,60\n");
        assert_eq!(outcome.days.len(), 1);
        assert_eq!(outcome.errors, vec![ImportError::new(2, "recovery", "Value must be ≤ 100.")]);
    }

    #[test]
    fn test_both_numeric_errors_reported() {
        let outcome = parse("date,sleep_hours,recovery\n01-Jan-26,-1,abc\n");
        assert!(outcome.days.is_empty());
        assert_eq!(
            outcome.errors,
            vec![
                ImportError::new(2, "sleep_hours", "Value must be ≥ 0."),
                ImportError::new(2, "recovery", "Missing or non-numeric value."),
            ]
        );
    }

    #[test]
    fn test_header_any_order_and_case() {
        let outcome = parse("RHR,Recovery,Date,Sleep_Hours,Strain\n55,70,03-Mar-26,8,12.5\n");
        assert!(outcome.errors.is_empty());
        let w = outcome.days[0].wearable;
        assert_eq!(w.resting_hr, Some(55.0));
        assert_eq!(w.strain, Some(12.5));
        assert!(w.hrv.is_none());
    }

    #[test]
    fn test_missing_column_rejects() {
        let outcome = parse("date,recovery\n01-Jan-26,70\n");
        assert!(outcome.days.is_empty());
        assert!(outcome.is_rejected());
        assert_eq!(outcome.errors[0].message, "Missing required column: sleep_hours");
    }

    #[test]
    fn test_quoted_cells() {
        let outcome = parse("\"Date\",\"Sleep_Hours\",\"Recovery\",\"Strain\"\n\"01-Jan-26\",\"7.5\",\"80\",\" 12.5 \"\n");
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.days.len(), 1);
        assert_eq!(outcome.days[0].date, ymd(2026, 1, 1));
        assert_eq!(outcome.days[0].wearable, WearableMetrics::new(80.0, 7.5, Some(12.5)));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let outcome = parse("date,sleep_hours,recovery,strain,hrv,rhr\n02-Jan-26,6.5,55\n");
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.days[0].wearable.strain, None);
    }

    #[test]
    fn test_empty_csv() {
        let outcome = parse("\n  \r\n");
        assert_eq!(outcome.errors, vec![ImportError::new(1, "csv", "CSV is empty.")]);
    }

    #[test]
    fn test_duplicates_keep_last_and_sort() {
        let outcome = parse(
            "date,sleep_hours,recovery\r\n05-Jan-26,7,70\r\n\r\n02-Jan-26,6,50\r\nbad-date,7,70\r\n05-Jan-26,8,90\r\n",
        );
        let dates: Vec<NaiveDate> = outcome.days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![ymd(2026, 1, 2), ymd(2026, 1, 5)]);
        assert_eq!(outcome.days[1].wearable.recovery, 90.0);
        // Blank lines are dropped before numbering rows
        assert_eq!(outcome.errors[0].row, 4);
        assert_eq!(outcome.errors[0].field, "date");
    }
}
