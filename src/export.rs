//! Research exports: a flat daily CSV and JSON dumps of plans and records

use crate::error::BalanceError;
use crate::plan::SavedPlan;
use crate::types::DailyRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

const DAILY_HEADER: [&str; 21] = [
    "date",
    "wearableSource",
    "recovery",
    "sleepHours",
    "strain",
    "hrv",
    "rhr",
    "mood",
    "energy",
    "stress_muscleTension",
    "stress_racingThoughts",
    "stress_irritability",
    "stress_avoidance",
    "stress_restlessness",
    "caffeineAfter2pm",
    "alcohol",
    "deepWorkMins",
    "notes",
    "lbi",
    "baseline",
    "confidence",
];

/// Flush an in-memory CSV writer into a string
pub(crate) fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String, BalanceError> {
    let bytes = writer.into_inner().map_err(|e| BalanceError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| BalanceError::InvalidInput(format!("CSV output is not UTF-8: {e}")))
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

/// One row per record, joined with the plan saved for the same date
pub fn daily_csv(records: &[DailyRecord], plans: &[SavedPlan]) -> Result<String, BalanceError> {
    let plan_by_date: HashMap<NaiveDate, &SavedPlan> = plans.iter().map(|p| (p.date, p)).collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(DAILY_HEADER)?;
    for record in records {
        let w = record.wearable.as_ref();
        let ci = record.check_in.as_ref();
        let stress = ci.map(|c| c.stress_indicators.flags()).unwrap_or_default();
        let plan = plan_by_date.get(&record.date);

        let mut row = vec![
            record.date.to_string(),
            opt(record.wearable_source.map(|s| s.as_str())),
            opt(w.map(|w| w.recovery)),
            opt(w.map(|w| w.sleep_hours)),
            opt(w.and_then(|w| w.strain)),
            opt(w.and_then(|w| w.hrv)),
            opt(w.and_then(|w| w.resting_hr)),
            opt(ci.map(|c| c.mood.get())),
            opt(ci.and_then(|c| c.energy).map(|e| e.get())),
        ];
        row.extend(stress.iter().map(|s| flag(*s)));
        row.extend([
            flag(ci.and_then(|c| c.caffeine_after_2pm).unwrap_or(false)),
            flag(ci.and_then(|c| c.alcohol).unwrap_or(false)),
            opt(ci.and_then(|c| c.deep_work_mins).map(|d| d.get())),
            ci.and_then(|c| c.notes.clone()).unwrap_or_default(),
            opt(plan.map(|p| p.index)),
            opt(plan.and_then(|p| p.baseline)),
            opt(plan.map(|p| p.confidence.as_str())),
        ]);

        writer.write_record(&row)?;
    }
    finish_csv(writer)
}

#[derive(Serialize)]
struct PlansExport<'a> {
    exported_at: DateTime<Utc>,
    days: usize,
    data: &'a [SavedPlan],
}

#[derive(Serialize)]
struct ResearchExport<'a> {
    exported_at: DateTime<Utc>,
    days: usize,
    records: &'a [DailyRecord],
    plans: &'a [SavedPlan],
}

/// Pretty JSON export of saved plans
pub fn plans_json(plans: &[SavedPlan], days: usize, exported_at: DateTime<Utc>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&PlansExport {
        exported_at,
        days,
        data: plans,
    })
}

/// Pretty JSON export of records and plans together
pub fn research_json(
    records: &[DailyRecord],
    plans: &[SavedPlan],
    days: usize,
    exported_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ResearchExport {
        exported_at,
        days,
        records,
        plans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckIn, Confidence, Level, PlanCategory, StressIndicators, WearableMetrics, WearableSource};
    use chrono::TimeZone;

    fn make_test_record() -> DailyRecord {
        let mut record = DailyRecord::new(NaiveDate::from_ymd_opt(2026, 9, 2).unwrap());
        record.wearable = Some(WearableMetrics::new(66.0, 7.25, Some(11.0)));
        record.wearable_source = Some(WearableSource::NormalizedCsv);
        let mut check_in = CheckIn::new(
            Level::new(3).unwrap(),
            StressIndicators {
                racing_thoughts: true,
                ..Default::default()
            },
        );
        check_in.alcohol = Some(true);
        check_in.notes = Some("long day, \"busy\"".to_string());
        record.check_in = Some(check_in);
        record
    }

    fn make_test_plan(date: NaiveDate) -> SavedPlan {
        SavedPlan {
            date,
            index: 63,
            baseline: None,
            confidence: Confidence::High,
            category: PlanCategory::Normal,
            focus: String::new(),
            actions: Vec::new(),
            triggers: Vec::new(),
            explanation: None,
        }
    }

    #[test]
    fn test_daily_csv_row() {
        let record = make_test_record();
        let csv = daily_csv(&[record.clone()], &[make_test_plan(record.date)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("date,wearableSource,recovery"));
        assert_eq!(
            lines[1],
            "2026-09-02,normalized_csv,66,7.25,11,,,3,,0,1,0,0,0,0,1,,\"long day, \"\"busy\"\"\",63,,high"
        );
    }

    #[test]
    fn test_daily_csv_without_check_in_or_plan() {
        let record = DailyRecord::new(NaiveDate::from_ymd_opt(2026, 9, 3).unwrap());
        let csv = daily_csv(&[record], &[]).unwrap();
        assert_eq!(csv.lines().nth(1), Some("2026-09-03,,,,,,,,,0,0,0,0,0,0,0,,,,,"));
    }

    #[test]
    fn test_daily_csv_reads_back() {
        let record = make_test_record();
        let out = daily_csv(&[record], &[]).unwrap();
        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let header = reader.headers().unwrap().clone();
        let row = reader.records().next().unwrap().unwrap();

        assert_eq!(header.len(), 21);
        assert_eq!(row.len(), 21);
        assert_eq!(row.get(17), Some("long day, \"busy\""));
    }

    #[test]
    fn test_plans_json() {
        let at = Utc.with_ymd_and_hms(2026, 9, 4, 8, 0, 0).unwrap();
        let plan = make_test_plan(NaiveDate::from_ymd_opt(2026, 9, 2).unwrap());
        let json = plans_json(&[plan], 7, at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["days"], 7);
        assert_eq!(value["data"][0]["category"], "NORMAL");

        let research = research_json(&[make_test_record()], &[], 7, at).unwrap();
        assert!(research.contains("\"records\""));
    }
}
