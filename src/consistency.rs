//! Consistency and stability scoring
//!
//! Rewards steady sleep, recovery and mood plus regular logging over a
//! trailing window. Lower day-to-day spread means a higher score.

use crate::stats::{round_half_up, sample_sd};
use crate::types::{records_up_to, DailyRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default trailing window in days
pub const DEFAULT_CONSISTENCY_WINDOW: usize = 14;

/// Standard deviation at which a component bottoms out
const MAX_SLEEP_SD: f64 = 1.5;
const MAX_RECOVERY_SD: f64 = 20.0;
const MAX_MOOD_SD: f64 = 1.2;

/// Regularity below which a note is added (percent)
const REGULARITY_NOTE_THRESHOLD: u8 = 60;

/// Per-component consistency scores (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyComponents {
    pub sleep_consistency: u8,
    pub recovery_consistency: u8,
    pub mood_stability: u8,
    pub check_in_regularity: u8,
    pub wearable_regularity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyOutput {
    pub score: u8,
    pub components: ConsistencyComponents,
    pub days: usize,
    pub notes: Vec<String>,
}

/// Consistency over the trailing window ending at `end`
pub fn compute_consistency_at(records: &[DailyRecord], end: NaiveDate, window_days: usize) -> ConsistencyOutput {
    compute_consistency(&records_up_to(records, end, window_days))
}

/// Consistency over all given records
pub fn compute_consistency(records: &[DailyRecord]) -> ConsistencyOutput {
    let n = records.len();

    let sleep: Vec<f64> = records.iter().filter_map(DailyRecord::sleep_hours).collect();
    let recovery: Vec<f64> = records.iter().filter_map(DailyRecord::recovery).collect();
    let mood: Vec<f64> = records.iter().filter_map(|r| r.mood().map(|m| m.get() as f64)).collect();

    let check_in_count = records.iter().filter(|r| r.check_in.is_some()).count();
    let wearable_count = records.iter().filter(|r| r.wearable.is_some()).count();

    let components = ConsistencyComponents {
        sleep_consistency: spread_to_score(sample_sd(&sleep), MAX_SLEEP_SD),
        recovery_consistency: spread_to_score(sample_sd(&recovery), MAX_RECOVERY_SD),
        mood_stability: spread_to_score(sample_sd(&mood), MAX_MOOD_SD),
        check_in_regularity: regularity(check_in_count, n),
        wearable_regularity: regularity(wearable_count, n),
    };

    let weighted = 0.25 * components.sleep_consistency as f64
        + 0.25 * components.recovery_consistency as f64
        + 0.20 * components.mood_stability as f64
        + 0.15 * components.check_in_regularity as f64
        + 0.15 * components.wearable_regularity as f64;
    let score = round_half_up(weighted).clamp(0.0, 100.0) as u8;

    let mut notes = Vec::new();
    if n < 7 {
        notes.push("Consistency is most meaningful with at least 7 days of data.".to_string());
    }
    if components.check_in_regularity < REGULARITY_NOTE_THRESHOLD {
        notes.push("Check-ins are missing often; stability estimates are less reliable.".to_string());
    }
    if components.wearable_regularity < REGULARITY_NOTE_THRESHOLD {
        notes.push("Wearable days are missing often; sleep/recovery consistency may be biased.".to_string());
    }

    ConsistencyOutput {
        score,
        components,
        days: n,
        notes,
    }
}

/// Map a standard deviation onto 0-100, lower spread scoring higher
fn spread_to_score(sd: f64, max_sd: f64) -> u8 {
    let x = (sd / max_sd).clamp(0.0, 1.0);
    round_half_up(100.0 * (1.0 - x)) as u8
}

fn regularity(count: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    round_half_up(count as f64 / total as f64 * 100.0) as u8
}
