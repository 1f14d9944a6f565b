//! Supervised dataset for next-day drop prediction
//!
//! Each row describes day `t` as features z-scored against a trailing window
//! ending at `t`, labelled with whether day `t+1` dropped below that window's
//! mean by more than `k` standard deviations.

use crate::stats::population_sd;
use crate::types::DailyRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Feature names in vector order
pub const FEATURE_NAMES: [&str; 6] = [
    "recovery_z",
    "sleep_hours_z",
    "strain_z",
    "mood_z",
    "stress_z",
    "index_z",
];

/// Number of features per row
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Floor applied to every standard deviation used as a denominator
const MIN_STD: f64 = 1e-3;

/// Dataset construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Trailing window length in qualifying records
    pub window_days: usize,
    /// Drop threshold in standard deviations below the window mean
    pub k: f64,
    /// Minimum valid samples per feature window
    pub min_samples: usize,
    /// Largest gap in days between `t` and `t+1`
    pub max_gap_days: i64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            window_days: 14,
            k: 0.75,
            min_samples: 7,
            max_gap_days: 3,
        }
    }
}

/// One supervised row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub x: [f64; FEATURE_COUNT],
    pub y_index_drop: u8,
    pub y_recovery_drop: u8,
}

#[derive(Debug, Clone, Copy)]
struct WindowStats {
    mean: f64,
    std: f64,
}

impl WindowStats {
    fn z(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    fn drop_threshold(&self, k: f64) -> f64 {
        self.mean - k * self.std
    }
}

fn mood_unit(record: &DailyRecord) -> Option<f64> {
    record.check_in.as_ref().map(|c| c.mood_unit())
}

fn stress_unit(record: &DailyRecord) -> Option<f64> {
    record.check_in.as_ref().map(|c| c.stress_indicators.fraction())
}

/// Mean and floored population std of a window, `None` below `min_samples` values
fn window_stats(
    window: &[&DailyRecord],
    getter: fn(&DailyRecord) -> Option<f64>,
    min_samples: usize,
) -> Option<WindowStats> {
    let values: Vec<f64> = window
        .iter()
        .filter_map(|r| getter(r))
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() || values.len() < min_samples {
        return None;
    }
    Some(WindowStats {
        mean: values.iter().sum::<f64>() / values.len() as f64,
        std: population_sd(&values).max(MIN_STD),
    })
}

/// Build rows from any set of records; unqualified records are ignored
pub fn build_dataset(records: &[DailyRecord], config: &DatasetConfig) -> Vec<FeatureRow> {
    let mut qualifying: Vec<&DailyRecord> = records
        .iter()
        .filter(|r| r.wearable.is_some() && r.index.is_some())
        .collect();
    qualifying.sort_by(|a, b| a.date.cmp(&b.date));

    let window_days = config.window_days.max(1);
    let min_samples = config.min_samples.min(window_days);

    let stats_at = |i: usize, getter: fn(&DailyRecord) -> Option<f64>| {
        let start = (i + 1).saturating_sub(window_days);
        window_stats(&qualifying[start..=i], getter, min_samples)
    };

    let mut rows = Vec::new();
    for i in 0..qualifying.len().saturating_sub(1) {
        let (t, next) = (qualifying[i], qualifying[i + 1]);

        let gap = (next.date - t.date).num_days();
        if gap < 1 || gap > config.max_gap_days {
            continue;
        }

        let (Some(wearable), Some(index)) = (t.wearable.as_ref(), t.index_f64()) else {
            continue;
        };
        let (Some(mood), Some(stress), Some(strain)) = (mood_unit(t), stress_unit(t), wearable.strain) else {
            continue;
        };
        let (Some(next_index), Some(next_recovery)) = (next.index_f64(), next.recovery()) else {
            continue;
        };

        let Some(index_stats) = stats_at(i, DailyRecord::index_f64) else {
            continue;
        };
        let Some(recovery_stats) = stats_at(i, DailyRecord::recovery) else {
            continue;
        };
        let Some(sleep_stats) = stats_at(i, DailyRecord::sleep_hours) else {
            continue;
        };
        let Some(strain_stats) = stats_at(i, DailyRecord::strain) else {
            continue;
        };
        let Some(mood_stats) = stats_at(i, mood_unit) else {
            continue;
        };
        let Some(stress_stats) = stats_at(i, stress_unit) else {
            continue;
        };

        let x = [
            recovery_stats.z(wearable.recovery),
            sleep_stats.z(wearable.sleep_hours),
            strain_stats.z(strain),
            mood_stats.z(mood),
            stress_stats.z(stress),
            index_stats.z(index),
        ];
        if x.iter().any(|v| !v.is_finite()) {
            continue;
        }

        rows.push(FeatureRow {
            date: t.date,
            x,
            y_index_drop: u8::from(next_index < index_stats.drop_threshold(config.k)),
            y_recovery_drop: u8::from(next_recovery < recovery_stats.drop_threshold(config.k)),
        });
    }

    debug!(
        qualifying = qualifying.len(),
        rows = rows.len(),
        "built risk dataset"
    );
    rows
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{CheckIn, Level, StressIndicators, WearableMetrics};
    use chrono::Duration;

    /// Deterministic, varied history of `days` consecutive fully logged days
    pub(crate) fn make_test_history(days: usize) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        (0..days)
            .map(|i| {
                let phase = (i * 7 % 11) as f64;
                let mut record = DailyRecord::new(start + Duration::days(i as i64));
                record.wearable = Some(WearableMetrics::new(
                    35.0 + phase * 5.0,
                    5.5 + (i % 4) as f64 * 0.75,
                    Some(6.0 + (i % 5) as f64 * 2.5),
                ));
                record.check_in = Some(CheckIn::new(
                    Level::new(1 + (i * 3 % 4) as u8).unwrap(),
                    StressIndicators::with_count((i % 6) as u8),
                ));
                record.index = Some(35 + (phase * 4.0) as u8 + (i % 3) as u8);
                record
            })
            .collect()
    }

    #[test]
    fn test_short_history_has_no_rows() {
        // Fewer than seven samples per window can never produce a row
        let rows = build_dataset(&make_test_history(7), &DatasetConfig::default());
        assert!(rows.is_empty());
    }

    #[test]
    fn test_rows_start_once_window_has_enough_samples() {
        let history = make_test_history(12);
        let rows = build_dataset(&history, &DatasetConfig::default());
        // t ranges over indices 6..=10
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].date, history[6].date);
        assert!(rows.iter().all(|r| r.y_index_drop <= 1 && r.y_recovery_drop <= 1));
    }

    #[test]
    fn test_gap_and_missing_check_in_skip_rows() {
        let mut history = make_test_history(12);
        // Day index 8 loses its check-in; day 10 moves five days later
        history[8].check_in = None;
        history[10].date = history[10].date + Duration::days(5);
        history[11].date = history[11].date + Duration::days(5);

        let rows = build_dataset(&history, &DatasetConfig::default());
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert!(!dates.contains(&history[8].date));
        assert!(!dates.contains(&history[9].date));
        assert!(dates.contains(&history[10].date));
    }

    #[test]
    fn test_missing_strain_skips_row() {
        let mut history = make_test_history(10);
        if let Some(w) = history[8].wearable.as_mut() {
            w.strain = None;
        }
        let rows = build_dataset(&history, &DatasetConfig::default());
        assert!(rows.iter().all(|r| r.date != history[8].date));
    }

    #[test]
    fn test_constant_signal_uses_floored_std() {
        let mut history = make_test_history(9);
        for record in &mut history {
            if let Some(w) = record.wearable.as_mut() {
                w.sleep_hours = 7.0;
            }
        }
        let rows = build_dataset(&history, &DatasetConfig::default());
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.x[1] == 0.0));
    }
}
