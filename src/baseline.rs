//! Baseline management
//!
//! The personal baseline is the rounded rolling average of the most recent
//! scored days. It stays undefined until enough days exist to be meaningful.

use crate::stats::round_half_up;
use crate::types::{BaselineStatus, DailyRecord};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default baseline window in days
pub const DEFAULT_BASELINE_WINDOW: usize = 7;

/// Minimum scored days before a baseline is reported
pub const MIN_BASELINE_DAYS: usize = 3;

/// Baseline value together with its calibration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineMeta {
    pub baseline: Option<u8>,
    pub days_used: usize,
    pub target_days: usize,
    pub status: BaselineStatus,
}

/// Rounded mean of the last `window_days` scored records, `None` below three days
pub fn compute_baseline(records: &[DailyRecord], window_days: usize) -> Option<u8> {
    compute_baseline_meta(records, window_days).baseline
}

/// Baseline plus how many days fed it and whether the window is full
pub fn compute_baseline_meta(records: &[DailyRecord], target_days: usize) -> BaselineMeta {
    let window = recent_indices(records, target_days);
    let days_used = window.len();

    let baseline = if days_used < MIN_BASELINE_DAYS {
        None
    } else {
        rolling_average(&window).map(|avg| round_half_up(avg) as u8)
    };

    let status = if days_used >= target_days {
        BaselineStatus::Stable
    } else {
        BaselineStatus::Calibrating
    };

    BaselineMeta {
        baseline,
        days_used,
        target_days,
        status,
    }
}

/// Indices of the most recent scored records, oldest first
fn recent_indices(records: &[DailyRecord], window_size: usize) -> VecDeque<f64> {
    let mut sorted: Vec<&DailyRecord> = records.iter().filter(|r| r.index.is_some()).collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let mut window = VecDeque::with_capacity(window_size);
    for record in sorted {
        if let Some(index) = record.index_f64() {
            window.push_back(index);
            while window.len() > window_size {
                window.pop_front();
            }
        }
    }
    window
}

fn rolling_average(queue: &VecDeque<f64>) -> Option<f64> {
    if queue.is_empty() {
        return None;
    }
    let sum: f64 = queue.iter().sum();
    Some(sum / queue.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_test_records(indices: &[Option<u8>]) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        indices
            .iter()
            .enumerate()
            .map(|(i, index)| {
                let mut record = DailyRecord::new(start + Duration::days(i as i64));
                record.index = *index;
                record
            })
            .collect()
    }

    #[test]
    fn test_baseline_requires_three_days() {
        let records = make_test_records(&[Some(70), Some(80)]);
        assert!(compute_baseline(&records, 7).is_none());

        let meta = compute_baseline_meta(&records, 7);
        assert_eq!(meta.days_used, 2);
        assert_eq!(meta.status, BaselineStatus::Calibrating);
    }

    #[test]
    fn test_baseline_of_equal_days() {
        let records = make_test_records(&[Some(70), Some(70), Some(70)]);
        assert_eq!(compute_baseline(&records, 7), Some(70));
    }

    #[test]
    fn test_baseline_skips_unscored_and_uses_window() {
        let records = make_test_records(&[Some(10), Some(60), None, Some(61), Some(62)]);
        // Window of 3 drops the oldest score; mean 61
        assert_eq!(compute_baseline(&records, 3), Some(61));

        let meta = compute_baseline_meta(&records, 3);
        assert_eq!(meta.days_used, 3);
        assert_eq!(meta.status, BaselineStatus::Stable);
    }

    #[test]
    fn test_baseline_rounds_half_up() {
        let records = make_test_records(&[Some(60), Some(61), Some(60), Some(61)]);
        assert_eq!(compute_baseline(&records, 7), Some(61));
    }

    #[test]
    fn test_baseline_ignores_input_order() {
        let mut records = make_test_records(&[Some(50), Some(50), Some(50), Some(90)]);
        records.reverse();
        // Last three by date: 50, 50, 90
        assert_eq!(compute_baseline(&records, 3), Some(63));
    }
}
