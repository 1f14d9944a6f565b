//! Simple pattern mining over recent scored days

use super::format_hours;
use crate::plan::signed;
use crate::stats::{mean, round_half_up};
use crate::types::{DailyRecord, Level};
use serde::{Deserialize, Serialize};

/// Minimum scored days before patterns are mined
const MIN_USABLE_DAYS: usize = 5;

/// Minimum days with the relevant signal for a split comparison
const MIN_SPLIT_DAYS: usize = 6;

/// Minimum samples per group
const MIN_GROUP: usize = 2;

/// Minimum spread between mood groups worth reporting
const MIN_MOOD_SPREAD: i32 = 6;

const MAX_PATTERNS: usize = 6;

/// A plain-language pattern found in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternItem {
    pub title: String,
    pub detail: String,
}

impl PatternItem {
    fn new(title: &str, detail: String) -> Self {
        Self {
            title: title.to_string(),
            detail,
        }
    }
}

fn rounded_mean(values: &[f64]) -> i32 {
    mean(values).map(|m| round_half_up(m) as i32).unwrap_or(0)
}

/// Upper median used to split days into two groups
fn split_point(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted[sorted.len() / 2]
}

/// Mine patterns from the given days
pub fn build_patterns(days: &[DailyRecord]) -> Vec<PatternItem> {
    let usable: Vec<(&DailyRecord, f64)> = days.iter().filter_map(|d| d.index_f64().map(|i| (d, i))).collect();

    if usable.len() < MIN_USABLE_DAYS {
        return vec![PatternItem::new(
            "Not enough history yet",
            "Log a few more days (wearables + check-ins) to unlock pattern insights.".to_string(),
        )];
    }

    let mut items = Vec::new();
    items.extend(mood_pattern(&usable));
    items.extend(sleep_pattern(&usable));
    items.extend(recovery_pattern(&usable));
    items.extend(stress_pattern(&usable));

    if items.is_empty() {
        items.push(PatternItem::new(
            "No strong patterns detected yet",
            "Keep logging consistently for a clearer signal (more days + more complete inputs).".to_string(),
        ));
    }

    items.truncate(MAX_PATTERNS);
    items
}

fn mood_pattern(usable: &[(&DailyRecord, f64)]) -> Option<PatternItem> {
    let mut by_mood: [Vec<f64>; 4] = Default::default();
    for (record, index) in usable {
        if let Some(mood) = record.mood() {
            by_mood[(mood.get() - 1) as usize].push(*index);
        }
    }

    let groups: Vec<(Level, i32, usize)> = by_mood
        .iter()
        .enumerate()
        .filter(|(_, v)| v.len() >= MIN_GROUP)
        .filter_map(|(i, v)| Level::new(i as u8 + 1).map(|level| (level, rounded_mean(v), v.len())))
        .collect();

    if groups.len() < 2 {
        return None;
    }

    let (low_mood, low_mean, low_n) = groups[0];
    let (high_mood, high_mean, high_n) = groups[groups.len() - 1];
    let diff = high_mean - low_mean;
    if diff.abs() < MIN_MOOD_SPREAD {
        return None;
    }

    Some(PatternItem::new(
        "Mood is linked with your LBI",
        format!(
            "On mood {} days your average LBI was {high_mean} (n={high_n}). On mood {} days it was {low_mean} (n={low_n}). Difference: {}.",
            high_mood.mood_emoji(),
            low_mood.mood_emoji(),
            signed(diff)
        ),
    ))
}

/// Split indices by whether `signal` is above the upper median
fn median_split(usable: &[(&DailyRecord, f64)], signal: impl Fn(&DailyRecord) -> Option<f64>) -> Option<(f64, Vec<f64>, Vec<f64>)> {
    let with_signal: Vec<(f64, f64)> = usable
        .iter()
        .filter_map(|(record, index)| signal(record).map(|s| (s, *index)))
        .collect();
    if with_signal.len() < MIN_SPLIT_DAYS {
        return None;
    }

    let values: Vec<f64> = with_signal.iter().map(|(s, _)| *s).collect();
    let median = split_point(&values);
    let low: Vec<f64> = with_signal.iter().filter(|(s, _)| *s <= median).map(|(_, i)| *i).collect();
    let high: Vec<f64> = with_signal.iter().filter(|(s, _)| *s > median).map(|(_, i)| *i).collect();

    (low.len() >= MIN_GROUP && high.len() >= MIN_GROUP).then_some((median, low, high))
}

fn sleep_pattern(usable: &[(&DailyRecord, f64)]) -> Option<PatternItem> {
    let (median, low, high) = median_split(usable, DailyRecord::sleep_hours)?;
    let (high_mean, low_mean) = (rounded_mean(&high), rounded_mean(&low));
    let diff = split_diff(&high, &low);
    Some(PatternItem::new(
        "More sleep tends to align with higher scores",
        format!(
            "When sleep was above your median ({}), average LBI was {high_mean}. When it was at/below median, it was {low_mean}. Difference: {}.",
            format_hours(median),
            signed(diff)
        ),
    ))
}

fn recovery_pattern(usable: &[(&DailyRecord, f64)]) -> Option<PatternItem> {
    let (median, low, high) = median_split(usable, DailyRecord::recovery)?;
    let (high_mean, low_mean) = (rounded_mean(&high), rounded_mean(&low));
    let diff = split_diff(&high, &low);
    Some(PatternItem::new(
        "Recovery is associated with your LBI",
        format!(
            "When recovery was above your median ({}), average LBI was {high_mean}. When it was at/below median, it was {low_mean}. Difference: {}.",
            round_half_up(median),
            signed(diff)
        ),
    ))
}

fn stress_pattern(usable: &[(&DailyRecord, f64)]) -> Option<PatternItem> {
    let with_stress: Vec<(u8, f64)> = usable
        .iter()
        .filter_map(|(record, index)| record.stress_count().map(|c| (c, *index)))
        .collect();
    if with_stress.len() < MIN_SPLIT_DAYS {
        return None;
    }

    let high: Vec<f64> = with_stress.iter().filter(|(c, _)| *c >= 3).map(|(_, i)| *i).collect();
    let low: Vec<f64> = with_stress.iter().filter(|(c, _)| *c <= 1).map(|(_, i)| *i).collect();
    if high.len() < MIN_GROUP || low.len() < MIN_GROUP {
        return None;
    }

    let diff = split_diff(&low, &high);
    Some(PatternItem::new(
        "Stress indicators matter",
        format!(
            "On low-stress days (0–1 indicators) average LBI was {}. On high-stress days (3+ indicators) it was {}. Difference: {}.",
            rounded_mean(&low),
            rounded_mean(&high),
            signed(diff)
        ),
    ))
}

/// Rounded difference of unrounded group means
fn split_diff(a: &[f64], b: &[f64]) -> i32 {
    let a = mean(a).unwrap_or(0.0);
    let b = mean(b).unwrap_or(0.0);
    round_half_up(a - b) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckIn, StressIndicators, WearableMetrics};
    use chrono::{Duration, NaiveDate};

    fn make_test_day(offset: i64, index: u8, sleep: f64, recovery: f64, mood: u8, stress: u8) -> DailyRecord {
        let mut record = DailyRecord::new(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + Duration::days(offset));
        record.index = Some(index);
        record.wearable = Some(WearableMetrics::new(recovery, sleep, None));
        record.check_in = Some(CheckIn::new(Level::new(mood).unwrap(), StressIndicators::with_count(stress)));
        record
    }

    #[test]
    fn test_not_enough_history() {
        let days: Vec<DailyRecord> = (0..4).map(|i| make_test_day(i, 60, 7.0, 60.0, 3, 0)).collect();
        let items = build_patterns(&days);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Not enough history yet");
    }

    #[test]
    fn test_flat_history_has_no_patterns() {
        let days: Vec<DailyRecord> = (0..8).map(|i| make_test_day(i, 60, 7.0, 60.0, 3, 2)).collect();
        let items = build_patterns(&days);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "No strong patterns detected yet");
    }

    #[test]
    fn test_clear_patterns_detected() {
        let days = vec![
            make_test_day(0, 40, 5.5, 30.0, 1, 4),
            make_test_day(1, 42, 6.0, 35.0, 1, 3),
            make_test_day(2, 45, 6.2, 40.0, 2, 3),
            make_test_day(3, 70, 7.5, 70.0, 4, 0),
            make_test_day(4, 72, 8.0, 75.0, 4, 1),
            make_test_day(5, 75, 8.2, 80.0, 4, 0),
        ];
        let items = build_patterns(&days);
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Mood is linked with your LBI",
                "More sleep tends to align with higher scores",
                "Recovery is associated with your LBI",
                "Stress indicators matter",
            ]
        );
        assert_eq!(
            items[0].detail,
            "On mood 😄 days your average LBI was 72 (n=3). On mood 😖 days it was 41 (n=2). Difference: +31."
        );
        // Upper median of six sleeps is 7.5h; only 8.0 and 8.2 are above it
        assert!(items[1].detail.starts_with("When sleep was above your median (7h 30m), average LBI was 74."));
        assert!(items[3].detail.ends_with("Difference: +30."));
    }
}
