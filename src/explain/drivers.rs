//! Score drivers and accuracy reasons for a single day

use super::format_hours;
use crate::plan::signed;
use crate::score::{score, ScoreInput};
use crate::types::{DailyRecord, Direction, NeutralSignals, Strength};
use serde::{Deserialize, Serialize};

/// Reference subscore that drivers are compared against
const DRIVER_REFERENCE: i32 = 60;

/// Maximum drivers reported for a day
const MAX_DRIVERS: usize = 3;

/// A signal pushing the index up or down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub direction: Direction,
    pub strength: Strength,
}

/// Whether an input that improves accuracy was present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyReason {
    pub ok: bool,
    pub label: String,
    pub detail: String,
}

/// Strength tier for a delta
pub fn strength_from_delta(delta: i32) -> Strength {
    match delta.abs() {
        d if d >= 25 => Strength::Strong,
        d if d >= 12 => Strength::Moderate,
        _ => Strength::Mild,
    }
}

#[derive(Clone, Copy)]
enum Component {
    Recovery,
    Sleep,
    Mood,
    Stress,
}

/// Top drivers for the day, strongest first
pub fn compute_drivers(record: Option<&DailyRecord>) -> Vec<Driver> {
    let record = match record {
        Some(r) => r,
        None => {
            return vec![Driver {
                label: "No data saved for this day".to_string(),
                detail: Some("Add a check-in and/or import wearable data to generate an explanation.".to_string()),
                direction: Direction::Down,
                strength: Strength::Strong,
            }]
        }
    };

    if record.wearable.is_none() && record.check_in.is_none() {
        return vec![Driver {
            label: "Not enough inputs to compute drivers".to_string(),
            detail: Some("Add at least a check-in or wearable data.".to_string()),
            direction: Direction::Down,
            strength: Strength::Moderate,
        }];
    }

    let neutral = NeutralSignals::MISSING;
    let subs = score(&ScoreInput::new(
        record.recovery().unwrap_or(neutral.recovery),
        record.sleep_hours().unwrap_or(neutral.sleep_hours),
        record.strain(),
        record.check_in.clone(),
    ))
    .subscores;

    let mut deltas = [
        (Component::Recovery, "Recovery", subs.recovery as i32 - DRIVER_REFERENCE),
        (Component::Sleep, "Sleep", subs.sleep as i32 - DRIVER_REFERENCE),
        (Component::Mood, "Mood", subs.mood as i32 - DRIVER_REFERENCE),
        (Component::Stress, "Stress", subs.stress as i32 - DRIVER_REFERENCE),
    ];
    deltas.sort_by_key(|(_, _, delta)| std::cmp::Reverse(delta.abs()));

    deltas
        .iter()
        .take(MAX_DRIVERS)
        .map(|(component, label, delta)| Driver {
            label: label.to_string(),
            detail: driver_detail(*component, record),
            direction: Direction::of(*delta as f64),
            strength: strength_from_delta(*delta),
        })
        .collect()
}

fn driver_detail(component: Component, record: &DailyRecord) -> Option<String> {
    match component {
        Component::Recovery => record
            .recovery()
            .map(|r| format!("Wearable recovery: {}/100.", crate::stats::round_half_up(r))),
        Component::Sleep => record.sleep_hours().map(|h| format!("Sleep: {}.", format_hours(h))),
        Component::Mood => record.mood().map(|m| format!("Mood check-in: {}/4.", m.mood_emoji())),
        Component::Stress => record
            .stress_count()
            .map(|c| format!("Stress indicators selected: {c}.")),
    }
}

/// Framing driver for the index relative to the baseline, `None` when level or unknown
pub fn baseline_driver(delta: Option<i32>) -> Option<Driver> {
    let delta = delta.filter(|d| *d != 0)?;
    Some(Driver {
        label: if delta > 0 { "Above baseline" } else { "Below baseline" }.to_string(),
        detail: Some(format!("Change vs baseline: {}.", signed(delta))),
        direction: Direction::of(delta as f64),
        strength: strength_from_delta(delta),
    })
}

/// The three fixed accuracy checks
pub fn accuracy_reasons(record: Option<&DailyRecord>, baseline: Option<u8>) -> Vec<AccuracyReason> {
    let has_wearable = record.is_some_and(|r| r.wearable.is_some());
    let has_check_in = record.is_some_and(|r| r.check_in.is_some());

    vec![
        AccuracyReason {
            ok: has_wearable,
            label: "Wearable signals present".to_string(),
            detail: if has_wearable {
                "Recovery and sleep were available for this day."
            } else {
                "Import wearables to improve accuracy (sleep/recovery/strain)."
            }
            .to_string(),
        },
        AccuracyReason {
            ok: has_check_in,
            label: "Daily check-in present".to_string(),
            detail: if has_check_in {
                "Mood and stress indicators were captured."
            } else {
                "Add a quick check-in to improve emotional context."
            }
            .to_string(),
        },
        AccuracyReason {
            ok: baseline.is_some(),
            label: "Baseline available".to_string(),
            detail: match baseline {
                Some(b) => format!("Baseline used: {b}."),
                None => "Baseline needs at least 3 recent days with an LBI score.".to_string(),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckIn, Level, StressIndicators, WearableMetrics};
    use chrono::NaiveDate;

    fn make_test_record(wearable: Option<WearableMetrics>, check_in: Option<CheckIn>) -> DailyRecord {
        let mut record = DailyRecord::new(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        record.wearable = wearable;
        record.check_in = check_in;
        record
    }

    #[test]
    fn test_missing_record_driver() {
        let drivers = compute_drivers(None);
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].label, "No data saved for this day");
        assert_eq!(drivers[0].strength, Strength::Strong);
    }

    #[test]
    fn test_empty_record_driver() {
        let record = make_test_record(None, None);
        let drivers = compute_drivers(Some(&record));
        assert_eq!(drivers[0].label, "Not enough inputs to compute drivers");
    }

    #[test]
    fn test_drivers_sorted_by_magnitude() {
        // recovery 90 (+30), sleep 7.4h -> 60 (0), mood 4 -> 100 (+40), stress 2 -> 60 (0)
        let record = make_test_record(
            Some(WearableMetrics::new(90.0, 7.4, None)),
            Some(CheckIn::new(Level::new(4).unwrap(), StressIndicators::with_count(2))),
        );
        let drivers = compute_drivers(Some(&record));

        assert_eq!(drivers.len(), 3);
        assert_eq!(drivers[0].label, "Mood");
        assert_eq!(drivers[0].detail.as_deref(), Some("Mood check-in: 😄/4."));
        assert_eq!(drivers[1].label, "Recovery");
        assert_eq!(drivers[1].detail.as_deref(), Some("Wearable recovery: 90/100."));
        assert_eq!(drivers[1].strength, Strength::Strong);
        // Stable order for equal magnitudes keeps sleep before stress
        assert_eq!(drivers[2].label, "Sleep");
        assert_eq!(drivers[2].detail.as_deref(), Some("Sleep: 7h 24m."));
        assert_eq!(drivers[2].direction, Direction::Up);
    }

    #[test]
    fn test_check_in_only_drivers_have_no_wearable_details() {
        let record = make_test_record(None, Some(CheckIn::new(Level::new(1).unwrap(), StressIndicators::with_count(5))));
        let drivers = compute_drivers(Some(&record));
        let recovery = drivers.iter().find(|d| d.label == "Recovery").unwrap();
        assert!(recovery.detail.is_none());
        assert_eq!(recovery.direction, Direction::Down);
    }

    #[test]
    fn test_baseline_driver() {
        assert!(baseline_driver(None).is_none());
        assert!(baseline_driver(Some(0)).is_none());

        let below = baseline_driver(Some(-14)).unwrap();
        assert_eq!(below.label, "Below baseline");
        assert_eq!(below.detail.as_deref(), Some("Change vs baseline: -14."));
        assert_eq!(below.strength, Strength::Moderate);
    }

    #[test]
    fn test_accuracy_reasons() {
        let record = make_test_record(Some(WearableMetrics::new(70.0, 7.0, None)), None);
        let reasons = accuracy_reasons(Some(&record), Some(66));
        assert!(reasons[0].ok);
        assert!(!reasons[1].ok);
        assert_eq!(reasons[1].detail, "Add a quick check-in to improve emotional context.");
        assert_eq!(reasons[2].detail, "Baseline used: 66.");
    }
}
