//! What-if estimates: how much the index would move if one input changed

use crate::score::{score, ScoreInput};
use crate::types::{CheckIn, NeutralSignals, WearableMetrics};
use serde::{Deserialize, Serialize};

/// Extra sleep simulated by the sleep counterfactual (hours)
const EXTRA_SLEEP_HOURS: f64 = 0.75;

const MAX_COUNTERFACTUALS: usize = 3;

/// Approximate change in the index under one hypothetical change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterfactual {
    pub label: String,
    pub delta: i32,
    pub detail: String,
}

/// Non-zero what-if deltas, largest first
pub fn compute_counterfactuals(wearable: Option<&WearableMetrics>, check_in: Option<&CheckIn>) -> Vec<Counterfactual> {
    let typical = NeutralSignals::TYPICAL;
    let recovery = wearable.map(|w| w.recovery).unwrap_or(typical.recovery);
    let sleep_hours = wearable.map(|w| w.sleep_hours).unwrap_or(typical.sleep_hours);
    let strain = wearable.and_then(|w| w.strain);

    let index_with = |recovery: f64, sleep_hours: f64, check_in: Option<CheckIn>| -> i32 {
        score(&ScoreInput::new(recovery, sleep_hours, strain, check_in)).index as i32
    };
    let base = index_with(recovery, sleep_hours, check_in.cloned());

    let mut items = Vec::new();

    if let Some(w) = wearable {
        let alt = index_with(
            w.recovery,
            (w.sleep_hours + EXTRA_SLEEP_HOURS).clamp(0.0, 12.0),
            check_in.cloned(),
        );
        items.push(Counterfactual {
            label: "If you slept ~45 min more".to_string(),
            delta: alt - base,
            detail: "Approximate impact based on your current sleep contribution to the score.".to_string(),
        });
    }

    if let Some(c) = check_in {
        if let Some(reduced) = c.stress_indicators.without_first_active() {
            let alt = index_with(
                recovery,
                sleep_hours,
                Some(CheckIn {
                    stress_indicators: reduced,
                    ..c.clone()
                }),
            );
            items.push(Counterfactual {
                label: "If stress indicators were 1 lower".to_string(),
                delta: alt - base,
                detail: "Shows the approximate effect of reducing acute stress signals in the check-in.".to_string(),
            });
        }

        if let Some(mood) = c.mood.raised() {
            let alt = index_with(recovery, sleep_hours, Some(CheckIn { mood, ..c.clone() }));
            items.push(Counterfactual {
                label: "If mood improved by one level".to_string(),
                delta: alt - base,
                detail: "Approximate impact of mood on your score.".to_string(),
            });
        }
    }

    items.retain(|i| i.delta != 0);
    items.sort_by_key(|i| std::cmp::Reverse(i.delta.abs()));
    items.truncate(MAX_COUNTERFACTUALS);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level, StressIndicators};

    #[test]
    fn test_no_inputs_no_counterfactuals() {
        assert!(compute_counterfactuals(None, None).is_empty());
    }

    #[test]
    fn test_all_three_counterfactuals() {
        let wearable = WearableMetrics::new(60.0, 6.5, None);
        let check_in = CheckIn::new(Level::new(2).unwrap(), StressIndicators::with_count(2));
        let items = compute_counterfactuals(Some(&wearable), Some(&check_in));

        assert_eq!(items.len(), 3);
        // Sleep +0.75h adds 18.75 sleep points -> ~6.6 index points
        let sleep = items.iter().find(|i| i.label == "If you slept ~45 min more").unwrap();
        assert!(sleep.delta >= 6 && sleep.delta <= 7);
        // Mood +1 adds ~33 mood points -> ~5 index points
        assert_eq!(items[0].label, "If you slept ~45 min more");
        assert!(items.windows(2).all(|w| w[0].delta.abs() >= w[1].delta.abs()));
    }

    #[test]
    fn test_top_mood_and_calm_day_has_only_sleep() {
        let wearable = WearableMetrics::new(70.0, 7.0, None);
        let check_in = CheckIn::new(Level::MAX, StressIndicators::default());
        let items = compute_counterfactuals(Some(&wearable), Some(&check_in));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "If you slept ~45 min more");
    }

    #[test]
    fn test_zero_deltas_dropped() {
        // Sleep already saturated at 12h
        let wearable = WearableMetrics::new(70.0, 12.0, None);
        let items = compute_counterfactuals(Some(&wearable), None);
        assert!(items.is_empty());
    }
}
