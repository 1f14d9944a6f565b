//! Daily action plan rules
//!
//! Plans are deterministic: the category follows from the score and baseline,
//! actions and triggers are authored candidate lists truncated to a small,
//! low-effort set, and every rule that fired contributes a sentence to the
//! explanation.

use crate::types::{CheckIn, Classification, Confidence, PlanCategory, WearableMetrics};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum number of actions shown to the user
pub const MAX_ACTIONS: usize = 2;

/// Maximum number of triggers shown to the user
pub const MAX_TRIGGERS: usize = 3;

/// Index at or below which a recovery day is planned
const RECOVERY_INDEX_CEILING: i32 = 45;

/// Baseline delta that counts as meaningfully above or below
const BASELINE_DELTA_THRESHOLD: i32 = 10;

/// Fraction of baseline below which a balance drop is flagged
const BALANCE_DROP_RATIO: f64 = 0.85;

const RECOVERY_FOCUS: &str = "Reduce load and prioritise recovery to stabilise energy and mood.";
const NORMAL_FOCUS: &str = "Maintain momentum with structured work blocks and movement.";

const RECOVERY_ACTIONS: [&str; 5] = [
    "10–20 min easy walk (zone 1/2) + sunlight early",
    "Protein-forward meals + 2L water (aim steady, not perfect)",
    "One recovery block: stretch/foam roll 10 min OR hot shower wind-down",
    "Cap caffeine by 2pm; no late stimulants",
    "Early night: target +45–90 min vs usual bedtime",
];

const NORMAL_ACTIONS: [&str; 5] = [
    "Pick 1 priority task and complete a 45–60 min deep work block",
    "Movement snack: 2 x 8 min walk breaks or 20 min incline walk",
    "Keep meals consistent; avoid long gaps (stabilises energy)",
    "End-of-day reset: 10 min tidy + plan tomorrow’s top 1",
    "Optional: light social connection (message/call 1 person)",
];

const PUSH_ACTION: &str = "Add one extra hard thing: 20 min focused sprint or slightly harder training";
const BREATHING_ACTION: &str = "Add a 5-min breathing reset between tasks (box breathing 4-4-4-4)";

const TRIGGERS: [&str; 3] = [
    "If you feel wired/anxious → 90 seconds slow exhale breathing",
    "If you procrastinate 10+ mins → start with a 5-min timer",
    "If afternoon crash hits → water + 10-min walk before caffeine",
];

const LOW_CONFIDENCE_TRIGGER: &str = "Low confidence today: complete check-in to improve accuracy";
const LOW_CONFIDENCE_NOTE: &str = " Confidence is low due to missing signals.";

/// Everything the plan rules look at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInput {
    pub index: u8,
    #[serde(default)]
    pub baseline: Option<u8>,
    pub classification: Classification,
    pub confidence: Confidence,
    pub wearable: WearableMetrics,
    #[serde(default)]
    pub check_in: Option<CheckIn>,
}

/// Plan produced by the rule engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub category: PlanCategory,
    pub focus: String,
    /// Shown actions (at most two)
    pub actions: Vec<String>,
    /// Full ordered action list before truncation
    pub candidate_actions: Vec<String>,
    /// Shown triggers (at most three)
    pub triggers: Vec<String>,
    pub explanation: String,
}

/// Plan snapshot persisted per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlan {
    pub date: NaiveDate,
    pub index: u8,
    pub baseline: Option<u8>,
    pub confidence: Confidence,
    pub category: PlanCategory,
    pub focus: String,
    pub actions: Vec<String>,
    pub triggers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl SavedPlan {
    pub fn from_generated(date: NaiveDate, input: &PlanInput, plan: &GeneratedPlan) -> Self {
        Self {
            date,
            index: input.index,
            baseline: input.baseline,
            confidence: input.confidence,
            category: plan.category,
            focus: plan.focus.clone(),
            actions: plan.actions.clone(),
            triggers: plan.triggers.clone(),
            explanation: Some(plan.explanation.clone()),
        }
    }
}

/// Generate the day's plan
pub fn generate_plan(input: &PlanInput) -> GeneratedPlan {
    let stress_count = input
        .check_in
        .as_ref()
        .map(|c| c.stress_indicators.count())
        .unwrap_or(0);
    let low_sleep = input.wearable.sleep_hours < 6.5;
    let low_recovery = input.wearable.recovery < 45.0;
    let high_strain = input.wearable.strain.unwrap_or(0.0) >= 15.0;

    let delta = input.baseline.map(|b| input.index as i32 - b as i32);
    let below_baseline = matches!(delta, Some(d) if d <= -BASELINE_DELTA_THRESHOLD);
    let above_baseline = matches!(delta, Some(d) if d >= BASELINE_DELTA_THRESHOLD);

    let category = if input.classification == Classification::UnderRecovered
        || input.index as i32 <= RECOVERY_INDEX_CEILING
        || below_baseline
    {
        PlanCategory::Recovery
    } else {
        PlanCategory::Normal
    };

    let mut actions: Vec<String> = Vec::new();
    let mut why: Vec<String> = Vec::new();

    match category {
        PlanCategory::Recovery => {
            actions.extend(RECOVERY_ACTIONS.iter().map(|a| a.to_string()));

            if low_sleep {
                why.push("Sleep hours are low.".to_string());
            }
            if low_recovery {
                why.push("Recovery is low.".to_string());
            }
            if high_strain {
                why.push("Strain is high relative to recovery.".to_string());
            }
            if stress_count >= 3 {
                why.push("Multiple stress indicators were selected.".to_string());
            }
            if let (true, Some(d)) = (below_baseline, delta) {
                why.push(format!("LBI is below your baseline by {}.", d.abs()));
            }
        }
        PlanCategory::Normal => {
            actions.extend(NORMAL_ACTIONS.iter().map(|a| a.to_string()));

            if let (true, Some(d)) = (above_baseline, delta) {
                why.push(format!("LBI is above your baseline by {d}."));
                actions.push(PUSH_ACTION.to_string());
            }
            if stress_count >= 3 {
                actions.push(BREATHING_ACTION.to_string());
                why.push("Stress indicators suggest mental load is high.".to_string());
            }
        }
    }

    let mut triggers: Vec<String> = TRIGGERS.iter().map(|t| t.to_string()).collect();
    if input.confidence == Confidence::Low {
        triggers.insert(0, LOW_CONFIDENCE_TRIGGER.to_string());
    }
    triggers.truncate(MAX_TRIGGERS);

    let low_note = if input.confidence == Confidence::Low {
        LOW_CONFIDENCE_NOTE
    } else {
        ""
    };
    let explanation = if why.is_empty() {
        format!("Plan logic: your signals are stable enough to maintain a normal day structure.{low_note}")
    } else {
        let delta_note = delta
            .map(|d| format!(" (Δ vs baseline: {})", signed(d)))
            .unwrap_or_default();
        format!("Plan logic: {}{delta_note}{low_note}", why.join(" "))
    };

    let candidate_actions = actions.clone();
    actions.truncate(MAX_ACTIONS);

    GeneratedPlan {
        category,
        focus: match category {
            PlanCategory::Recovery => RECOVERY_FOCUS,
            PlanCategory::Normal => NORMAL_FOCUS,
        }
        .to_string(),
        actions,
        candidate_actions,
        triggers,
        explanation,
    }
}

/// Whether the index has dropped meaningfully below the baseline
pub fn is_balance_drop(index: u8, baseline: Option<u8>) -> bool {
    match baseline {
        Some(b) => (index as f64) < b as f64 * BALANCE_DROP_RATIO,
        None => false,
    }
}

/// Format an integer with an explicit sign ("+3", "-4", "+0")
pub(crate) fn signed(value: i32) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level, StressIndicators};
    use pretty_assertions::assert_eq;

    fn make_test_input(index: u8, baseline: Option<u8>) -> PlanInput {
        PlanInput {
            index,
            baseline,
            classification: Classification::Balanced,
            confidence: Confidence::High,
            wearable: WearableMetrics::new(70.0, 7.5, Some(10.0)),
            check_in: Some(CheckIn::new(Level::new(3).unwrap(), StressIndicators::default())),
        }
    }

    #[test]
    fn test_low_index_without_baseline_is_recovery() {
        let plan = generate_plan(&make_test_input(40, None));
        assert_eq!(plan.category, PlanCategory::Recovery);
        assert_eq!(plan.focus, RECOVERY_FOCUS);
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.actions[0], RECOVERY_ACTIONS[0]);
        assert_eq!(
            plan.explanation,
            "Plan logic: your signals are stable enough to maintain a normal day structure."
        );
    }

    #[test]
    fn test_above_baseline_is_normal_with_push_candidate() {
        let plan = generate_plan(&make_test_input(80, Some(65)));
        assert_eq!(plan.category, PlanCategory::Normal);
        assert!(plan.candidate_actions.iter().any(|a| a == PUSH_ACTION));
        assert_eq!(plan.candidate_actions.len(), 6);
        assert_eq!(plan.actions, vec![NORMAL_ACTIONS[0].to_string(), NORMAL_ACTIONS[1].to_string()]);
        assert_eq!(
            plan.explanation,
            "Plan logic: LBI is above your baseline by 15. (Δ vs baseline: +15)"
        );
    }

    #[test]
    fn test_below_baseline_forces_recovery() {
        let mut input = make_test_input(60, Some(72));
        input.wearable = WearableMetrics::new(40.0, 6.0, Some(16.0));
        input.check_in = Some(CheckIn::new(Level::new(2).unwrap(), StressIndicators::with_count(3)));

        let plan = generate_plan(&input);
        assert_eq!(plan.category, PlanCategory::Recovery);
        assert_eq!(
            plan.explanation,
            "Plan logic: Sleep hours are low. Recovery is low. Strain is high relative to recovery. \
             Multiple stress indicators were selected. LBI is below your baseline by 12. (Δ vs baseline: -12)"
        );
    }

    #[test]
    fn test_stressed_normal_day_adds_breathing() {
        let mut input = make_test_input(70, Some(68));
        input.check_in = Some(CheckIn::new(Level::new(3).unwrap(), StressIndicators::with_count(4)));

        let plan = generate_plan(&input);
        assert_eq!(plan.category, PlanCategory::Normal);
        assert_eq!(plan.candidate_actions.last().map(String::as_str), Some(BREATHING_ACTION));
        assert!(plan.explanation.contains("Stress indicators suggest mental load is high."));
        assert!(plan.explanation.ends_with("(Δ vs baseline: +2)"));
    }

    #[test]
    fn test_low_confidence_prepends_trigger() {
        let mut input = make_test_input(70, None);
        input.confidence = Confidence::Low;

        let plan = generate_plan(&input);
        assert_eq!(plan.triggers.len(), 3);
        assert_eq!(plan.triggers[0], LOW_CONFIDENCE_TRIGGER);
        assert!(plan.explanation.ends_with("Confidence is low due to missing signals."));
    }

    #[test]
    fn test_under_recovered_classification_is_recovery() {
        let mut input = make_test_input(75, None);
        input.classification = Classification::UnderRecovered;
        assert_eq!(generate_plan(&input).category, PlanCategory::Recovery);
    }

    #[test]
    fn test_balance_drop_rule() {
        assert!(is_balance_drop(50, Some(60)));
        assert!(!is_balance_drop(51, Some(60)));
        assert!(!is_balance_drop(10, None));
    }
}
