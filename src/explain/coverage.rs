//! Which signals fed the index and how much of the model they cover

use crate::stats::round_half_up;
use crate::types::{CheckIn, Confidence, WearableMetrics};
use serde::{Deserialize, Serialize};

/// Signals the index can draw on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKey {
    WearableRecovery,
    WearableSleep,
    WearableStrain,
    CheckinMood,
    CheckinStress,
}

/// Where a signal comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalSource {
    Wearable,
    CheckIn,
}

impl SignalKey {
    pub const ALL: [SignalKey; 5] = [
        SignalKey::WearableRecovery,
        SignalKey::WearableSleep,
        SignalKey::WearableStrain,
        SignalKey::CheckinMood,
        SignalKey::CheckinStress,
    ];

    pub fn weight(&self) -> f64 {
        match self {
            SignalKey::WearableRecovery => 0.40,
            SignalKey::WearableSleep => 0.25,
            SignalKey::WearableStrain => 0.10,
            SignalKey::CheckinMood => 0.15,
            SignalKey::CheckinStress => 0.10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalKey::WearableRecovery => "Recovery",
            SignalKey::WearableSleep => "Sleep",
            SignalKey::WearableStrain => "Strain / activity",
            SignalKey::CheckinMood => "Mood",
            SignalKey::CheckinStress => "Stress indicators",
        }
    }

    pub fn source(&self) -> SignalSource {
        match self {
            SignalKey::WearableRecovery | SignalKey::WearableSleep | SignalKey::WearableStrain => SignalSource::Wearable,
            SignalKey::CheckinMood | SignalKey::CheckinStress => SignalSource::CheckIn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedSignal {
    pub key: SignalKey,
    pub label: String,
    pub source: SignalSource,
    pub weight_pct: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSignal {
    pub key: SignalKey,
    pub label: String,
    pub source: SignalSource,
}

/// Coverage of the day's signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub used_signals: Vec<UsedSignal>,
    pub missing_signals: Vec<MissingSignal>,
    pub coverage_pct: u8,
    pub mental_contribution_pct: u8,
    pub physiological_contribution_pct: u8,
    pub notes: Vec<String>,
}

/// Summarize which signals were present for a day
pub fn compute_coverage(
    wearable: Option<&WearableMetrics>,
    check_in: Option<&CheckIn>,
    confidence: Option<Confidence>,
) -> CoverageSummary {
    let present = |key: SignalKey| match key {
        SignalKey::WearableRecovery | SignalKey::WearableSleep => wearable.is_some(),
        SignalKey::WearableStrain => wearable.is_some_and(|w| w.strain.is_some()),
        SignalKey::CheckinMood | SignalKey::CheckinStress => check_in.is_some(),
    };

    let mut used_signals = Vec::new();
    let mut missing_signals = Vec::new();
    for key in SignalKey::ALL {
        if present(key) {
            used_signals.push(UsedSignal {
                key,
                label: key.label().to_string(),
                source: key.source(),
                weight_pct: round_half_up(key.weight() * 100.0) as u8,
            });
        } else {
            missing_signals.push(MissingSignal {
                key,
                label: key.label().to_string(),
                source: key.source(),
            });
        }
    }

    let total_weight: f64 = SignalKey::ALL.iter().map(|k| k.weight()).sum();
    let weight_of = |source: SignalSource| -> f64 {
        used_signals
            .iter()
            .filter(|u| u.source == source)
            .map(|u| u.key.weight())
            .sum()
    };
    let physiological = weight_of(SignalSource::Wearable);
    let mental = weight_of(SignalSource::CheckIn);
    let used_weight = physiological + mental;

    let denom = if used_weight > 0.0 { used_weight } else { 1.0 };
    let pct = |x: f64| round_half_up(x * 100.0).clamp(0.0, 100.0) as u8;

    let mut notes = Vec::new();
    if wearable.is_none() {
        notes.push("No wearable data detected for this day.".to_string());
    }
    if check_in.is_none() {
        notes.push("No check-in detected for this day.".to_string());
    }
    if confidence == Some(Confidence::Low) {
        notes.push("Low confidence: missing signals reduce interpretation strength.".to_string());
    }

    CoverageSummary {
        coverage_pct: pct(used_weight / total_weight),
        mental_contribution_pct: pct(mental / denom),
        physiological_contribution_pct: pct(physiological / denom),
        used_signals,
        missing_signals,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level, StressIndicators};

    #[test]
    fn test_full_coverage() {
        let wearable = WearableMetrics::new(70.0, 7.0, Some(12.0));
        let check_in = CheckIn::new(Level::new(3).unwrap(), StressIndicators::default());
        let summary = compute_coverage(Some(&wearable), Some(&check_in), Some(Confidence::High));

        assert_eq!(summary.used_signals.len(), 5);
        assert_eq!(summary.coverage_pct, 100);
        assert_eq!(summary.physiological_contribution_pct, 75);
        assert_eq!(summary.mental_contribution_pct, 25);
        assert!(summary.notes.is_empty());
    }

    #[test]
    fn test_wearable_without_strain() {
        let wearable = WearableMetrics::new(70.0, 7.0, None);
        let summary = compute_coverage(Some(&wearable), None, Some(Confidence::Medium));

        assert_eq!(summary.coverage_pct, 65);
        assert_eq!(summary.physiological_contribution_pct, 100);
        assert_eq!(summary.mental_contribution_pct, 0);
        let missing: Vec<SignalKey> = summary.missing_signals.iter().map(|m| m.key).collect();
        assert_eq!(
            missing,
            vec![SignalKey::WearableStrain, SignalKey::CheckinMood, SignalKey::CheckinStress]
        );
        assert_eq!(summary.notes, vec!["No check-in detected for this day.".to_string()]);
    }

    #[test]
    fn test_nothing_present() {
        let summary = compute_coverage(None, None, Some(Confidence::Low));
        assert_eq!(summary.coverage_pct, 0);
        assert_eq!(summary.mental_contribution_pct, 0);
        assert_eq!(summary.notes.len(), 3);
    }
}
