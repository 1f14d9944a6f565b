//! Life balance index scoring
//!
//! Combines an objective spine (recovery and sleep, 70%) with a subjective
//! component (mood and stress indicators, 30%) into a single integer index.
//! Scoring never fails: out-of-range or non-finite inputs are clamped and
//! reflected in the confidence bucket instead.

use crate::stats::{finite_or, round_half_up};
use crate::types::{CheckIn, Classification, Confidence, StressIndicators};
use serde::{Deserialize, Serialize};

/// Penalty applied when high strain meets low recovery
const MISMATCH_PENALTY: f64 = 6.0;

/// Mood assumed when no check-in was recorded
const DEFAULT_MOOD: u8 = 2;

/// Stress subscore used when indicators are absent
const NEUTRAL_STRESS_SCORE: f64 = 50.0;

/// Inputs for a single scoring run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub recovery: f64,
    pub sleep_hours: f64,
    #[serde(default)]
    pub strain: Option<f64>,
    #[serde(default)]
    pub check_in: Option<CheckIn>,
}

impl ScoreInput {
    pub fn new(recovery: f64, sleep_hours: f64, strain: Option<f64>, check_in: Option<CheckIn>) -> Self {
        Self {
            recovery,
            sleep_hours,
            strain,
            check_in,
        }
    }
}

/// Per-component scores (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscores {
    pub recovery: u8,
    pub sleep: u8,
    pub mood: u8,
    pub stress: u8,
}

/// Result of scoring a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub index: u8,
    pub classification: Classification,
    pub confidence: Confidence,
    pub reason: String,
    pub subscores: Subscores,
}

impl ScoreResult {
    /// Metadata persisted with the index
    pub fn meta(&self) -> crate::types::IndexMeta {
        crate::types::IndexMeta {
            classification: self.classification,
            confidence: self.confidence,
            reason: self.reason.clone(),
        }
    }
}

/// Map sleep hours onto 0-100 (5h -> 0, 9h -> 100)
pub fn sleep_score(hours: f64) -> f64 {
    let h = finite_or(hours, 0.0).clamp(4.0, 10.0);
    ((h - 5.0) / 4.0 * 100.0).clamp(0.0, 100.0)
}

/// Map a 1-4 mood onto 0-100
pub fn mood_score(mood: u8) -> f64 {
    (mood as f64 - 1.0) / 3.0 * 100.0
}

/// Invert the active indicator count into a 0-100 "calm" score
pub fn stress_score(indicators: &StressIndicators) -> f64 {
    100.0 - indicators.fraction() * 100.0
}

/// Score a day from its signals
pub fn score(input: &ScoreInput) -> ScoreResult {
    let raw_recovery = finite_or(input.recovery, 0.0);
    let raw_sleep = finite_or(input.sleep_hours, 0.0);

    let recovery = raw_recovery.clamp(0.0, 100.0);
    let sleep = sleep_score(raw_sleep);

    let mood = input.check_in.as_ref().map(|c| c.mood.get()).unwrap_or(DEFAULT_MOOD);
    let mood_s = mood_score(mood);
    let stress_s = input
        .check_in
        .as_ref()
        .map(|c| stress_score(&c.stress_indicators))
        .unwrap_or(NEUTRAL_STRESS_SCORE);

    let objective = 0.5 * recovery + 0.5 * sleep;
    let subjective = 0.5 * mood_s + 0.5 * stress_s;
    let mut raw = 0.7 * objective + 0.3 * subjective;

    let strain = input.strain.map(|s| finite_or(s, 0.0).clamp(0.0, 21.0));
    if matches!(strain, Some(s) if s >= 15.0) && recovery <= 40.0 {
        raw -= MISMATCH_PENALTY;
    }

    let index = round_half_up(raw.clamp(0.0, 100.0)) as u8;
    let confidence = confidence_from_completeness(input.check_in.is_some(), raw_recovery, raw_sleep);
    let classification = classify(recovery, sleep, input.check_in.as_ref());
    let reason = reason_for(input.check_in.is_some(), classification);

    ScoreResult {
        index,
        classification,
        confidence,
        reason: reason.to_string(),
        subscores: Subscores {
            recovery: round_half_up(recovery) as u8,
            sleep: round_half_up(sleep) as u8,
            mood: round_half_up(mood_s) as u8,
            stress: round_half_up(stress_s) as u8,
        },
    }
}

fn confidence_from_completeness(has_check_in: bool, recovery: f64, sleep_hours: f64) -> Confidence {
    let mut c = 1.0;
    if !has_check_in {
        c -= 0.35;
    }
    if sleep_hours <= 0.0 || sleep_hours > 14.0 {
        c -= 0.25;
    }
    if !(0.0..=100.0).contains(&recovery) {
        c -= 0.25;
    }

    if c >= 0.75 {
        Confidence::High
    } else if c >= 0.45 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn classify(recovery: f64, sleep: f64, check_in: Option<&CheckIn>) -> Classification {
    if recovery <= 40.0 || sleep <= 35.0 {
        return Classification::UnderRecovered;
    }
    match check_in {
        Some(c) if c.stress_indicators.count() >= 3 || c.mood.get() <= 2 => Classification::Overloaded,
        _ => Classification::Balanced,
    }
}

fn reason_for(has_check_in: bool, classification: Classification) -> &'static str {
    if !has_check_in {
        return "Complete a check-in to improve accuracy.";
    }
    match classification {
        Classification::UnderRecovered => "Low recovery and/or sleep are pulling your balance down.",
        Classification::Overloaded => "Stress indicators and/or mood suggest mental overload.",
        Classification::Balanced => "Your balance looks steady today.",
    }
}
