//! Core types for the balance index engine
//!
//! This module defines the per-day record that every stage reads from, the
//! self-report and wearable inputs it carries, and the shared enums used
//! identically by scoring, planning and explanation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anchored 4-point level used for mood and energy (1 = lowest, 4 = highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: Level = Level(1);
    pub const MAX: Level = Level(4);

    /// Create a level, returning `None` outside 1..=4
    pub fn new(value: u8) -> Option<Self> {
        (1..=4).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The next level up, or `None` at the top of the scale
    pub fn raised(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// Emoji used when describing a mood level to the user
    pub fn mood_emoji(self) -> &'static str {
        match self.0 {
            1 => "😖",
            2 => "😐",
            3 => "🙂",
            _ => "😄",
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("level must be 1-4, got {value}"))
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

/// Minutes of focused deep work, restricted to the check-in choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct DeepWorkMins(u16);

impl DeepWorkMins {
    pub const ALLOWED: [u16; 6] = [0, 15, 30, 60, 90, 120];

    pub fn new(minutes: u16) -> Option<Self> {
        Self::ALLOWED.contains(&minutes).then_some(Self(minutes))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for DeepWorkMins {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("deep work minutes must be one of {:?}", Self::ALLOWED))
    }
}

impl From<DeepWorkMins> for u16 {
    fn from(mins: DeepWorkMins) -> Self {
        mins.0
    }
}

/// Observable stress indicators selected in a check-in.
///
/// Field order is significant: counterfactuals switch off the first active
/// indicator in this order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressIndicators {
    pub muscle_tension: bool,
    pub racing_thoughts: bool,
    pub irritability: bool,
    pub avoidance: bool,
    pub restlessness: bool,
}

impl StressIndicators {
    /// Total number of indicators
    pub const TOTAL: u8 = 5;

    /// Indicator flags in declaration order
    pub fn flags(&self) -> [bool; 5] {
        [
            self.muscle_tension,
            self.racing_thoughts,
            self.irritability,
            self.avoidance,
            self.restlessness,
        ]
    }

    /// Number of active indicators (0-5)
    pub fn count(&self) -> u8 {
        self.flags().iter().filter(|f| **f).count() as u8
    }

    /// Active fraction (0-1)
    pub fn fraction(&self) -> f64 {
        self.count() as f64 / Self::TOTAL as f64
    }

    /// Copy with the first active indicator switched off, or `None` when none are active
    pub fn without_first_active(&self) -> Option<Self> {
        let first = self.flags().iter().position(|&active| active)?;
        let mut next = *self;
        match first {
            0 => next.muscle_tension = false,
            1 => next.racing_thoughts = false,
            2 => next.irritability = false,
            3 => next.avoidance = false,
            _ => next.restlessness = false,
        }
        Some(next)
    }

    /// Indicators with the first `count` slots set, in declaration order
    pub fn with_count(count: u8) -> Self {
        Self {
            muscle_tension: count >= 1,
            racing_thoughts: count >= 2,
            irritability: count >= 3,
            avoidance: count >= 4,
            restlessness: count >= 5,
        }
    }
}

/// Context tags a user can attach to a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextTag {
    Illness,
    Travel,
    LateMeal,
    Alcohol,
    AcuteStress,
    MenstrualCycle,
}

/// Daily self-report check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub mood: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<Level>,
    #[serde(default)]
    pub stress_indicators: StressIndicators,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caffeine_after_2pm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alcohol: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_work_mins: Option<DeepWorkMins>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_tags: Vec<ContextTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CheckIn {
    /// Minimal check-in with a mood and stress indicators
    pub fn new(mood: Level, stress_indicators: StressIndicators) -> Self {
        Self {
            mood,
            energy: None,
            stress_indicators,
            caffeine_after_2pm: None,
            alcohol: None,
            deep_work_mins: None,
            context_tags: Vec::new(),
            notes: None,
        }
    }

    /// Mood mapped onto 0-1
    pub fn mood_unit(&self) -> f64 {
        (self.mood.get() as f64 - 1.0) / 3.0
    }
}

/// Physiological signals from a wearable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WearableMetrics {
    /// Recovery score (0-100)
    pub recovery: f64,
    /// Sleep duration (hours)
    pub sleep_hours: f64,
    /// Day strain (0-21)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain: Option<f64>,
    /// Heart rate variability (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrv: Option<f64>,
    /// Resting heart rate (bpm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resting_hr: Option<f64>,
}

impl WearableMetrics {
    pub fn new(recovery: f64, sleep_hours: f64, strain: Option<f64>) -> Self {
        Self {
            recovery,
            sleep_hours,
            strain,
            hrv: None,
            resting_hr: None,
        }
    }
}

/// Where wearable metrics came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WearableSource {
    NormalizedCsv,
    WhoopExport,
    AppleHealthExport,
}

impl WearableSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WearableSource::NormalizedCsv => "normalized_csv",
            WearableSource::WhoopExport => "whoop_export",
            WearableSource::AppleHealthExport => "apple_health_export",
        }
    }
}

/// One day of imported wearable data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearableDay {
    pub date: NaiveDate,
    pub wearable: WearableMetrics,
    pub source: WearableSource,
}

/// Day classification produced by the scoring engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Balanced,
    Overloaded,
    UnderRecovered,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Balanced => "balanced",
            Classification::Overloaded => "overloaded",
            Classification::UnderRecovered => "under-recovered",
        }
    }
}

/// Confidence bucket shared by scoring, plans and explanations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Plan category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanCategory {
    Recovery,
    Normal,
}

impl PlanCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanCategory::Recovery => "RECOVERY",
            PlanCategory::Normal => "NORMAL",
        }
    }
}

/// Baseline calibration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineStatus {
    Calibrating,
    Stable,
}

/// Direction of a driver's effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Up for non-negative values, down otherwise
    pub fn of(value: f64) -> Self {
        if value >= 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

/// Strength tier of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Mild,
    Moderate,
    Strong,
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(WearableSource, Classification, Confidence, PlanCategory);

/// Score metadata persisted alongside the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub classification: Classification,
    pub confidence: Confidence,
    pub reason: String,
}

/// One calendar day of inputs and derived results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub check_in: Option<CheckIn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wearable: Option<WearableMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wearable_source: Option<WearableSource>,
    /// Derived life balance index (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_meta: Option<IndexMeta>,
}

impl DailyRecord {
    /// Empty record for a date
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            check_in: None,
            wearable: None,
            wearable_source: None,
            index: None,
            index_meta: None,
        }
    }

    pub fn recovery(&self) -> Option<f64> {
        self.wearable.map(|w| w.recovery)
    }

    pub fn sleep_hours(&self) -> Option<f64> {
        self.wearable.map(|w| w.sleep_hours)
    }

    pub fn strain(&self) -> Option<f64> {
        self.wearable.and_then(|w| w.strain)
    }

    pub fn mood(&self) -> Option<Level> {
        self.check_in.as_ref().map(|c| c.mood)
    }

    pub fn energy(&self) -> Option<Level> {
        self.check_in.as_ref().and_then(|c| c.energy)
    }

    /// Active stress indicator count, `None` without a check-in
    pub fn stress_count(&self) -> Option<u8> {
        self.check_in.as_ref().map(|c| c.stress_indicators.count())
    }

    pub fn index_f64(&self) -> Option<f64> {
        self.index.map(f64::from)
    }
}

/// Field-merge update applied by `Repository::upsert`.
///
/// Absent fields leave the stored record untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub check_in: Option<CheckIn>,
    pub wearable: Option<WearableMetrics>,
    pub wearable_source: Option<WearableSource>,
    pub index: Option<u8>,
    pub index_meta: Option<IndexMeta>,
}

impl RecordPatch {
    pub fn check_in(check_in: CheckIn) -> Self {
        Self {
            check_in: Some(check_in),
            ..Default::default()
        }
    }

    pub fn wearable(wearable: WearableMetrics, source: Option<WearableSource>) -> Self {
        Self {
            wearable: Some(wearable),
            wearable_source: source,
            ..Default::default()
        }
    }

    pub fn index(index: u8, meta: IndexMeta) -> Self {
        Self {
            index: Some(index),
            index_meta: Some(meta),
            ..Default::default()
        }
    }

    /// Merge this patch into a record; a wearable write without a source keeps the existing source
    pub fn apply(self, record: &mut DailyRecord) {
        if let Some(check_in) = self.check_in {
            record.check_in = Some(check_in);
        }
        if let Some(wearable) = self.wearable {
            record.wearable = Some(wearable);
            if self.wearable_source.is_some() {
                record.wearable_source = self.wearable_source;
            }
        }
        if let Some(index) = self.index {
            record.index = Some(index);
        }
        if let Some(meta) = self.index_meta {
            record.index_meta = Some(meta);
        }
    }
}

/// Neutral signal values substituted when a wearable reading is missing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeutralSignals {
    pub recovery: f64,
    pub sleep_hours: f64,
}

impl NeutralSignals {
    /// Missing reads as zero, so explanations show the gap
    pub const MISSING: NeutralSignals = NeutralSignals {
        recovery: 0.0,
        sleep_hours: 0.0,
    };

    /// A typical day, used as the anchor for what-if deltas
    pub const TYPICAL: NeutralSignals = NeutralSignals {
        recovery: 50.0,
        sleep_hours: 7.0,
    };
}

/// Last `days` records dated on or before `end`, ascending. `days == 0` keeps all.
pub fn records_up_to(records: &[DailyRecord], end: NaiveDate, days: usize) -> Vec<DailyRecord> {
    let mut filtered: Vec<DailyRecord> = records.iter().filter(|r| r.date <= end).cloned().collect();
    filtered.sort_by(|a, b| a.date.cmp(&b.date));
    if days == 0 || filtered.len() <= days {
        return filtered;
    }
    filtered.split_off(filtered.len() - days)
}

/// Copy of `records` sorted ascending by date
pub fn sorted_by_date(records: &[DailyRecord]) -> Vec<DailyRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));
    sorted
}
