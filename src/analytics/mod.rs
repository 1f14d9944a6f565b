//! Descriptive statistics and correlations over recent days
//!
//! Report-friendly analytics for small personal datasets: per-metric
//! descriptives, pairwise-deletion Pearson correlations, and plain-language
//! highlights for the strongest relationships.

pub mod report;

pub use report::{render, to_csv, to_markdown, ReportFormat};

use crate::stats::{mean, round_dp, sample_sd};
use crate::types::{sorted_by_date, DailyRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of most recent records analysed
pub const DEFAULT_ANALYTICS_WINDOW: usize = 30;

/// Minimum pairs before a correlation is computed
const MIN_CORRELATION_PAIRS: usize = 3;

/// Minimum pairs before a correlation can become a highlight
const MIN_HIGHLIGHT_PAIRS: usize = 7;

/// Minimum |r| for a highlight
const MIN_HIGHLIGHT_R: f64 = 0.35;

const MAX_HIGHLIGHTS: usize = 4;

const NO_HIGHLIGHTS: &str =
    "Not enough data yet for robust correlations. Log more days (wearables + check-ins) to unlock stronger analytics.";

/// Per-day metrics that analytics can summarize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "index")]
    Index,
    #[serde(rename = "recovery")]
    Recovery,
    #[serde(rename = "sleepHours")]
    SleepHours,
    #[serde(rename = "strain")]
    Strain,
    #[serde(rename = "mood")]
    Mood,
    #[serde(rename = "energy")]
    Energy,
    #[serde(rename = "stressIndicatorsCount")]
    StressIndicatorsCount,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Index,
        Metric::Recovery,
        Metric::SleepHours,
        Metric::Strain,
        Metric::Mood,
        Metric::Energy,
        Metric::StressIndicatorsCount,
    ];

    /// Correlation pairs reported, in order
    pub const PAIRS: [(Metric, Metric); 12] = [
        (Metric::Index, Metric::Recovery),
        (Metric::Index, Metric::SleepHours),
        (Metric::Index, Metric::Strain),
        (Metric::Index, Metric::Mood),
        (Metric::Index, Metric::Energy),
        (Metric::Index, Metric::StressIndicatorsCount),
        (Metric::Recovery, Metric::Mood),
        (Metric::SleepHours, Metric::Mood),
        (Metric::Strain, Metric::Mood),
        (Metric::Recovery, Metric::StressIndicatorsCount),
        (Metric::SleepHours, Metric::StressIndicatorsCount),
        (Metric::Strain, Metric::StressIndicatorsCount),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Index => "index",
            Metric::Recovery => "recovery",
            Metric::SleepHours => "sleepHours",
            Metric::Strain => "strain",
            Metric::Mood => "mood",
            Metric::Energy => "energy",
            Metric::StressIndicatorsCount => "stressIndicatorsCount",
        }
    }

    /// The metric's value for a day, `None` when missing or non-finite
    pub fn value(&self, record: &DailyRecord) -> Option<f64> {
        let value = match self {
            Metric::Index => record.index_f64(),
            Metric::Recovery => record.recovery(),
            Metric::SleepHours => record.sleep_hours(),
            Metric::Strain => record.strain(),
            Metric::Mood => record.mood().map(|m| m.get() as f64),
            Metric::Energy => record.energy().map(|e| e.get() as f64),
            Metric::StressIndicatorsCount => record.stress_count().map(f64::from),
        };
        value.filter(|v| v.is_finite())
    }
}

/// Descriptive statistics for one metric (2 dp)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Descriptive {
    pub metric: Metric,
    pub n: usize,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Pearson correlation between two metrics (3 dp)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRow {
    pub a: Metric,
    pub b: Metric,
    pub n: usize,
    pub r: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub generated_at: DateTime<Utc>,
    pub window_days: usize,
    pub n_days_total: usize,
    pub n_days_with_index: usize,
    pub n_days_with_wearable: usize,
    pub n_days_with_check_in: usize,
    pub descriptives: Vec<Descriptive>,
    pub correlations: Vec<CorrelationRow>,
    pub highlights: Vec<String>,
}

/// Summarize statistics over an ordered sample
pub fn describe(metric: Metric, values: &[f64]) -> Descriptive {
    if values.is_empty() {
        return Descriptive {
            metric,
            n: 0,
            mean: None,
            sd: None,
            min: None,
            max: None,
        };
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Descriptive {
        metric,
        n: values.len(),
        mean: mean(values).map(|m| round_dp(m, 2)),
        sd: Some(round_dp(sample_sd(values), 2)),
        min: Some(round_dp(min, 2)),
        max: Some(round_dp(max, 2)),
    }
}

/// Pearson correlation coefficient, `None` below three pairs or with zero variance
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < MIN_CORRELATION_PAIRS {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let (mut num, mut den_a, mut den_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        num += da * db;
        den_a += da * da;
        den_b += db * db;
    }
    let den = (den_a * den_b).sqrt();
    if !den.is_finite() || den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Values of two metrics on days where both are present
fn paired(records: &[DailyRecord], a: Metric, b: Metric) -> (Vec<f64>, Vec<f64>) {
    records
        .iter()
        .filter_map(|r| Some((a.value(r)?, b.value(r)?)))
        .unzip()
}

/// Build the analytics summary for the last `window_days` records
pub fn build_analytics_summary(
    records: &[DailyRecord],
    window_days: usize,
    generated_at: DateTime<Utc>,
) -> AnalyticsSummary {
    let sorted = sorted_by_date(records);
    let slice = &sorted[sorted.len().saturating_sub(window_days)..];

    let descriptives = Metric::ALL
        .iter()
        .map(|metric| {
            let values: Vec<f64> = slice.iter().filter_map(|r| metric.value(r)).collect();
            describe(*metric, &values)
        })
        .collect();

    let correlations: Vec<CorrelationRow> = Metric::PAIRS
        .iter()
        .map(|(a, b)| {
            let (xs, ys) = paired(slice, *a, *b);
            CorrelationRow {
                a: *a,
                b: *b,
                n: xs.len(),
                r: pearson(&xs, &ys).map(|r| round_dp(r, 3)),
            }
        })
        .collect();

    AnalyticsSummary {
        generated_at,
        window_days,
        n_days_total: slice.len(),
        n_days_with_index: slice.iter().filter(|r| r.index.is_some()).count(),
        n_days_with_wearable: slice.iter().filter(|r| r.wearable.is_some()).count(),
        n_days_with_check_in: slice.iter().filter(|r| r.check_in.is_some()).count(),
        descriptives,
        highlights: highlights(&correlations),
        correlations,
    }
}

/// Plain-language sentences for the strongest correlations
pub fn highlights(correlations: &[CorrelationRow]) -> Vec<String> {
    let mut usable: Vec<(CorrelationRow, f64)> = correlations
        .iter()
        .filter(|row| row.n >= MIN_HIGHLIGHT_PAIRS)
        .filter_map(|row| row.r.map(|r| (*row, r)))
        .filter(|(_, r)| r.abs() >= MIN_HIGHLIGHT_R)
        .collect();
    usable.sort_by(|(_, r1), (_, r2)| r2.abs().total_cmp(&r1.abs()));

    if usable.is_empty() {
        return vec![NO_HIGHLIGHTS.to_string()];
    }

    usable
        .iter()
        .take(MAX_HIGHLIGHTS)
        .map(|(row, r)| {
            let direction = if *r > 0.0 { "positive" } else { "negative" };
            let strength = if r.abs() >= 0.6 {
                "strong"
            } else if r.abs() >= 0.45 {
                "moderate"
            } else {
                "mild"
            };
            format!(
                "{} vs {}: {strength} {direction} relationship (r={r}, n={}).",
                row.a.as_str(),
                row.b.as_str(),
                row.n
            )
        })
        .collect()
}
