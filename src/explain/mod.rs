//! Explainability for a single day and for the recent history
//!
//! - **Drivers**: which subscores pushed the index up or down
//! - **Accuracy reasons**: which inputs were present
//! - **Counterfactuals**: approximate effect of small input changes
//! - **Coverage**: how much of the signal model was available
//! - **Patterns**: simple summary statistics over recent days

pub mod counterfactual;
pub mod coverage;
pub mod drivers;
pub mod patterns;

pub use counterfactual::{compute_counterfactuals, Counterfactual};
pub use coverage::{compute_coverage, CoverageSummary, SignalKey};
pub use drivers::{accuracy_reasons, baseline_driver, compute_drivers, AccuracyReason, Driver};
pub use patterns::{build_patterns, PatternItem};

use crate::types::{ContextTag, DailyRecord, IndexMeta};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Full explanation of one day's index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayExplanation {
    pub date: NaiveDate,
    pub index: Option<u8>,
    pub baseline: Option<u8>,
    /// Index minus baseline
    pub delta: Option<i32>,
    pub drivers: Vec<Driver>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_driver: Option<Driver>,
    pub accuracy_reasons: Vec<AccuracyReason>,
    pub counterfactuals: Vec<Counterfactual>,
    pub coverage: CoverageSummary,
    pub context_tags: Vec<ContextTag>,
}

/// Explain a day given its stored record (if any) and the baseline in effect
pub fn explain_day(date: NaiveDate, record: Option<&DailyRecord>, baseline: Option<u8>) -> DayExplanation {
    let index = record.and_then(|r| r.index);
    let delta = match (index, baseline) {
        (Some(i), Some(b)) => Some(i as i32 - b as i32),
        _ => None,
    };

    let wearable = record.and_then(|r| r.wearable.as_ref());
    let check_in = record.and_then(|r| r.check_in.as_ref());
    let confidence = record.and_then(|r| r.index_meta.as_ref()).map(|m: &IndexMeta| m.confidence);

    DayExplanation {
        date,
        index,
        baseline,
        delta,
        drivers: compute_drivers(record),
        baseline_driver: record.and_then(|_| baseline_driver(delta)),
        accuracy_reasons: accuracy_reasons(record, baseline),
        counterfactuals: compute_counterfactuals(wearable, check_in),
        coverage: compute_coverage(wearable, check_in, confidence),
        context_tags: check_in.map(|c| c.context_tags.clone()).unwrap_or_default(),
    }
}

/// Format fractional hours as "7h" or "7h 24m"
pub fn format_hours(hours: f64) -> String {
    let mut whole = hours.floor();
    let mut minutes = crate::stats::round_half_up((hours - whole) * 60.0);
    if minutes >= 60.0 {
        whole += 1.0;
        minutes = 0.0;
    }
    if minutes == 0.0 {
        format!("{whole}h")
    } else {
        format!("{whole}h {minutes}m")
    }
}
