//! Dual next-day risk models: index drop and recovery drop
//!
//! Both models share one dataset and are trained, persisted and replaced
//! together as a single versioned blob.

use super::dataset::{build_dataset, DatasetConfig, FEATURE_NAMES};
use super::logreg::{train, LogRegModel, TrainOptions};
use crate::types::{DailyRecord, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Persisted model blob version
pub const MODELS_VERSION: u32 = 1;

const MAX_RISK_DRIVERS: usize = 3;

/// Gate and hyperparameters for `train_if_ready`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Minimum stored days before training is attempted
    pub min_corpus_days: usize,
    /// Minimum dataset rows before training is attempted
    pub min_rows: usize,
    pub steps: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_corpus_days: 21,
            min_rows: 10,
            steps: 900,
            learning_rate: 0.12,
            l2: 0.02,
        }
    }
}

impl TrainingConfig {
    pub fn options(&self) -> TrainOptions {
        TrainOptions {
            steps: self.steps,
            learning_rate: self.learning_rate,
            l2: self.l2,
        }
    }
}

/// Both risk models plus training metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualModels {
    pub version: u32,
    pub window_days: usize,
    pub k: f64,
    pub trained_at: DateTime<Utc>,
    pub rows_used: usize,
    pub run_id: Uuid,
    pub index_drop: LogRegModel,
    pub recovery_drop: LogRegModel,
}

impl DualModels {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Result of a training attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainOutcome {
    Trained { models: DualModels },
    NotTrained { reason: String, days: usize, rows: usize },
}

impl TrainOutcome {
    pub fn models(&self) -> Option<&DualModels> {
        match self {
            TrainOutcome::Trained { models } => Some(models),
            TrainOutcome::NotTrained { .. } => None,
        }
    }
}

/// Feature pushing tomorrow's risk up or down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDriver {
    pub name: String,
    pub direction: Direction,
    pub strength: f64,
}

/// Next-day risk estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub trained: bool,
    pub rows_used: usize,
    pub index_risk_prob: Option<f64>,
    pub recovery_risk_prob: Option<f64>,
    pub top_drivers: Vec<RiskDriver>,
}

/// Train both models when the history is large enough
pub fn train_if_ready(records: &[DailyRecord], dataset: &DatasetConfig, training: &TrainingConfig) -> TrainOutcome {
    let days = records.len();
    if days < training.min_corpus_days {
        debug!(days, required = training.min_corpus_days, "risk training skipped: short history");
        return TrainOutcome::NotTrained {
            reason: format!("Need at least {} days of history (have {days}).", training.min_corpus_days),
            days,
            rows: 0,
        };
    }

    let rows = build_dataset(records, dataset);
    if rows.len() < training.min_rows {
        debug!(rows = rows.len(), required = training.min_rows, "risk training skipped: few rows");
        return TrainOutcome::NotTrained {
            reason: format!(
                "Need at least {} usable training rows (have {}).",
                training.min_rows,
                rows.len()
            ),
            days,
            rows: rows.len(),
        };
    }

    let x: Vec<[f64; 6]> = rows.iter().map(|r| r.x).collect();
    let y_index: Vec<u8> = rows.iter().map(|r| r.y_index_drop).collect();
    let y_recovery: Vec<u8> = rows.iter().map(|r| r.y_recovery_drop).collect();
    let opts = training.options();

    let models = DualModels {
        version: MODELS_VERSION,
        window_days: dataset.window_days,
        k: dataset.k,
        trained_at: Utc::now(),
        rows_used: rows.len(),
        run_id: Uuid::new_v4(),
        index_drop: train(&x, &y_index, &FEATURE_NAMES, &opts),
        recovery_drop: train(&x, &y_recovery, &FEATURE_NAMES, &opts),
    };

    info!(rows = models.rows_used, run_id = %models.run_id, "trained risk models");
    TrainOutcome::Trained { models }
}

/// Largest contributions of a model on `x`, strongest first
pub fn top_drivers(model: &LogRegModel, x: &[f64]) -> Vec<RiskDriver> {
    let mut contributions = model.contributions(x);
    contributions.sort_by(|(_, a), (_, b)| b.abs().total_cmp(&a.abs()));
    contributions
        .into_iter()
        .take(MAX_RISK_DRIVERS)
        .map(|(name, c)| RiskDriver {
            name,
            direction: Direction::of(c),
            strength: c.abs(),
        })
        .collect()
}

/// Score the most recent dataset row against persisted models
pub fn predict_tomorrow(records: &[DailyRecord], models: Option<&DualModels>, dataset: &DatasetConfig) -> RiskPrediction {
    let rows = build_dataset(records, dataset);

    match (models, rows.last()) {
        (Some(models), Some(last)) => RiskPrediction {
            trained: true,
            rows_used: models.rows_used,
            index_risk_prob: Some(models.index_drop.predict_proba(&last.x)),
            recovery_risk_prob: Some(models.recovery_drop.predict_proba(&last.x)),
            top_drivers: top_drivers(&models.index_drop, &last.x),
        },
        _ => RiskPrediction {
            trained: false,
            rows_used: rows.len(),
            index_risk_prob: None,
            recovery_risk_prob: None,
            top_drivers: Vec::new(),
        },
    }
}
