//! Personal next-day risk models
//!
//! Builds a small supervised dataset from the history, fits two logistic
//! regressions (index drop and recovery drop) and scores tomorrow's risk from
//! the most recent day's features.

pub mod dataset;
pub mod logreg;
pub mod models;

pub use dataset::{build_dataset, DatasetConfig, FeatureRow, FEATURE_NAMES};
pub use logreg::{predict_proba, train, LogRegModel, TrainOptions};
pub use models::{
    predict_tomorrow, top_drivers, train_if_ready, DualModels, RiskDriver, RiskPrediction, TrainOutcome,
    TrainingConfig,
};
