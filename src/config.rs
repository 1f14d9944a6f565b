//! Engine configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::analytics::DEFAULT_ANALYTICS_WINDOW;
use crate::baseline::DEFAULT_BASELINE_WINDOW;
use crate::consistency::DEFAULT_CONSISTENCY_WINDOW;
use crate::error::BalanceError;
use crate::risk::{DatasetConfig, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable windows and model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scored days averaged into the plan baseline
    pub plan_baseline_days: usize,
    pub consistency_window_days: usize,
    pub analytics_window_days: usize,
    /// Most recent records mined for patterns
    pub pattern_window_days: usize,
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plan_baseline_days: DEFAULT_BASELINE_WINDOW,
            consistency_window_days: DEFAULT_CONSISTENCY_WINDOW,
            analytics_window_days: DEFAULT_ANALYTICS_WINDOW,
            pattern_window_days: 30,
            dataset: DatasetConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, BalanceError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BalanceError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, BalanceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that would make a computation meaningless
    pub fn validate(&self) -> Result<(), BalanceError> {
        let windows = [
            ("plan_baseline_days", self.plan_baseline_days),
            ("consistency_window_days", self.consistency_window_days),
            ("analytics_window_days", self.analytics_window_days),
            ("pattern_window_days", self.pattern_window_days),
            ("dataset.window_days", self.dataset.window_days),
            ("dataset.min_samples", self.dataset.min_samples),
            ("training.steps", self.training.steps),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, value)| *value == 0) {
            return Err(BalanceError::ConfigError(format!("{name} must be greater than zero")));
        }
        if self.dataset.max_gap_days < 1 {
            return Err(BalanceError::ConfigError(
                "dataset.max_gap_days must be at least 1".to_string(),
            ));
        }
        if !(self.training.learning_rate.is_finite() && self.training.learning_rate > 0.0) {
            return Err(BalanceError::ConfigError(
                "training.learning_rate must be positive".to_string(),
            ));
        }
        if !(self.training.l2.is_finite() && self.training.l2 >= 0.0) {
            return Err(BalanceError::ConfigError("training.l2 must not be negative".to_string()));
        }
        if !(self.dataset.k.is_finite() && self.dataset.k >= 0.0) {
            return Err(BalanceError::ConfigError("dataset.k must not be negative".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.plan_baseline_days, 7);
        assert_eq!(config.dataset.window_days, 14);
        assert_eq!(config.training.steps, 900);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json(r#"{"plan_baseline_days": 10, "training": {"min_rows": 5}}"#).unwrap();
        assert_eq!(config.plan_baseline_days, 10);
        assert_eq!(config.training.min_rows, 5);
        assert_eq!(config.training.learning_rate, 0.12);
    }

    #[test]
    fn test_validation_failures() {
        let err = EngineConfig::from_json(r#"{"analytics_window_days": 0}"#).unwrap_err();
        assert!(err.to_string().contains("analytics_window_days"));

        assert!(EngineConfig::from_json(r#"{"training": {"learning_rate": 0}}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"training": {"l2": -0.1}}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"dataset": {"k": -1}}"#).is_err());
        assert!(EngineConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"consistency_window_days": 21}}"#).unwrap();
        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.consistency_window_days, 21);
    }
}
