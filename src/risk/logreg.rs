//! Minimal logistic regression with L2 regularization
//!
//! Full-batch gradient descent over small in-memory datasets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sigmoid input is clamped to this magnitude
const SIGMOID_CLAMP: f64 = 35.0;

/// A trained binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub trained_at: DateTime<Utc>,
}

/// Gradient descent hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainOptions {
    pub steps: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            steps: 800,
            learning_rate: 0.1,
            l2: 0.02,
        }
    }
}

pub fn sigmoid(z: f64) -> f64 {
    let x = z.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP);
    1.0 / (1.0 + (-x).exp())
}

/// Linear score `bias + w·x`; extra or missing features are ignored
fn linear(weights: &[f64], bias: f64, x: &[f64]) -> f64 {
    bias + weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>()
}

impl LogRegModel {
    /// Probability of the positive class
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        predict_proba(&self.weights, self.bias, x)
    }

    /// Per-feature contributions `w_i * x_i`, paired with feature names
    pub fn contributions(&self, x: &[f64]) -> Vec<(String, f64)> {
        self.feature_names
            .iter()
            .zip(self.weights.iter().zip(x))
            .map(|(name, (w, v))| (name.clone(), w * v))
            .collect()
    }
}

pub fn predict_proba(weights: &[f64], bias: f64, x: &[f64]) -> f64 {
    sigmoid(linear(weights, bias, x))
}

/// Fit a model on rows `x` with 0/1 labels `y`.
///
/// An empty dataset yields a zero-weight model.
pub fn train<R: AsRef<[f64]>>(x: &[R], y: &[u8], feature_names: &[&str], opts: &TrainOptions) -> LogRegModel {
    let d = feature_names.len();
    let n = x.len().min(y.len());
    let mut w = vec![0.0; d];
    let mut b = 0.0;

    if n > 0 {
        for _ in 0..opts.steps {
            let mut gb = 0.0;
            let mut gw = vec![0.0; d];

            for (row, label) in x.iter().zip(y).take(n) {
                let row = row.as_ref();
                let err = predict_proba(&w, b, row) - f64::from(*label);
                gb += err;
                for (g, v) in gw.iter_mut().zip(row) {
                    *g += err * v;
                }
            }

            gb /= n as f64;
            b -= opts.learning_rate * gb;
            for (wj, gj) in w.iter_mut().zip(&gw) {
                let grad = gj / n as f64 + opts.l2 * *wj;
                *wj -= opts.learning_rate * grad;
            }
        }
    }

    LogRegModel {
        feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
        weights: w,
        bias: b,
        trained_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_clamped() {
        assert!((sigmoid(0.0) - 0.5).abs() < 0.001);
        assert_eq!(sigmoid(1000.0), sigmoid(35.0));
        assert!(sigmoid(-1000.0) > 0.0);
    }

    #[test]
    fn test_learns_separable_feature() {
        let x: Vec<[f64; 2]> = vec![[-2.0, 0.1], [-1.5, -0.2], [-1.0, 0.3], [1.0, 0.0], [1.5, -0.1], [2.0, 0.2]];
        let y = [0, 0, 0, 1, 1, 1];
        let model = train(&x, &y, &["a", "b"], &TrainOptions::default());

        assert!(model.weights[0] > 0.5);
        assert!(model.predict_proba(&[2.0, 0.0]) > 0.8);
        assert!(model.predict_proba(&[-2.0, 0.0]) < 0.2);
    }

    #[test]
    fn test_probability_monotone_in_positive_weight() {
        let model = LogRegModel {
            feature_names: vec!["a".into(), "b".into()],
            weights: vec![0.8, -0.3],
            bias: -0.2,
            trained_at: Utc::now(),
        };
        let mut last = 0.0;
        for step in -5..=5 {
            let p = model.predict_proba(&[step as f64, 1.0]);
            assert!(p > last);
            last = p;
        }
    }

    #[test]
    fn test_empty_dataset_gives_zero_model() {
        let x: Vec<[f64; 3]> = Vec::new();
        let model = train(&x, &[], &["a", "b", "c"], &TrainOptions::default());
        assert_eq!(model.weights, vec![0.0; 3]);
        assert_eq!(model.bias, 0.0);
        assert!((model.predict_proba(&[1.0, 1.0, 1.0]) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_contributions_pair_names() {
        let model = LogRegModel {
            feature_names: vec!["a".into(), "b".into()],
            weights: vec![2.0, -1.0],
            bias: 0.0,
            trained_at: Utc::now(),
        };
        let contributions = model.contributions(&[0.5, 3.0]);
        assert_eq!(contributions, vec![("a".to_string(), 1.0), ("b".to_string(), -3.0)]);
    }
}
