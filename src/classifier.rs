use crate::errors::{InferenceError, StressError, StressResult};
use serde::{Deserialize, Serialize};

/// A trained multi-class model over normalized feature vectors
pub trait Classifier: Send + Sync {
    /// Number of input features expected
    fn n_features(&self) -> usize;

    /// Number of classes in the output distribution
    fn n_classes(&self) -> usize;

    /// Probability for each class, summing to 1
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;

    /// Most probable class (lowest index on ties) and the full distribution
    fn predict(&self, features: &[f64]) -> Result<(usize, Vec<f64>), InferenceError> {
        let proba = self.predict_proba(features)?;
        let class = argmax(&proba)
            .ok_or_else(|| InferenceError::internal("classifier returned no probabilities"))?;
        Ok((class, proba))
    }

    /// Non-negative per-feature importance, normalized to sum to 1
    fn feature_importances(&self) -> Vec<f64>;
}

pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Gradient descent settings for [`SoftmaxClassifier::fit`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for SoftmaxConfig {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
            l2: 1e-3,
        }
    }
}

/// Multinomial logistic regression.
///
/// `weights[c][j]` is the weight of feature `j` for class `c`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl SoftmaxClassifier {
    pub fn new(weights: Vec<Vec<f64>>, bias: Vec<f64>) -> StressResult<Self> {
        let model = Self { weights, bias };
        model.check()?;
        Ok(model)
    }

    /// All-zero model: uniform distribution for every input
    pub fn zeros(n_classes: usize, n_features: usize) -> Self {
        Self {
            weights: vec![vec![0.0; n_features]; n_classes],
            bias: vec![0.0; n_classes],
        }
    }

    /// Validate parameters loaded from disk
    pub fn check(&self) -> StressResult<()> {
        if self.weights.is_empty() {
            return Err(StressError::artifact("stress_model", "model has no classes"));
        }
        if self.weights.len() != self.bias.len() {
            return Err(StressError::artifact(
                "stress_model",
                format!(
                    "{} weight rows but {} biases",
                    self.weights.len(),
                    self.bias.len()
                ),
            ));
        }
        let width = self.weights[0].len();
        if self.weights.iter().any(|row| row.len() != width) {
            return Err(StressError::artifact(
                "stress_model",
                "weight rows have inconsistent widths",
            ));
        }
        let finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.bias)
            .all(|w| w.is_finite());
        if !finite {
            return Err(StressError::artifact("stress_model", "non-finite parameter"));
        }
        Ok(())
    }

    fn logits(&self, features: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| b + row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>())
            .collect()
    }

    /// Full-batch gradient descent on the cross-entropy loss.
    ///
    /// Starts from zero weights, so the same data and config always produce the
    /// same model.
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        config: &SoftmaxConfig,
    ) -> StressResult<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(StressError::training(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some(bad) = labels.iter().find(|&&y| y >= n_classes) {
            return Err(StressError::training(format!(
                "label {bad} out of range for {n_classes} classes"
            )));
        }

        let n_features = rows[0].len();
        let n = rows.len() as f64;
        let mut model = Self::zeros(n_classes, n_features);

        for _ in 0..config.epochs {
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];

            for (x, &y) in rows.iter().zip(labels) {
                let proba = softmax(&model.logits(x));
                for c in 0..n_classes {
                    let err = proba[c] - if c == y { 1.0 } else { 0.0 };
                    grad_b[c] += err;
                    for (g, xj) in grad_w[c].iter_mut().zip(x) {
                        *g += err * xj;
                    }
                }
            }

            for c in 0..n_classes {
                model.bias[c] -= config.learning_rate * grad_b[c] / n;
                for (w, g) in model.weights[c].iter_mut().zip(&grad_w[c]) {
                    *w -= config.learning_rate * (g / n + config.l2 * *w);
                }
            }
        }

        model.check()?;
        Ok(model)
    }
}

impl Classifier for SoftmaxClassifier {
    fn n_features(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn n_classes(&self) -> usize {
        self.weights.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.n_features() {
            return Err(InferenceError::internal(format!(
                "classifier expects {} features, got {}",
                self.n_features(),
                features.len()
            )));
        }

        let proba = softmax(&self.logits(features));
        if proba.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::internal(
                "classifier produced a non-finite probability",
            ));
        }
        Ok(proba)
    }

    fn feature_importances(&self) -> Vec<f64> {
        let raw: Vec<f64> = (0..self.n_features())
            .map(|j| self.weights.iter().map(|row| row[j].abs()).sum())
            .collect();
        let total: f64 = raw.iter().sum();
        if total > 0.0 {
            raw.into_iter().map(|v| v / total).collect()
        } else {
            vec![0.0; raw.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_model_is_uniform_and_picks_first_class() {
        let model = SoftmaxClassifier::zeros(3, 2);
        let (class, proba) = model.predict(&[0.4, -1.2]).unwrap();
        assert_eq!(class, 0);
        for p in proba {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn probabilities_sum_to_one() {
        let model = SoftmaxClassifier::new(
            vec![vec![1.0, -2.0], vec![0.5, 0.5], vec![-3.0, 4.0]],
            vec![0.1, 0.0, -0.1],
        )
        .unwrap();
        let proba = model.predict_proba(&[0.3, 1.7]).unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(model.predict(&[0.3, 1.7]).unwrap().0, 2);
    }

    #[test]
    fn large_logits_do_not_overflow() {
        let model = SoftmaxClassifier::new(vec![vec![1000.0], vec![-1000.0]], vec![0.0, 0.0])
            .unwrap();
        let proba = model.predict_proba(&[5.0]).unwrap();
        assert!((proba[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_width_is_internal_error() {
        let model = SoftmaxClassifier::zeros(3, 4);
        let err = model.predict(&[1.0, 2.0]).unwrap_err();
        assert!(!err.is_client_error());
    }

    #[test]
    fn fit_separates_linearly_separable_classes() {
        let rows = vec![
            vec![-2.0],
            vec![-1.5],
            vec![-1.8],
            vec![0.0],
            vec![0.1],
            vec![-0.1],
            vec![2.0],
            vec![1.7],
            vec![1.9],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let config = SoftmaxConfig {
            epochs: 2000,
            learning_rate: 0.5,
            l2: 0.0,
        };
        let model = SoftmaxClassifier::fit(&rows, &labels, 3, &config).unwrap();

        assert_eq!(model.predict(&[-2.5]).unwrap().0, 0);
        assert_eq!(model.predict(&[2.5]).unwrap().0, 2);

        let again = SoftmaxClassifier::fit(&rows, &labels, 3, &config).unwrap();
        assert_eq!(model, again);
    }

    #[test]
    fn fit_rejects_out_of_range_labels() {
        let rows = vec![vec![0.0], vec![1.0]];
        assert!(SoftmaxClassifier::fit(&rows, &[0, 3], 3, &SoftmaxConfig::default()).is_err());
        assert!(SoftmaxClassifier::fit(&rows, &[0], 3, &SoftmaxConfig::default()).is_err());
    }

    #[test]
    fn importances_are_normalized_absolute_weights() {
        let model = SoftmaxClassifier::new(
            vec![vec![1.0, -3.0, 0.0], vec![-1.0, 1.0, 0.0]],
            vec![0.0, 0.0],
        )
        .unwrap();
        assert_eq!(model.feature_importances(), vec![2.0 / 6.0, 4.0 / 6.0, 0.0]);
        assert_eq!(SoftmaxClassifier::zeros(3, 2).feature_importances(), vec![0.0, 0.0]);
    }
}
