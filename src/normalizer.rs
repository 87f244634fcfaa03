use crate::errors::{InferenceError, StressError, StressResult};
use serde::{Deserialize, Serialize};

/// Per-feature standardisation parameters fitted on the training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Normalizer {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> StressResult<Self> {
        let normalizer = Self { mean, scale };
        normalizer.check()?;
        Ok(normalizer)
    }

    /// Fit mean and population standard deviation per column.
    /// Constant columns get a scale of 1 so they normalize to zero.
    pub fn fit(rows: &[Vec<f64>]) -> StressResult<Self> {
        let first = rows
            .first()
            .ok_or_else(|| StressError::training("cannot fit a normalizer on zero rows"))?;
        let width = first.len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(StressError::training("rows have inconsistent widths"));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self::new(mean, scale)
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Validate parameters loaded from disk
    pub fn check(&self) -> StressResult<()> {
        if self.mean.len() != self.scale.len() {
            return Err(StressError::artifact(
                "scaler",
                format!(
                    "{} means but {} scales",
                    self.mean.len(),
                    self.scale.len()
                ),
            ));
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(StressError::artifact("scaler", format!("mean[{i}] is not finite")));
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(StressError::artifact(
                "scaler",
                format!("scale[{i}] must be finite and non-zero"),
            ));
        }
        Ok(())
    }

    /// `(raw[i] - mean[i]) / scale[i]` for every position
    pub fn transform(&self, raw: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if raw.len() != self.mean.len() {
            return Err(InferenceError::internal(format!(
                "normalizer expects {} features, got {}",
                self.mean.len(),
                raw.len()
            )));
        }

        Ok(raw
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Normalize a whole matrix; used by the trainer where widths are known to match
    pub fn transform_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, InferenceError> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_applies_affine_per_position() {
        let n = Normalizer::new(vec![10.0, 2.0], vec![5.0, 0.5]).unwrap();
        assert_eq!(n.transform(&[20.0, 1.0]).unwrap(), vec![2.0, -2.0]);
    }

    #[test]
    fn transform_rejects_dimension_mismatch() {
        let n = Normalizer::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let err = n.transform(&[1.0]).unwrap_err();
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("expects 2 features, got 1"));
    }

    #[test]
    fn fit_uses_population_std_and_guards_constant_columns() {
        let rows = vec![vec![1.0, 7.0], vec![3.0, 7.0]];
        let n = Normalizer::fit(&rows).unwrap();
        assert_eq!(n.mean, vec![2.0, 7.0]);
        assert_eq!(n.scale, vec![1.0, 1.0]);

        let rows = vec![vec![0.0], vec![4.0]];
        let n = Normalizer::fit(&rows).unwrap();
        assert_eq!(n.scale, vec![2.0]);
    }

    #[test]
    fn zero_scale_is_an_invalid_artifact() {
        assert!(Normalizer::new(vec![0.0, 1.0], vec![1.0, 0.0]).is_err());
        assert!(Normalizer::new(vec![0.0], vec![1.0, 1.0]).is_err());
        assert!(Normalizer::new(vec![f64::NAN], vec![1.0]).is_err());
    }
}
