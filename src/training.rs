//! Offline training: split, fit, evaluate, and package the four artifacts.

use crate::artifacts::{ModelArtifacts, CLASS_COUNT};
use crate::classifier::{Classifier, SoftmaxClassifier, SoftmaxConfig};
use crate::dataset::Dataset;
use crate::errors::{StressError, StressResult};
use crate::importance::ImportanceTable;
use crate::normalizer::Normalizer;
use crate::schema::FeatureSchema;
use serde::Serialize;
use tracing::{info, warn};

/// Class names used in evaluation reports
pub const CLASS_NAMES: [&str; CLASS_COUNT] = ["Low Stress", "Medium Stress", "High Stress"];

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub softmax: SoftmaxConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            softmax: SoftmaxConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: &'static str,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    /// `confusion[actual][predicted]`
    pub confusion: Vec<Vec<usize>>,
}

impl EvaluationReport {
    pub fn log(&self) {
        info!("Accuracy: {:.4}", self.accuracy);
        info!("{:>15} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support");
        for m in &self.per_class {
            info!(
                "{:>15} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.class, m.precision, m.recall, m.f1, m.support
            );
        }
        for (actual, row) in self.confusion.iter().enumerate() {
            info!("Confusion [{}]: {:?}", CLASS_NAMES[actual], row);
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Score a classifier on already-normalized rows
pub fn evaluate(
    classifier: &dyn Classifier,
    rows: &[Vec<f64>],
    labels: &[usize],
) -> StressResult<EvaluationReport> {
    if rows.is_empty() || rows.len() != labels.len() {
        return Err(StressError::training("nothing to evaluate"));
    }

    let mut confusion = vec![vec![0usize; CLASS_COUNT]; CLASS_COUNT];
    for (x, &y) in rows.iter().zip(labels) {
        let (pred, _) = classifier
            .predict(x)
            .map_err(|e| StressError::training(e.to_string()))?;
        if pred >= CLASS_COUNT {
            return Err(StressError::training(format!("predicted unknown class {pred}")));
        }
        let row = confusion
            .get_mut(y)
            .ok_or_else(|| StressError::training(format!("label {y} is not one of 0, 1, 2")))?;
        row[pred] += 1;
    }

    let correct: usize = (0..CLASS_COUNT).map(|c| confusion[c][c]).sum();
    let per_class = (0..CLASS_COUNT)
        .map(|c| {
            let tp = confusion[c][c];
            let support: usize = confusion[c].iter().sum();
            let predicted: usize = confusion.iter().map(|row| row[c]).sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                class: CLASS_NAMES[c],
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    Ok(EvaluationReport {
        accuracy: ratio(correct, rows.len()),
        per_class,
        confusion,
    })
}

pub struct TrainingOutcome {
    pub artifacts: ModelArtifacts,
    pub report: Option<EvaluationReport>,
}

/// Split, fit the normalizer and classifier, evaluate on the held-out rows,
/// and derive the global importance table.
pub fn train(dataset: &Dataset, config: &TrainingConfig) -> StressResult<TrainingOutcome> {
    let counts = dataset.class_counts()?;
    info!("Features: {}", dataset.feature_names.len());
    for (class, count) in counts.iter().enumerate() {
        info!("Stress level {class}: {count} rows");
    }

    let (train_set, test_set) = dataset.stratified_split(config.test_fraction, config.seed)?;
    info!(
        "Split: {} training rows, {} test rows",
        train_set.len(),
        test_set.len()
    );

    let normalizer = Normalizer::fit(&train_set.rows)?;
    let x_train = normalizer
        .transform_rows(&train_set.rows)
        .map_err(|e| StressError::training(e.to_string()))?;

    let classifier =
        SoftmaxClassifier::fit(&x_train, &train_set.labels, CLASS_COUNT, &config.softmax)?;

    let report = if test_set.is_empty() {
        warn!("Test split is empty; skipping evaluation");
        None
    } else {
        let x_test = normalizer
            .transform_rows(&test_set.rows)
            .map_err(|e| StressError::training(e.to_string()))?;
        let report = evaluate(&classifier, &x_test, &test_set.labels)?;
        report.log();
        Some(report)
    };

    let importance =
        ImportanceTable::from_scores(&dataset.feature_names, &classifier.feature_importances())?;
    info!("Top 10 most important features:");
    for entry in importance.entries().iter().take(10) {
        info!("  {:<30} {:.4}", entry.feature, entry.importance);
    }

    let artifacts = ModelArtifacts::new(
        FeatureSchema::new(dataset.feature_names.clone())?,
        normalizer,
        classifier,
        importance,
    )?;

    Ok(TrainingOutcome { artifacts, report })
}
