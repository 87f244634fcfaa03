//! Global feature importance and per-prediction factor ranking.

use crate::errors::{StressError, StressResult};
use crate::schema::{display_name, FeatureSchema, FeatureVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the importance table as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Training-time importance per feature, sorted most important first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportanceTable {
    entries: Vec<FeatureImportance>,
    index: HashMap<String, f64>,
}

impl ImportanceTable {
    pub fn new(mut entries: Vec<FeatureImportance>) -> StressResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for entry in &entries {
            if !entry.importance.is_finite() || entry.importance < 0.0 {
                return Err(StressError::artifact(
                    "feature_importance",
                    format!(
                        "importance for '{}' must be a non-negative number",
                        entry.feature
                    ),
                ));
            }
            if index.insert(entry.feature.clone(), entry.importance).is_some() {
                return Err(StressError::artifact(
                    "feature_importance",
                    format!("duplicate feature '{}'", entry.feature),
                ));
            }
        }

        entries.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Ok(Self { entries, index })
    }

    /// Pair feature names with scores, e.g. straight from a trained model
    pub fn from_scores(names: &[String], scores: &[f64]) -> StressResult<Self> {
        if names.len() != scores.len() {
            return Err(StressError::artifact(
                "feature_importance",
                format!("{} names but {} scores", names.len(), scores.len()),
            ));
        }
        Self::new(
            names
                .iter()
                .zip(scores)
                .map(|(feature, &importance)| FeatureImportance {
                    feature: feature.clone(),
                    importance,
                })
                .collect(),
        )
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.index.get(feature).copied()
    }

    pub fn entries(&self) -> &[FeatureImportance] {
        &self.entries
    }
}

/// A feature that contributed to one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributingFactor {
    pub factor: String,
    pub importance: f64,
    pub value: f64,
}

/// Explains a prediction by ranking features on global importance.
///
/// Only the first `top_n` features in schema order are candidates. A feature
/// further down the schema is never reported however important it is; existing
/// clients depend on this selection, so it is kept as is.
#[derive(Debug, Clone)]
pub struct ImportanceRanker {
    table: ImportanceTable,
}

impl ImportanceRanker {
    pub fn new(table: ImportanceTable) -> Self {
        Self { table }
    }

    /// Rank the leading `top_n` schema features by importance, descending.
    /// Ties keep schema order; features missing from the table are skipped.
    pub fn rank(
        &self,
        schema: &FeatureSchema,
        raw: &FeatureVector,
        top_n: usize,
    ) -> Vec<ContributingFactor> {
        let mut factors: Vec<ContributingFactor> = schema
            .names()
            .iter()
            .zip(raw.values())
            .take(top_n)
            .filter_map(|(name, &value)| {
                self.table.get(name).map(|importance| ContributingFactor {
                    factor: display_name(name),
                    importance,
                    value,
                })
            })
            .collect();

        factors.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        factors.truncate(top_n);
        factors
    }
}
