//! Labeled CSV datasets and stratified train/test splitting.

use crate::artifacts::CLASS_COUNT;
use crate::errors::{StressError, StressResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::Read;
use std::path::Path;
use tracing::info;

pub const DEFAULT_TARGET_COLUMN: &str = "stress_level";

/// Feature matrix plus class labels. Every column except the target is a
/// feature, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn from_path(path: impl AsRef<Path>, target: &str) -> StressResult<Self> {
        let path = path.as_ref();
        let reader = csv::Reader::from_path(path)
            .map_err(|e| StressError::csv(format!("opening {}", path.display()), e))?;
        let dataset = Self::from_csv(reader, target)?;
        info!(
            "Dataset shape: ({}, {})",
            dataset.len(),
            dataset.feature_names.len() + 1
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R, target: &str) -> StressResult<Self> {
        Self::from_csv(csv::Reader::from_reader(reader), target)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>, target: &str) -> StressResult<Self> {
        let headers = reader
            .headers()
            .map_err(|e| StressError::csv("reading header row", e))?
            .clone();

        let target_idx = headers
            .iter()
            .position(|h| h.trim() == target)
            .ok_or_else(|| StressError::dataset(format!("target column '{target}' not found")))?;
        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, h)| h.trim().to_string())
            .collect();
        if feature_names.is_empty() {
            return Err(StressError::dataset("no feature columns besides the target"));
        }

        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (n, record) in reader.records().enumerate() {
            let line = n + 2;
            let record = record.map_err(|e| StressError::csv(format!("reading line {line}"), e))?;

            let mut row = Vec::with_capacity(feature_names.len());
            let mut label = None;
            for (i, cell) in record.iter().enumerate() {
                let value: f64 = cell.trim().parse().map_err(|_| {
                    StressError::dataset(format!(
                        "line {line}: column '{}' is not a number: '{cell}'",
                        &headers[i]
                    ))
                })?;
                if i == target_idx {
                    label = Some(parse_label(value, line)?);
                } else {
                    row.push(value);
                }
            }

            let label =
                label.ok_or_else(|| StressError::dataset(format!("line {line}: missing target")))?;
            rows.push(row);
            labels.push(label);
        }

        if rows.is_empty() {
            return Err(StressError::dataset("dataset has no rows"));
        }

        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fail when labels and rows disagree in length or a label is not a known class
    pub fn check_labels(&self) -> StressResult<()> {
        if self.rows.len() != self.labels.len() {
            return Err(StressError::training(format!(
                "{} rows but {} labels",
                self.rows.len(),
                self.labels.len()
            )));
        }
        if let Some(bad) = self.labels.iter().find(|&&y| y >= CLASS_COUNT) {
            return Err(StressError::training(format!(
                "label {bad} is not one of 0, 1, 2"
            )));
        }
        Ok(())
    }

    /// Row count per class
    pub fn class_counts(&self) -> StressResult<[usize; CLASS_COUNT]> {
        self.check_labels()?;
        let mut counts = [0; CLASS_COUNT];
        for &y in &self.labels {
            counts[y] += 1;
        }
        Ok(counts)
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Split into (train, test), taking `round(n_c * test_fraction)` rows of
    /// every class for the test side. Same seed, same split.
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> StressResult<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(StressError::training(format!(
                "test fraction must be in (0, 1), got {test_fraction}"
            )));
        }
        self.check_labels()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train = Vec::new();
        let mut test = Vec::new();

        for class in 0..CLASS_COUNT {
            let mut members: Vec<usize> = (0..self.len())
                .filter(|&i| self.labels[i] == class)
                .collect();
            members.shuffle(&mut rng);

            let n_test = (members.len() as f64 * test_fraction).round() as usize;
            test.extend_from_slice(&members[..n_test]);
            train.extend_from_slice(&members[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();

        if train.is_empty() {
            return Err(StressError::training("split left no training rows"));
        }
        Ok((self.subset(&train), self.subset(&test)))
    }
}

fn parse_label(value: f64, line: usize) -> StressResult<usize> {
    if value.fract() == 0.0 && value >= 0.0 && (value as usize) < CLASS_COUNT {
        Ok(value as usize)
    } else {
        Err(StressError::dataset(format!(
            "line {line}: label {value} is not one of 0, 1, 2"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
anxiety_level,self_esteem,stress_level,bullying
14,20,1,2
15,8,2,4
12,18,1,2
16,12,2,5
3,27,0,1
5,25,0,1
";

    #[test]
    fn target_column_is_pulled_out_wherever_it_sits() {
        let ds = Dataset::from_reader(CSV.as_bytes(), DEFAULT_TARGET_COLUMN).unwrap();
        assert_eq!(ds.feature_names, vec!["anxiety_level", "self_esteem", "bullying"]);
        assert_eq!(ds.rows[1], vec![15.0, 8.0, 4.0]);
        assert_eq!(ds.labels, vec![1, 2, 1, 2, 0, 0]);
        assert_eq!(ds.class_counts().unwrap(), [2, 2, 2]);
    }

    #[test]
    fn missing_target_column_fails() {
        let err = Dataset::from_reader(CSV.as_bytes(), "stress").unwrap_err();
        assert!(err.to_string().contains("target column 'stress' not found"));
    }

    #[test]
    fn non_numeric_cell_names_line_and_column() {
        let csv = "a,stress_level\n1,0\nlots,1\n";
        let err = Dataset::from_reader(csv.as_bytes(), DEFAULT_TARGET_COLUMN).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 3"), "{msg}");
        assert!(msg.contains("'a'"), "{msg}");
    }

    #[test]
    fn labels_outside_known_classes_fail() {
        let csv = "a,stress_level\n1,3\n";
        assert!(Dataset::from_reader(csv.as_bytes(), DEFAULT_TARGET_COLUMN).is_err());
        let csv = "a,stress_level\n1,0.5\n";
        assert!(Dataset::from_reader(csv.as_bytes(), DEFAULT_TARGET_COLUMN).is_err());
    }

    #[test]
    fn stratified_split_is_seeded_and_balanced() {
        let ds = Dataset::from_reader(CSV.as_bytes(), DEFAULT_TARGET_COLUMN).unwrap();
        let (train, test) = ds.stratified_split(0.5, 42).unwrap();

        assert_eq!(train.class_counts().unwrap(), [1, 1, 1]);
        assert_eq!(test.class_counts().unwrap(), [1, 1, 1]);
        assert_eq!(train.len() + test.len(), ds.len());

        let (train2, test2) = ds.stratified_split(0.5, 42).unwrap();
        assert_eq!(train, train2);
        assert_eq!(test, test2);
    }

    #[test]
    fn hand_built_labels_out_of_range_are_errors() {
        let mut ds = Dataset::from_reader(CSV.as_bytes(), DEFAULT_TARGET_COLUMN).unwrap();
        ds.labels[0] = 7;

        let err = ds.class_counts().unwrap_err();
        assert!(matches!(err, StressError::Training { .. }));
        assert!(err.to_string().contains("label 7"));
        assert!(ds.stratified_split(0.5, 42).is_err());

        ds.labels.pop();
        assert!(ds.class_counts().is_err());
    }

    #[test]
    fn split_fraction_must_be_proper() {
        let ds = Dataset::from_reader(CSV.as_bytes(), DEFAULT_TARGET_COLUMN).unwrap();
        assert!(ds.stratified_split(0.0, 1).is_err());
        assert!(ds.stratified_split(1.0, 1).is_err());
    }
}
