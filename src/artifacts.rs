//! On-disk model bundle: the four trained artifacts plus a manifest.

use crate::classifier::{Classifier, SoftmaxClassifier};
use crate::errors::{StressError, StressResult};
use crate::importance::{FeatureImportance, ImportanceTable};
use crate::normalizer::Normalizer;
use crate::schema::FeatureSchema;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "stress_model.json";
pub const IMPORTANCE_FILE: &str = "feature_importance.json";
pub const MANIFEST_FILE: &str = "model_manifest.json";

/// Files every manifest must cover
const ARTIFACT_FILES: [&str; 4] = [FEATURE_COLUMNS_FILE, SCALER_FILE, MODEL_FILE, IMPORTANCE_FILE];

/// Number of stress classes every model must predict
pub const CLASS_COUNT: usize = 3;

/// Build record written next to the artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub model_kind: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub n_features: usize,
    pub classes: usize,
    pub test_accuracy: Option<f64>,
    /// File name -> hex SHA-256
    pub files: BTreeMap<String, String>,
}

/// Everything inference needs, loaded once and never mutated
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub schema: FeatureSchema,
    pub normalizer: Normalizer,
    pub classifier: SoftmaxClassifier,
    pub importance: ImportanceTable,
}

impl ModelArtifacts {
    /// Assemble and cross-check a bundle
    pub fn new(
        schema: FeatureSchema,
        normalizer: Normalizer,
        classifier: SoftmaxClassifier,
        importance: ImportanceTable,
    ) -> StressResult<Self> {
        let artifacts = Self {
            schema,
            normalizer,
            classifier,
            importance,
        };
        artifacts.check()?;
        Ok(artifacts)
    }

    fn check(&self) -> StressResult<()> {
        self.normalizer.check()?;
        self.classifier.check()?;

        let width = self.schema.len();
        if self.normalizer.dimension() != width {
            return Err(StressError::artifact(
                SCALER_FILE,
                format!(
                    "scaler has {} features, schema has {width}",
                    self.normalizer.dimension()
                ),
            ));
        }
        if self.classifier.n_features() != width {
            return Err(StressError::artifact(
                MODEL_FILE,
                format!(
                    "model has {} features, schema has {width}",
                    self.classifier.n_features()
                ),
            ));
        }
        if self.classifier.n_classes() != CLASS_COUNT {
            return Err(StressError::artifact(
                MODEL_FILE,
                format!(
                    "model predicts {} classes, expected {CLASS_COUNT}",
                    self.classifier.n_classes()
                ),
            ));
        }
        for entry in self.importance.entries() {
            if !self.schema.names().contains(&entry.feature) {
                warn!(
                    "Importance table lists '{}' which is not in the schema",
                    entry.feature
                );
            }
        }
        Ok(())
    }

    /// Load and validate the bundle in `dir`.
    ///
    /// When a manifest is present every artifact's hash must match it.
    pub fn load(dir: impl AsRef<Path>) -> StressResult<Self> {
        let dir = dir.as_ref();
        info!("Loading model artifacts from {}", dir.display());

        let columns: Vec<String> = read_json(dir, FEATURE_COLUMNS_FILE)?;
        let normalizer: Normalizer = read_json(dir, SCALER_FILE)?;
        let classifier: SoftmaxClassifier = read_json(dir, MODEL_FILE)?;
        let importance: Vec<FeatureImportance> = read_json(dir, IMPORTANCE_FILE)?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            let manifest: ModelManifest = read_json(dir, MANIFEST_FILE)?;
            verify_manifest(dir, &manifest)?;
            debug!(
                "Manifest verified: {} v{} built {}",
                manifest.model_kind, manifest.version, manifest.created_at
            );
        } else {
            warn!("No {MANIFEST_FILE} in {}; skipping integrity check", dir.display());
        }

        let artifacts = Self::new(
            FeatureSchema::new(columns)?,
            normalizer,
            classifier,
            ImportanceTable::new(importance)?,
        )?;

        info!(
            "Model artifacts loaded: {} features, {} classes",
            artifacts.schema.len(),
            artifacts.classifier.n_classes()
        );
        Ok(artifacts)
    }

    /// Write the bundle and its manifest into `dir`, creating it if needed
    pub fn save(
        &self,
        dir: impl AsRef<Path>,
        test_accuracy: Option<f64>,
    ) -> StressResult<ModelManifest> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| StressError::io(format!("creating {}", dir.display()), e))?;

        let mut files = BTreeMap::new();
        files.insert(
            FEATURE_COLUMNS_FILE.to_string(),
            write_json(dir, FEATURE_COLUMNS_FILE, &self.schema.names())?,
        );
        files.insert(
            SCALER_FILE.to_string(),
            write_json(dir, SCALER_FILE, &self.normalizer)?,
        );
        files.insert(
            MODEL_FILE.to_string(),
            write_json(dir, MODEL_FILE, &self.classifier)?,
        );
        files.insert(
            IMPORTANCE_FILE.to_string(),
            write_json(dir, IMPORTANCE_FILE, &self.importance.entries())?,
        );

        let manifest = ModelManifest {
            model_kind: "softmax_regression".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            n_features: self.schema.len(),
            classes: self.classifier.n_classes(),
            test_accuracy,
            files,
        };
        write_json(dir, MANIFEST_FILE, &manifest)?;

        info!("Model artifacts saved to {}", dir.display());
        Ok(manifest)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> StressResult<T> {
    let path = dir.join(name);
    let bytes =
        fs::read(&path).map_err(|e| StressError::io(format!("reading {}", path.display()), e))?;
    serde_json::from_slice(&bytes).map_err(|e| StressError::serialization(format!("parsing {name}"), e))
}

/// Write pretty JSON and return the SHA-256 of what was written
fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> StressResult<String> {
    let path = dir.join(name);
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| StressError::serialization(format!("encoding {name}"), e))?;
    fs::write(&path, &json)
        .map_err(|e| StressError::io(format!("writing {}", path.display()), e))?;
    Ok(sha256_hex(&json))
}

fn verify_manifest(dir: &Path, manifest: &ModelManifest) -> StressResult<()> {
    for name in ARTIFACT_FILES {
        if !manifest.files.contains_key(name) {
            return Err(StressError::artifact(name, "missing from manifest"));
        }
    }
    for (name, expected) in &manifest.files {
        let path = dir.join(name);
        let bytes = fs::read(&path)
            .map_err(|e| StressError::io(format!("reading {}", path.display()), e))?;
        let actual = sha256_hex(&bytes);
        if &actual != expected {
            return Err(StressError::artifact(
                name.as_str(),
                format!("checksum mismatch: manifest {expected}, file {actual}"),
            ));
        }
    }
    Ok(())
}
