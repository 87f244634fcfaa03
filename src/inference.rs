//! Inference pipeline: schema validation, normalization, classification and
//! factor ranking, composed into a single call.

use crate::artifacts::{ModelArtifacts, CLASS_COUNT};
use crate::classifier::Classifier;
use crate::errors::{InferenceError, StressError, StressResult};
use crate::importance::{ContributingFactor, ImportanceRanker, ImportanceTable};
use crate::normalizer::Normalizer;
use crate::schema::{FeatureSchema, RawInput};
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_TOP_FACTORS: usize = 3;

pub const DISCLAIMER: &str = "This assessment is for informational purposes only and should not replace professional medical advice.";

const LOW_RISK_RECOMMENDATIONS: &[&str] = &[
    "Maintain your current healthy habits",
    "Continue regular exercise and good sleep schedule",
    "Keep practicing stress management techniques",
    "Stay connected with friends and family",
];

const MODERATE_RISK_RECOMMENDATIONS: &[&str] = &[
    "Consider stress management techniques like deep breathing or meditation",
    "Ensure you're getting 7-8 hours of sleep each night",
    "Take regular breaks from academic work",
    "Talk to friends, family, or a counselor about your concerns",
    "Engage in physical activity or hobbies you enjoy",
];

const HIGH_RISK_RECOMMENDATIONS: &[&str] = &[
    "Consider speaking with a mental health professional",
    "Contact your institution's counseling services",
    "Reach out to trusted friends or family members",
    "Practice immediate stress relief techniques (deep breathing, progressive muscle relaxation)",
    "Prioritize sleep, nutrition, and basic self-care",
    "If experiencing crisis thoughts, contact emergency services immediately",
];

/// Predicted stress class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StressLevel {
    Low,
    Moderate,
    High,
}

impl StressLevel {
    pub const ALL: [StressLevel; CLASS_COUNT] =
        [StressLevel::Low, StressLevel::Moderate, StressLevel::High];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            StressLevel::Low => 0,
            StressLevel::Moderate => 1,
            StressLevel::High => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StressLevel::Low => "Low Risk",
            StressLevel::Moderate => "Moderate Risk",
            StressLevel::High => "High Risk",
        }
    }

    /// Fixed advice for the class; not derived from the model
    pub fn recommendations(self) -> &'static [&'static str] {
        match self {
            StressLevel::Low => LOW_RISK_RECOMMENDATIONS,
            StressLevel::Moderate => MODERATE_RISK_RECOMMENDATIONS,
            StressLevel::High => HIGH_RISK_RECOMMENDATIONS,
        }
    }
}

/// Complete outcome of one inference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub level: StressLevel,
    pub class_index: usize,
    /// Highest class probability, in `[0, 1]`
    pub confidence: f64,
    pub probabilities: Vec<f64>,
    pub recommendations: Vec<String>,
    pub contributing_factors: Vec<ContributingFactor>,
}

impl PredictionResult {
    pub fn label(&self) -> &'static str {
        self.level.label()
    }
}

/// Runs the pipeline against one immutable set of artifacts.
///
/// Holds no mutable state, so a single engine behind an `Arc` serves any
/// number of concurrent requests.
pub struct InferenceEngine {
    schema: FeatureSchema,
    normalizer: Normalizer,
    classifier: Box<dyn Classifier>,
    ranker: ImportanceRanker,
    top_factors: usize,
}

impl InferenceEngine {
    pub fn new(
        schema: FeatureSchema,
        normalizer: Normalizer,
        classifier: Box<dyn Classifier>,
        importance: ImportanceTable,
        top_factors: usize,
    ) -> StressResult<Self> {
        if top_factors == 0 {
            return Err(StressError::config("top_factors must be at least 1"));
        }
        if classifier.n_classes() != CLASS_COUNT {
            return Err(StressError::artifact(
                "classifier",
                format!(
                    "model predicts {} classes, expected {CLASS_COUNT}",
                    classifier.n_classes()
                ),
            ));
        }

        Ok(Self {
            schema,
            normalizer,
            classifier,
            ranker: ImportanceRanker::new(importance),
            top_factors,
        })
    }

    pub fn from_artifacts(artifacts: ModelArtifacts, top_factors: usize) -> StressResult<Self> {
        let ModelArtifacts {
            schema,
            normalizer,
            classifier,
            importance,
        } = artifacts;
        Self::new(
            schema,
            normalizer,
            Box::new(classifier),
            importance,
            top_factors,
        )
    }

    /// Reject catalogued features outside their documented range
    pub fn with_strict_ranges(mut self, strict: bool) -> Self {
        self.schema = self.schema.with_strict_ranges(strict);
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Validate, normalize, classify and explain one input.
    ///
    /// Returns either a complete result or an error, never a partial result.
    pub fn infer(&self, input: &RawInput) -> Result<PredictionResult, InferenceError> {
        let raw = self.schema.validate(input)?;
        let normalized = self.normalizer.transform(raw.values())?;
        let (class_index, probabilities) = self.classifier.predict(&normalized)?;

        let level = StressLevel::from_index(class_index).ok_or_else(|| {
            InferenceError::internal(format!("classifier returned unknown class {class_index}"))
        })?;
        let confidence = probabilities.get(class_index).copied().ok_or_else(|| {
            InferenceError::internal("classifier returned fewer probabilities than classes")
        })?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(InferenceError::internal(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }

        let contributing_factors = self.ranker.rank(&self.schema, &raw, self.top_factors);

        debug!(
            "Predicted {} (class {class_index}) with confidence {confidence:.4}",
            level.label()
        );

        Ok(PredictionResult {
            level,
            class_index,
            confidence,
            probabilities,
            recommendations: level
                .recommendations()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            contributing_factors,
        })
    }
}
