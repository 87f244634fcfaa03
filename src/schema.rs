//! Feature schema: the ordered list of inputs the model was trained on.
//!
//! Schema order defines vector positions for both the normalizer and the
//! classifier. Nothing here can detect a schema that was reordered relative to
//! training; the artifact loader only checks that the dimensions agree.

use crate::errors::{InferenceError, StressError, StressResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Static description of a known feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub min: f64,
    pub max: f64,
}

impl FeatureDescriptor {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

const fn descriptor(
    name: &'static str,
    description: &'static str,
    min: f64,
    max: f64,
) -> FeatureDescriptor {
    FeatureDescriptor {
        name,
        description,
        min,
        max,
    }
}

/// Every feature the stress dataset is known to carry
pub const FEATURE_CATALOGUE: [FeatureDescriptor; 20] = [
    descriptor("anxiety_level", "Current anxiety level (0-21)", 0.0, 21.0),
    descriptor("self_esteem", "Self-esteem level (0-30)", 0.0, 30.0),
    descriptor("mental_health_history", "Mental health history (0=No, 1=Yes)", 0.0, 1.0),
    descriptor("depression", "Depression level (0-27)", 0.0, 27.0),
    descriptor("headache", "Headache frequency (0-5)", 0.0, 5.0),
    descriptor("blood_pressure", "Blood pressure level (1-5)", 1.0, 5.0),
    descriptor("sleep_quality", "Sleep quality (1-5)", 1.0, 5.0),
    descriptor("breathing_problem", "Breathing problems (1-5)", 1.0, 5.0),
    descriptor("noise_level", "Environment noise level (1-5)", 1.0, 5.0),
    descriptor("living_conditions", "Living conditions quality (1-5)", 1.0, 5.0),
    descriptor("safety", "Safety feeling (1-5)", 1.0, 5.0),
    descriptor("basic_needs", "Basic needs fulfillment (1-5)", 1.0, 5.0),
    descriptor("academic_performance", "Academic performance (1-5)", 1.0, 5.0),
    descriptor("study_load", "Study workload (1-5)", 1.0, 5.0),
    descriptor("teacher_student_relationship", "Teacher-student relationship (1-5)", 1.0, 5.0),
    descriptor("future_career_concerns", "Future career concerns (1-5)", 1.0, 5.0),
    descriptor("social_support", "Social support level (1-5)", 1.0, 5.0),
    descriptor("peer_pressure", "Peer pressure level (1-5)", 1.0, 5.0),
    descriptor("extracurricular_activities", "Extracurricular involvement (0-5)", 0.0, 5.0),
    descriptor("bullying", "Bullying experience (1-5)", 1.0, 5.0),
];

/// Look up the catalogue entry for a feature name
pub fn describe(name: &str) -> Option<&'static FeatureDescriptor> {
    FEATURE_CATALOGUE.iter().find(|d| d.name == name)
}

/// Per-request input as it arrived on the wire.
///
/// A key that is present with a non-numeric value is remembered as `None` so
/// that validation can tell "missing" from "unusable".
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    values: HashMap<String, Option<f64>>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), Some(value));
    }

    pub fn remove(&mut self, name: &str) {
        self.values.remove(name);
    }

    /// Build from a decoded JSON value. Anything other than an object, or an
    /// empty object, is an empty payload.
    pub fn from_json(value: serde_json::Value) -> Result<Self, InferenceError> {
        let object = match value {
            serde_json::Value::Object(map) if !map.is_empty() => map,
            _ => return Err(InferenceError::EmptyPayload),
        };

        let values = object
            .into_iter()
            .map(|(name, v)| {
                let number = match v {
                    serde_json::Value::Number(n) => n.as_f64(),
                    _ => None,
                };
                (name, number)
            })
            .collect();

        Ok(Self { values })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn lookup(&self, name: &str) -> Option<&Option<f64>> {
        self.values.get(name)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RawInput {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut input = RawInput::new();
        for (name, value) in iter {
            input.insert(name, value);
        }
        input
    }
}

/// Raw feature values that passed schema validation, in schema order.
///
/// Only [`FeatureSchema::validate`] constructs one, so holding a
/// `FeatureVector` means every required feature was present and numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Ordered, immutable list of required feature names
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    strict_ranges: bool,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty, blank or duplicated names
    pub fn new(names: Vec<String>) -> StressResult<Self> {
        if names.is_empty() {
            return Err(StressError::artifact(
                "feature_columns",
                "schema has no features",
            ));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(StressError::artifact(
                    "feature_columns",
                    "feature names must not be blank",
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(StressError::artifact(
                    "feature_columns",
                    format!("duplicate feature '{name}'"),
                ));
            }
        }

        Ok(Self {
            names,
            strict_ranges: false,
        })
    }

    /// Reject catalogued features whose value falls outside the documented range
    pub fn with_strict_ranges(mut self, strict: bool) -> Self {
        self.strict_ranges = strict;
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Walk the schema in order and pull each value out of the input.
    ///
    /// Fails on the first missing or unusable field; later problems are not
    /// reported. Keys not in the schema are ignored.
    pub fn validate(&self, input: &RawInput) -> Result<FeatureVector, InferenceError> {
        if input.is_empty() {
            return Err(InferenceError::EmptyPayload);
        }

        let mut values = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let value = match input.lookup(name) {
                None => return Err(InferenceError::missing_field(name)),
                Some(None) => {
                    return Err(InferenceError::invalid_value(name, "expected a number"))
                }
                Some(Some(v)) => *v,
            };

            if !value.is_finite() {
                return Err(InferenceError::invalid_value(name, "expected a finite number"));
            }

            if self.strict_ranges {
                if let Some(d) = describe(name) {
                    if !d.contains(value) {
                        return Err(InferenceError::invalid_value(
                            name,
                            format!("{value} is outside {}..={}", d.min, d.max),
                        ));
                    }
                }
            }

            values.push(value);
        }

        Ok(FeatureVector { values })
    }

    /// Human-readable description for every feature in the schema
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.names
            .iter()
            .map(|name| {
                let text = describe(name)
                    .map(|d| d.description.to_string())
                    .unwrap_or_else(|| format!("{} (numeric)", display_name(name)));
                (name.clone(), text)
            })
            .collect()
    }
}

/// Turn `teacher_student_relationship` into `Teacher Student Relationship`.
///
/// Casing follows word boundaries the same way for digits and punctuation: a
/// letter is upper-cased when the previous character is not a letter and
/// lower-cased otherwise.
pub fn display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_alpha = false;
    for c in name.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
