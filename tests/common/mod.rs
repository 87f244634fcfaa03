//! Shared fixtures: a hand-built model whose behaviour is easy to reason about.
//!
//! Class 2 weights point along the "stressed" direction of every feature,
//! class 0 weights point the other way and class 1 is flat. A student with
//! high anxiety and low self-esteem therefore lands in class 2 with a large
//! margin, and a student sitting exactly on the training means gets a uniform
//! distribution.

#![allow(dead_code)]

use serde_json::{json, Value};
use stresslens::classifier::SoftmaxClassifier;
use stresslens::importance::ImportanceTable;
use stresslens::normalizer::Normalizer;
use stresslens::{FeatureSchema, InferenceEngine, ModelArtifacts, RawInput};

/// (name, mean, scale, +1 if higher means more stress, importance)
pub const FEATURES: [(&str, f64, f64, f64, f64); 20] = [
    ("anxiety_level", 11.0, 6.1, 1.0, 0.07),
    ("self_esteem", 17.8, 8.9, -1.0, 0.09),
    ("mental_health_history", 0.5, 0.5, 1.0, 0.01),
    ("depression", 12.6, 7.7, 1.0, 0.06),
    ("headache", 2.5, 1.4, 1.0, 0.04),
    ("blood_pressure", 2.2, 0.8, 1.0, 0.08),
    ("sleep_quality", 2.7, 1.5, -1.0, 0.05),
    ("breathing_problem", 2.8, 1.4, 1.0, 0.02),
    ("noise_level", 2.6, 1.3, 1.0, 0.03),
    ("living_conditions", 2.5, 1.1, -1.0, 0.02),
    ("safety", 2.7, 1.4, -1.0, 0.05),
    ("basic_needs", 2.8, 1.4, -1.0, 0.06),
    ("academic_performance", 2.8, 1.4, -1.0, 0.05),
    ("study_load", 2.6, 1.3, 1.0, 0.03),
    ("teacher_student_relationship", 2.6, 1.4, -1.0, 0.05),
    ("future_career_concerns", 2.6, 1.5, 1.0, 0.05),
    ("social_support", 1.9, 1.1, -1.0, 0.06),
    ("peer_pressure", 2.7, 1.4, 1.0, 0.04),
    ("extracurricular_activities", 2.8, 1.4, 1.0, 0.04),
    ("bullying", 2.6, 1.5, 1.0, 0.12),
];

pub const HIGH_RISK: [&str; 6] = [
    "Consider speaking with a mental health professional",
    "Contact your institution's counseling services",
    "Reach out to trusted friends or family members",
    "Practice immediate stress relief techniques (deep breathing, progressive muscle relaxation)",
    "Prioritize sleep, nutrition, and basic self-care",
    "If experiencing crisis thoughts, contact emergency services immediately",
];

pub fn feature_names() -> Vec<String> {
    FEATURES.iter().map(|f| f.0.to_string()).collect()
}

pub fn artifacts() -> ModelArtifacts {
    let names = feature_names();
    let mean = FEATURES.iter().map(|f| f.1).collect();
    let scale = FEATURES.iter().map(|f| f.2).collect();
    let stressed: Vec<f64> = FEATURES.iter().map(|f| 0.5 * f.3).collect();
    let relaxed: Vec<f64> = stressed.iter().map(|w| -w).collect();
    let importance: Vec<f64> = FEATURES.iter().map(|f| f.4).collect();

    ModelArtifacts::new(
        FeatureSchema::new(names.clone()).expect("schema"),
        Normalizer::new(mean, scale).expect("normalizer"),
        SoftmaxClassifier::new(
            vec![relaxed, vec![0.0; FEATURES.len()], stressed],
            vec![0.0, 0.0, 0.0],
        )
        .expect("classifier"),
        ImportanceTable::from_scores(&names, &importance).expect("importance"),
    )
    .expect("artifacts")
}

pub fn engine() -> InferenceEngine {
    InferenceEngine::from_artifacts(artifacts(), 3).expect("engine")
}

pub fn high_stress_json() -> Value {
    json!({
        "anxiety_level": 18,
        "self_esteem": 5,
        "mental_health_history": 1,
        "depression": 22,
        "headache": 5,
        "blood_pressure": 3,
        "sleep_quality": 1,
        "breathing_problem": 4,
        "noise_level": 4,
        "living_conditions": 1,
        "safety": 1,
        "basic_needs": 1,
        "academic_performance": 1,
        "study_load": 5,
        "teacher_student_relationship": 1,
        "future_career_concerns": 5,
        "social_support": 1,
        "peer_pressure": 5,
        "extracurricular_activities": 4,
        "bullying": 5
    })
}

pub fn low_stress_json() -> Value {
    json!({
        "anxiety_level": 2,
        "self_esteem": 28,
        "mental_health_history": 0,
        "depression": 3,
        "headache": 1,
        "blood_pressure": 1,
        "sleep_quality": 5,
        "breathing_problem": 1,
        "noise_level": 1,
        "living_conditions": 5,
        "safety": 5,
        "basic_needs": 5,
        "academic_performance": 5,
        "study_load": 1,
        "teacher_student_relationship": 5,
        "future_career_concerns": 1,
        "social_support": 3,
        "peer_pressure": 1,
        "extracurricular_activities": 1,
        "bullying": 1
    })
}

pub fn input(value: Value) -> RawInput {
    RawInput::from_json(value).expect("fixture input is a non-empty object")
}

/// Input that sits exactly on the training means
pub fn mean_input() -> RawInput {
    FEATURES.iter().map(|f| (f.0, f.1)).collect()
}
