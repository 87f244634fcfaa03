//! Library root for the `stresslens` crate
//!
//! Serves student stress risk predictions from a pretrained classifier and
//! trains that classifier offline from a labeled CSV.

// Core error handling
pub mod errors;
pub mod api_errors;

// Inference pipeline
pub mod schema;
pub mod normalizer;
pub mod classifier;
pub mod importance;
pub mod inference;

// Trained artifacts
pub mod artifacts;

// Offline training
pub mod dataset;
pub mod training;

// Configuration & CLI
pub mod config;
pub mod cli;

// Web server interface
pub mod web;

pub use artifacts::ModelArtifacts;
pub use errors::{InferenceError, StressError, StressResult};
pub use inference::{InferenceEngine, PredictionResult, StressLevel};
pub use schema::{FeatureSchema, RawInput};
