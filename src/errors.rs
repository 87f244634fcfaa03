//! Error types for the stresslens service and trainer
//!
//! `StressError` covers everything outside a single inference call (config,
//! artifacts, datasets, I/O). `InferenceError` is the result type of the
//! pipeline itself and only has two outcomes a caller must distinguish: the
//! request was bad, or the service is broken.

use thiserror::Error;

/// Library-wide error type
#[derive(Error, Debug)]
pub enum StressError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Artifact {artifact} is invalid: {message}")]
    Artifact { artifact: String, message: String },

    #[error("Dataset error: {message}")]
    Dataset { message: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV parsing failed: {context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("Training failed: {message}")]
    Training { message: String },
}

/// Result alias used across the crate
pub type StressResult<T> = Result<T, StressError>;

impl StressError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an artifact validation error
    pub fn artifact(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Artifact {
            artifact: artifact.into(),
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset(message: impl Into<String>) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create a CSV error
    pub fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source,
        }
    }

    /// Create a training error
    pub fn training(message: impl Into<String>) -> Self {
        Self::Training {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for StressError {
    fn from(err: figment::Error) -> Self {
        StressError::config(err.to_string())
    }
}

/// Outcome of a failed inference.
///
/// Everything except `Internal` is the caller's fault and names the offending
/// field where there is one. `Internal` means the loaded artifacts disagree with
/// each other or the model misbehaved; retrying will fail the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("No data provided")]
    EmptyPayload,

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl InferenceError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for errors caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        !matches!(self, InferenceError::Internal { .. })
    }

    /// Field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            InferenceError::MissingField { field } | InferenceError::InvalidValue { field, .. } => {
                Some(field)
            }
            InferenceError::EmptyPayload | InferenceError::Internal { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = StressError::config("top_factors must be at least 1");
        assert!(config_err.to_string().contains("Configuration error"));

        let artifact_err = StressError::artifact("scaler.json", "scale[3] is zero");
        assert_eq!(
            artifact_err.to_string(),
            "Artifact scaler.json is invalid: scale[3] is zero"
        );
    }

    #[test]
    fn test_error_chaining() {
        use std::error::Error;

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err = StressError::io("reading scaler.json", io_err);

        assert!(err.source().is_some());
        assert!(err.to_string().contains("I/O operation failed"));
    }

    #[test]
    fn test_inference_error_classification() {
        let missing = InferenceError::missing_field("anxiety_level");
        assert!(missing.is_client_error());
        assert_eq!(missing.field(), Some("anxiety_level"));
        assert_eq!(missing.to_string(), "Missing required field: anxiety_level");

        assert!(InferenceError::EmptyPayload.is_client_error());
        assert_eq!(InferenceError::EmptyPayload.to_string(), "No data provided");

        let internal = InferenceError::internal("normalizer expected 20 features, got 19");
        assert!(!internal.is_client_error());
        assert_eq!(internal.field(), None);
    }
}
