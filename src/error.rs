//! Error types for the demcast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur during training, prediction, and simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Not enough countries or year windows to train on.
    #[error("insufficient training data: need at least {needed} countries, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Prediction or forecasting attempted before a successful training run.
    #[error("model must be trained before prediction")]
    NotTrained,

    /// A persisted bundle was recorded under a different feature ordering.
    #[error("feature ordering mismatch: expected [{expected}], bundle has [{got}]")]
    FeatureOrderingMismatch { expected: String, got: String },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Numerical failure during fitting or evaluation.
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Saving or loading a model bundle failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// An external capability (vector index, embedder, text generation)
    /// reported a failure. The adjuster catches this and degrades to the
    /// next tier instead of propagating it.
    #[error("capability error: {0}")]
    Capability(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::InsufficientData { needed: 2, got: 1 };
        assert_eq!(
            err.to_string(),
            "insufficient training data: need at least 2 countries, got 1"
        );

        let err = ForecastError::NotTrained;
        assert_eq!(err.to_string(), "model must be trained before prediction");

        let err = ForecastError::FeatureOrderingMismatch {
            expected: "birthRate, deathRate".to_string(),
            got: "deathRate, birthRate".to_string(),
        };
        assert!(err.to_string().contains("feature ordering mismatch"));

        let err = ForecastError::InvalidParameter("years must be positive".to_string());
        assert_eq!(err.to_string(), "invalid parameter: years must be positive");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::NotTrained;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
