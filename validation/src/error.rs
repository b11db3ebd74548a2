//! Validation pipeline errors.

use fairmodels_engine::EngineError;
use thiserror::Error;

/// Errors that end the processing of one validation request.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Loading, dispatching, or executing the model failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The validation store returned something unusable.
    #[error("validation endpoint: {0}")]
    Endpoint(String),
    /// A stored cohort query is not valid base64 UTF-8.
    #[error("could not decode stored query: {0}")]
    Decode(String),
    /// No executor supports the model.
    #[error("no executor supports model {0}")]
    NoExecutor(String),
    /// The model declares no outcome, or the cohort lacks it.
    #[error("no outcome for model {0}")]
    MissingOutcome(String),
    /// A performance metric could not be computed.
    #[error("{metric}: {reason}")]
    Metric {
        /// Metric name.
        metric: &'static str,
        /// Why the input was rejected.
        reason: String,
    },
}

impl ValidationError {
    pub(crate) fn metric(metric: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Metric {
            metric,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the validation crate.
pub type Result<T> = std::result::Result<T, ValidationError>;
