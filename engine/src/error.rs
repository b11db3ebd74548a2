//! Engine error taxonomy.

use thiserror::Error;

/// Errors raised while loading, resolving, or executing a model.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The model description could not be fetched or parsed.
    #[error("could not load model description {uri}: {reason}")]
    Load {
        /// Document or named-graph IRI of the model.
        uri: String,
        /// Underlying cause.
        reason: String,
    },
    /// A query template could not be read or instantiated.
    #[error("query template {name}: {reason}")]
    Template {
        /// Template name (file stem under `queries/`).
        name: String,
        /// Underlying cause.
        reason: String,
    },
    /// Query evaluation failed against a graph store.
    #[error("query failed: {0}")]
    Query(String),
    /// An observation lacks a declared input feature.
    #[error("missing input feature {0}")]
    MissingFeature(String),
    /// A batch table lacks the local column of a declared input feature.
    #[error("could not find column {0}")]
    ColumnNotFound(String),
    /// A resolved input value cannot take part in a weighted sum.
    #[error("value {value} of feature {feature} is not numeric")]
    NonNumericValue {
        /// Ontology feature IRI.
        feature: String,
        /// The offending value, rendered as JSON.
        value: String,
    },
    /// The model description lacks a fact the executor depends on.
    #[error("model description is missing {0}")]
    MissingFact(String),
    /// A remote prediction service call failed.
    #[error("remote invocation failed: {0}")]
    Invocation(String),
    /// A table could not be encoded or decoded.
    #[error("table encoding: {0}")]
    Table(String),
    /// A remote SPARQL endpoint returned an error or unreadable payload.
    #[error("SPARQL endpoint {url}: {reason}")]
    Endpoint {
        /// Endpoint URL.
        url: String,
        /// Underlying cause.
        reason: String,
    },
}

impl EngineError {
    pub(crate) fn load(uri: &str, reason: impl ToString) -> Self {
        EngineError::Load {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn endpoint(url: &str, reason: impl ToString) -> Self {
        EngineError::Endpoint {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
