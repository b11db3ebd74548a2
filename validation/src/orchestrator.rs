//! The validation loop.
//!
//! For each open request: fetch the cohort, summarise it, score it with the
//! requested model, compare the scores with the observed outcome and
//! publish the run's provenance. Requests are processed one after another
//! and in isolation; a failing request is reported and the loop moves on.

use std::collections::HashMap;
use std::sync::Arc;

use fairmodels_engine::{
    Dispatcher, DockerCli, EngineError, ModelDescription, QueryLibrary, RdfFormat, SparqlEndpoint,
    SparqlService, Table, PROBABILITY_COLUMN,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::baseline::BaselineStats;
use crate::config::Config;
use crate::endpoint::ValidationEndpoint;
use crate::error::{Result, ValidationError};
use crate::metrics::PerformanceMetrics;
use crate::provenance::ProvenanceContext;
use crate::report::{RequestOutcome, ValidationRunReport};

/// Where model descriptions come from.
pub trait ModelSource {
    /// Loads the description of `model_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the description is unavailable.
    fn load(&self, model_uri: &str) -> std::result::Result<Arc<ModelDescription>, EngineError>;
}

/// Loads descriptions from a model-cache endpoint, or fetches the documents
/// directly when there is none.
#[derive(Debug, Clone)]
pub struct EndpointModelSource {
    endpoint: Option<SparqlEndpoint>,
    library: QueryLibrary,
}

impl EndpointModelSource {
    /// Creates a source backed by `endpoint`, if any.
    #[must_use]
    pub fn new(endpoint: Option<SparqlEndpoint>, library: QueryLibrary) -> Self {
        Self { endpoint, library }
    }
}

impl ModelSource for EndpointModelSource {
    fn load(&self, model_uri: &str) -> std::result::Result<Arc<ModelDescription>, EngineError> {
        ModelDescription::load(model_uri, self.endpoint.as_ref(), self.library.clone()).map(Arc::new)
    }
}

/// Serves descriptions from Turtle documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryModelSource {
    documents: HashMap<String, String>,
    library: QueryLibrary,
}

impl InMemoryModelSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new(library: QueryLibrary) -> Self {
        Self {
            documents: HashMap::new(),
            library,
        }
    }

    /// Registers the Turtle description of `model_uri`.
    #[must_use]
    pub fn with_model(mut self, model_uri: impl Into<String>, turtle: impl Into<String>) -> Self {
        self.documents.insert(model_uri.into(), turtle.into());
        self
    }
}

impl ModelSource for InMemoryModelSource {
    fn load(&self, model_uri: &str) -> std::result::Result<Arc<ModelDescription>, EngineError> {
        let document = self.documents.get(model_uri).ok_or_else(|| EngineError::Load {
            uri: model_uri.to_string(),
            reason: "unknown model".to_string(),
        })?;
        ModelDescription::from_document(model_uri, document, RdfFormat::Turtle, self.library.clone())
            .map(Arc::new)
    }
}

/// Processes open validation requests.
pub struct ValidationEngine {
    validation: ValidationEndpoint,
    data: Box<dyn SparqlService>,
    models: Box<dyn ModelSource>,
    dispatcher: Dispatcher,
    location: String,
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("validation", &self.validation)
            .field("dispatcher", &self.dispatcher)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl ValidationEngine {
    /// Assembles an engine from its collaborators.
    pub fn new(
        validation: ValidationEndpoint,
        data: Box<dyn SparqlService>,
        models: Box<dyn ModelSource>,
        dispatcher: Dispatcher,
        location: impl Into<String>,
    ) -> Self {
        Self {
            validation,
            data,
            models,
            dispatcher,
            location: location.into(),
        }
    }

    /// Builds an engine talking to the endpoints named in `config`, with
    /// containers provisioned through the docker CLI.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.http_timeout();
        let library = config.library();
        let validation = SparqlEndpoint::new(config.validation_endpoint.url.clone(), timeout)?;
        let data = SparqlEndpoint::new(config.data_endpoint.url.clone(), timeout)?;
        let cache = config
            .model_cache_endpoint
            .as_ref()
            .map(|e| SparqlEndpoint::new(e.url.clone(), timeout))
            .transpose()?;

        Ok(Self::new(
            ValidationEndpoint::new(Box::new(validation), library.clone()),
            Box::new(data),
            Box::new(EndpointModelSource::new(cache, library)),
            Dispatcher::new(Arc::new(DockerCli::default()), config.remote_service.clone()),
            config.location(),
        ))
    }

    /// Returns the request store.
    #[must_use]
    pub fn validation_endpoint(&self) -> &ValidationEndpoint {
        &self.validation
    }

    /// Processes every open request once.
    ///
    /// # Errors
    ///
    /// Returns an error only if the open requests cannot be listed; failures
    /// of individual requests are recorded in the report.
    pub fn run(&self) -> Result<ValidationRunReport> {
        let requests = self.validation.open_requests()?;
        info!(count = requests.len(), location = %self.location, "processing validation requests");

        let mut report = ValidationRunReport::new();
        for request in requests {
            let outcome = self.process_request(&request.id).unwrap_or_else(|e| {
                warn!(request = %request.id, error = %e, "validation request failed");
                RequestOutcome::failed(&request.id, e)
            });
            report.push(outcome);
        }
        info!(
            published = report.published_count(),
            failed = report.failure_count(),
            "validation run finished"
        );
        Ok(report)
    }

    /// Processes one request.
    ///
    /// # Errors
    ///
    /// Returns the first error that stops the request: an unreadable
    /// request, a failing cohort query, an unloadable or unsupported model,
    /// a missing outcome, degenerate metrics, or a rejected publication.
    pub fn process_request(&self, request_id: &str) -> Result<RequestOutcome> {
        let request = self.validation.request_spec(request_id)?;
        let mut provenance =
            ProvenanceContext::new(&request.id, &request.model_uri, &self.location);
        let Some(query) = request.cohort_query.as_deref() else {
            info!(request = request_id, "request has no cohort query");
            return Ok(RequestOutcome::skipped(request_id, "no cohort query"));
        };

        let cohort = Table::from_solutions(&self.data.select(query)?);
        debug!(request = request_id, rows = cohort.len(), "cohort fetched");
        let baseline = BaselineStats::describe(&cohort);

        let model = self.models.load(&request.model_uri)?;
        let executor = self
            .dispatcher
            .select_executor(&model)?
            .ok_or_else(|| ValidationError::NoExecutor(request.model_uri.clone()))?;
        let scored = executor.execute_batch(&cohort)?;

        let outcome = model
            .output_parameter_name()?
            .filter(|column| scored.has_column(column))
            .ok_or_else(|| ValidationError::MissingOutcome(request.model_uri.clone()))?;
        let (y_true, y_prob) = paired_scores(&scored, &outcome);
        debug!(
            request = request_id,
            outcome = %outcome,
            scored = y_true.len(),
            "scores paired with outcomes"
        );
        let metrics = PerformanceMetrics::compute(&y_true, &y_prob)?;

        provenance.add_baseline(&baseline);
        provenance.add_metrics(&metrics)?;
        let result = provenance.publish(self.validation.service())?;
        Ok(RequestOutcome::published(request_id, result))
    }
}

/// Observed outcomes and predicted probabilities of the rows that have both.
fn paired_scores(scored: &Table, outcome: &str) -> (Vec<f64>, Vec<f64>) {
    (0..scored.len())
        .filter_map(|row| {
            let y = scored.get(row, outcome).and_then(numeric)?;
            let p = scored.get(row, PROBABILITY_COLUMN).and_then(numeric)?;
            Some((y, p))
        })
        .unzip()
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_missing_either_value_are_dropped() {
        let table = Table::from_rows(
            vec!["dyspnea".into(), PROBABILITY_COLUMN.into()],
            vec![
                vec![json!(1), json!(0.8)],
                vec![Value::Null, json!(0.3)],
                vec![json!("0"), Value::Null],
                vec![json!("0"), json!(0.2)],
                vec![json!(true), json!(0.6)],
            ],
        )
        .unwrap();
        let (y, p) = paired_scores(&table, "dyspnea");
        assert_eq!(y, vec![1.0, 0.0, 1.0]);
        assert_eq!(p, vec![0.8, 0.2, 0.6]);
    }

    #[test]
    fn unknown_in_memory_model_is_a_load_error() {
        let source = InMemoryModelSource::new(QueryLibrary::default());
        let err = source.load("https://example.org/none.ttl").unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
    }
}
