//! Lazily resolved model parameters and categorical term tables.
//!
//! A [`ParameterResolver`] belongs to exactly one executor, which in turn
//! belongs to one [`ModelDescription`]. Its caches are filled on first access
//! and never invalidated.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::query::Bindings;
use crate::store::ModelDescription;
use crate::term::RdfTerm;

/// One declared input feature of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Column or key name the model itself uses for the feature.
    pub local_name: String,
    /// Regression coefficient; `None` for metadata-only parameters.
    pub beta: Option<f64>,
}

/// Declared parameters keyed by ontology feature IRI.
pub type ParameterSet = BTreeMap<String, Parameter>;

/// Ontology term (IRI or literal) to model-local coded value.
pub type TermTable = HashMap<String, Value>;

/// Resolves and caches the parameters of one algorithm.
#[derive(Debug)]
pub struct ParameterResolver {
    description: Arc<ModelDescription>,
    algorithm: String,
    parameters: OnceLock<ParameterSet>,
    terms: OnceLock<HashMap<String, TermTable>>,
}

impl ParameterResolver {
    /// Creates a resolver for `algorithm`, an algorithm IRI described in
    /// `description`.
    #[must_use]
    pub fn new(description: Arc<ModelDescription>, algorithm: impl Into<String>) -> Self {
        Self {
            description,
            algorithm: algorithm.into(),
            parameters: OnceLock::new(),
            terms: OnceLock::new(),
        }
    }

    /// Returns the algorithm IRI.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the model description.
    #[must_use]
    pub fn description(&self) -> &Arc<ModelDescription> {
        &self.description
    }

    fn bindings(&self) -> Bindings {
        Bindings::from([("modelUri".to_string(), self.algorithm.clone())])
    }

    /// Returns the declared parameters, querying the description on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the `linearParams` query fails.
    pub fn parameter_set(&self) -> Result<&ParameterSet> {
        if let Some(cached) = self.parameters.get() {
            return Ok(cached);
        }
        let mut parameters = ParameterSet::new();
        for row in self.description.query("linearParams", &self.bindings())? {
            let (Some(feature), Some(local_name)) =
                (row.str("inputFeature"), row.str("inputFeatureName"))
            else {
                continue;
            };
            parameters.insert(
                feature.to_string(),
                Parameter {
                    local_name: local_name.to_string(),
                    beta: row.get("beta").and_then(RdfTerm::as_f64),
                },
            );
        }
        debug!(
            algorithm = %self.algorithm,
            parameters = parameters.len(),
            "parameter set resolved"
        );
        Ok(self.parameters.get_or_init(|| parameters))
    }

    /// Returns the term table of `feature`, or `None` if the feature has no
    /// categorical mapping.
    ///
    /// Tables of every feature are built by a single query on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the `valueForTermList` query fails.
    pub fn term_translation(&self, feature: &str) -> Result<Option<&TermTable>> {
        let tables = match self.terms.get() {
            Some(cached) => cached,
            None => {
                let tables = self.load_term_tables()?;
                self.terms.get_or_init(|| tables)
            }
        };
        Ok(tables.get(feature))
    }

    fn load_term_tables(&self) -> Result<HashMap<String, TermTable>> {
        let mut tables: HashMap<String, TermTable> = HashMap::new();
        for row in self.description.query("valueForTermList", &self.bindings())? {
            let (Some(owner), Some(term), Some(value)) =
                (row.str("inputFeature"), row.str("term"), row.get("value"))
            else {
                continue;
            };
            tables
                .entry(owner.to_string())
                .or_default()
                .insert(term.to_string(), value.to_coded_value());
        }
        Ok(tables)
    }

    /// Translates a raw input value of `feature` to its model-local code.
    ///
    /// # Errors
    ///
    /// Returns an error if the term tables cannot be loaded.
    pub fn resolve_local_value(&self, feature: &str, raw: &Value) -> Result<Value> {
        Ok(translate(self.term_translation(feature)?, raw))
    }

    /// Returns the model intercept. Not cached.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingFact`] if the description declares no
    /// numeric intercept.
    pub fn intercept(&self) -> Result<f64> {
        self.description
            .query("intercept", &self.bindings())?
            .iter()
            .find_map(|row| row.get("intercept").and_then(RdfTerm::as_f64))
            .ok_or_else(|| EngineError::MissingFact(format!("intercept of {}", self.algorithm)))
    }
}

/// Substitutes `raw` through `table` when `raw` is a string key of it;
/// anything else passes through unchanged.
#[must_use]
pub fn translate(table: Option<&TermTable>, raw: &Value) -> Value {
    match (table, raw) {
        (Some(table), Value::String(key)) => table.get(key).cloned().unwrap_or_else(|| raw.clone()),
        _ => raw.clone(),
    }
}
