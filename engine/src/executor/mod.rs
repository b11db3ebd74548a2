//! Model executors and the dispatcher that chooses between them.
//!
//! [`Executor`] is closed over the two supported strategies. New strategies
//! extend [`ExecutorKind`] and the rule table in [`ExecutorKind::resolve`].

mod dispatch;
mod logistic;
mod provision;
mod remote;

use std::collections::HashMap;

use serde_json::Value;

pub use dispatch::{Dispatcher, ExecutorKind};
pub use logistic::LogisticRegressionExecutor;
pub use provision::{ContainerRuntime, DockerCli, PortBinding, ProvisionError, ProvisionedService};
pub use remote::{
    InvocationOutcome, RemoteServiceConfig, RemoteServiceDescriptor, RemoteServiceExecutor,
};

use crate::error::{EngineError, Result};
use crate::parameters::{ParameterResolver, ParameterSet};
use crate::table::Table;
use crate::Observation;

/// Name of the column batch execution adds to its result.
pub const PROBABILITY_COLUMN: &str = "probability";

/// An executor for one algorithm of a model description.
#[derive(Debug)]
pub enum Executor {
    /// Closed-form logistic regression evaluated in process.
    LinearPredictor(LogisticRegressionExecutor),
    /// Prediction delegated to a containerized HTTP service.
    RemoteService(RemoteServiceExecutor),
}

impl Executor {
    /// Returns the strategy of this executor.
    #[must_use]
    pub fn kind(&self) -> ExecutorKind {
        match self {
            Executor::LinearPredictor(_) => ExecutorKind::LinearPredictor,
            Executor::RemoteService(_) => ExecutorKind::RemoteService,
        }
    }

    /// Returns the parameter resolver shared by both strategies.
    #[must_use]
    pub fn resolver(&self) -> &ParameterResolver {
        match self {
            Executor::LinearPredictor(executor) => executor.resolver(),
            Executor::RemoteService(executor) => executor.resolver(),
        }
    }

    /// Returns the declared parameters of the algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters cannot be resolved.
    pub fn parameters(&self) -> Result<&ParameterSet> {
        self.resolver().parameter_set()
    }

    /// Executes the model on one observation keyed by feature IRI.
    ///
    /// The remote strategy reports failed invocations as `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the observation is incomplete, a value is not
    /// numeric, or the model description lacks a required fact.
    pub fn execute(&self, observation: &Observation) -> Result<Option<f64>> {
        match self {
            Executor::LinearPredictor(executor) => executor.execute(observation).map(Some),
            Executor::RemoteService(executor) => executor.execute(observation),
        }
    }

    /// Executes the model on a table whose columns carry model-local feature
    /// names, returning it with a `probability` column.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ColumnNotFound`] if a declared column is
    /// missing, and [`EngineError::Invocation`] if a bulk remote call fails.
    pub fn execute_batch(&self, table: &Table) -> Result<Table> {
        match self {
            Executor::LinearPredictor(executor) => executor.execute_batch(table),
            Executor::RemoteService(executor) => executor.execute_batch(table),
        }
    }
}

/// Local column name to feature IRI, and back.
#[derive(Debug, Default)]
pub(crate) struct ColumnMapping {
    pub(crate) to_feature: HashMap<String, String>,
    pub(crate) to_local: HashMap<String, String>,
}

impl ColumnMapping {
    /// Builds the mapping, failing on the first declared local column the
    /// table lacks.
    pub(crate) fn for_table(parameters: &ParameterSet, table: &Table) -> Result<Self> {
        let mut mapping = Self::default();
        for (feature, parameter) in parameters {
            if !table.has_column(&parameter.local_name) {
                return Err(EngineError::ColumnNotFound(parameter.local_name.clone()));
            }
            mapping
                .to_feature
                .insert(parameter.local_name.clone(), feature.clone());
            mapping
                .to_local
                .insert(feature.clone(), parameter.local_name.clone());
        }
        Ok(mapping)
    }
}

pub(crate) fn probability_value(probability: f64) -> Value {
    serde_json::Number::from_f64(probability)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
