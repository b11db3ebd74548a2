use std::sync::Arc;

use tracing::{debug, info};

use super::provision::{ContainerRuntime, DockerCli};
use super::remote::RemoteServiceConfig;
use super::{Executor, LogisticRegressionExecutor, RemoteServiceExecutor};
use crate::error::Result;
use crate::iris::{DOCKER_EXECUTION, LINEAR_PREDICTOR, LOGISTIC_REGRESSION};
use crate::query::Bindings;
use crate::store::ModelDescription;

/// Execution strategy declared by a model's algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorKind {
    /// Logistic regression over a linear predictor.
    LinearPredictor,
    /// Containerized prediction service.
    RemoteService,
    /// No supported strategy.
    Unknown,
}

impl ExecutorKind {
    /// Applies the dispatch rules to one `(algorithm type, execution type)`
    /// pair. Containerized execution wins over any algorithm type.
    #[must_use]
    pub fn resolve(algorithm_type: Option<&str>, execution_type: Option<&str>) -> Self {
        match (algorithm_type, execution_type) {
            (_, Some(DOCKER_EXECUTION)) => ExecutorKind::RemoteService,
            (Some(LOGISTIC_REGRESSION), Some(LINEAR_PREDICTOR)) => ExecutorKind::LinearPredictor,
            _ => ExecutorKind::Unknown,
        }
    }
}

impl std::fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExecutorKind::LinearPredictor => "linear-predictor",
            ExecutorKind::RemoteService => "remote-service",
            ExecutorKind::Unknown => "unknown",
        })
    }
}

/// Chooses and constructs the executor a model description asks for.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    runtime: Arc<dyn ContainerRuntime>,
    remote: RemoteServiceConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(DockerCli::default()), RemoteServiceConfig::default())
    }
}

impl Dispatcher {
    /// Creates a dispatcher that provisions remote services through
    /// `runtime` and reaches them as `remote` describes.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, remote: RemoteServiceConfig) -> Self {
        Self { runtime, remote }
    }

    /// Returns the executor for the first `modelType` row that a rule
    /// matches, in store order, or `None` if the model cannot be executed.
    ///
    /// # Errors
    ///
    /// Returns an error if the `modelType` query fails or the chosen
    /// executor cannot be constructed.
    pub fn select_executor(&self, description: &Arc<ModelDescription>) -> Result<Option<Executor>> {
        let bindings = Bindings::from([("modelUri".to_string(), description.uri().to_string())]);
        for row in description.query("modelType", &bindings)? {
            let Some(algorithm) = row.str("algorithm") else {
                continue;
            };
            let kind = ExecutorKind::resolve(
                row.str("algorithmType"),
                row.str("algorithmExecutionType"),
            );
            debug!(model = description.uri(), algorithm, %kind, "evaluated model type");

            match kind {
                ExecutorKind::RemoteService => {
                    info!(model = description.uri(), algorithm, "dispatching to remote service");
                    let executor = RemoteServiceExecutor::new(
                        Arc::clone(description),
                        algorithm,
                        Arc::clone(&self.runtime),
                        self.remote.clone(),
                    )?;
                    return Ok(Some(Executor::RemoteService(executor)));
                }
                ExecutorKind::LinearPredictor => {
                    info!(model = description.uri(), algorithm, "dispatching to linear predictor");
                    let executor = LogisticRegressionExecutor::new(Arc::clone(description), algorithm);
                    return Ok(Some(Executor::LinearPredictor(executor)));
                }
                ExecutorKind::Unknown => {}
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iris::FML;

    #[test]
    fn docker_execution_wins_over_algorithm_type() {
        assert_eq!(
            ExecutorKind::resolve(Some(LOGISTIC_REGRESSION), Some(DOCKER_EXECUTION)),
            ExecutorKind::RemoteService
        );
        let unknown = format!("{FML}Random_Forest");
        assert_eq!(
            ExecutorKind::resolve(Some(&unknown), Some(DOCKER_EXECUTION)),
            ExecutorKind::RemoteService
        );
        assert_eq!(
            ExecutorKind::resolve(None, Some(DOCKER_EXECUTION)),
            ExecutorKind::RemoteService
        );
    }

    #[test]
    fn logistic_regression_needs_linear_predictor() {
        assert_eq!(
            ExecutorKind::resolve(Some(LOGISTIC_REGRESSION), Some(LINEAR_PREDICTOR)),
            ExecutorKind::LinearPredictor
        );
        assert_eq!(
            ExecutorKind::resolve(Some(LOGISTIC_REGRESSION), None),
            ExecutorKind::Unknown
        );
        assert_eq!(
            ExecutorKind::resolve(None, Some(LINEAR_PREDICTOR)),
            ExecutorKind::Unknown
        );
    }
}
