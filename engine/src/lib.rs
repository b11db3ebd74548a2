//! FAIRmodels execution engine.
//!
//! Prediction models are described declaratively in the FAIRmodels ontology
//! (`fml:`): their input features, coefficients, categorical term mappings,
//! and how they must be executed. This crate loads such a description,
//! decides at runtime which executor the model needs, and runs it on single
//! observations or whole tables.
//!
//! # Entry Point
//!
//! ```no_run
//! use std::sync::Arc;
//! use fairmodels_engine::{Dispatcher, ModelDescription, Observation, QueryLibrary};
//!
//! let library = QueryLibrary::new(Some(".".into()));
//! let model = ModelDescription::load("models/stiphout_2011.ttl", None, library)
//!     .expect("model description should load");
//! let executor = Dispatcher::default()
//!     .select_executor(&Arc::new(model))
//!     .expect("dispatch should succeed")
//!     .expect("model should be executable");
//!
//! let mut observation = Observation::new();
//! observation.insert("https://example.org/stiphout#InputFeature_cT".into(), 3.into());
//! let probability = executor.execute(&observation).expect("execution should succeed");
//! ```
//!
//! # Structure
//!
//! | Module | Role |
//! |--------|------|
//! | [`query`] | Named SPARQL templates with `$name` substitution |
//! | [`store`] | Embedded graph store and [`ModelDescription`] |
//! | [`endpoint`] | Remote SPARQL endpoints over HTTP |
//! | [`parameters`] | Lazily cached parameters and term tables |
//! | [`executor`] | Dispatch plus the linear-predictor and remote-service executors |
//! | [`table`] | Column-ordered tabular data for batch execution |

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod endpoint;
pub mod error;
pub mod executor;
pub mod iris;
pub mod parameters;
pub mod query;
pub mod store;
pub mod table;
pub mod term;

pub use endpoint::{SparqlEndpoint, SparqlService};
pub use error::{EngineError, Result};
pub use executor::{
    ContainerRuntime, Dispatcher, DockerCli, Executor, ExecutorKind, InvocationOutcome,
    LogisticRegressionExecutor, PortBinding, ProvisionError, ProvisionedService,
    RemoteServiceConfig, RemoteServiceDescriptor, RemoteServiceExecutor, PROBABILITY_COLUMN,
};
pub use parameters::{Parameter, ParameterResolver, ParameterSet, TermTable};
pub use query::{Bindings, QueryLibrary};
pub use store::{LocalStore, ModelDescription, RdfFormat};
pub use table::Table;
pub use term::{QueryRow, RdfTerm, Solutions};

/// One input record: feature key (ontology feature IRI or model-local name)
/// to raw value.
pub type Observation = serde_json::Map<String, serde_json::Value>;
