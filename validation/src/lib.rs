//! FAIRmodels validation pipeline.
//!
//! A validation request names a model and a cohort query. The pipeline runs
//! the query against a data store, records the cohort's baseline
//! characteristics, scores the cohort with the model through
//! [`fairmodels_engine`], measures discrimination and calibration against
//! the observed outcome, and publishes the whole run as provenance into the
//! validation store.
//!
//! # Entry Point
//!
//! ```no_run
//! use std::path::Path;
//! use fairmodels_validation::{Config, ValidationEngine};
//!
//! let config = Config::load(Path::new("fml.toml")).expect("configuration should load");
//! let engine = ValidationEngine::from_config(&config).expect("endpoints should be reachable");
//! let report = engine.run().expect("open requests should be listed");
//! println!("{report}");
//! ```
//!
//! # Structure
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Worker configuration (TOML or JSON) |
//! | [`endpoint`] | Validation requests and their stored cohort queries |
//! | [`baseline`] | Per-column cohort characteristics with identifier suppression |
//! | [`metrics`] | AUC, Brier score, ROC, precision/recall and calibration curves |
//! | [`provenance`] | Result statements and their publication as a named graph |
//! | [`orchestrator`] | The per-request validation loop |
//! | [`report`] | Outcome of each processed request |

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod baseline;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod provenance;
pub mod report;

pub use baseline::{BaselineStats, ColumnSummary, Statistic};
pub use config::{Config, ConfigError, EndpointConfig};
pub use endpoint::{ValidationEndpoint, ValidationRequest};
pub use error::{Result, ValidationError};
pub use metrics::{CalibrationCurve, PerformanceMetrics, PrecisionRecallCurve, RocCurve};
pub use orchestrator::{EndpointModelSource, InMemoryModelSource, ModelSource, ValidationEngine};
pub use provenance::ProvenanceContext;
pub use report::{RequestOutcome, RequestStatus, ValidationRunReport};
