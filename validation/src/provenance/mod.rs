//! Provenance of one validation run.
//!
//! A [`ProvenanceContext`] collects the statements describing a single run:
//! which request it answers, the model it validated, when and where it ran,
//! the cohort's baseline characteristics and the performance metrics. The
//! statements are published once, as the named graph of the freshly minted
//! result IRI.
//!
//! ```text
//! <request> fml:has_result <result> .
//! <result>  a fml:ValidationResult ; fml:about_model <model> ;
//!           prov:generatedAtTime "…"^^xsd:dateTime ; prov:atLocation "…" ;
//!           fml:has_baseline <result/baseline> ;
//!           fml:has_validation_metrics <result/metrics> .
//! ```

pub mod ntriples;

use chrono::{DateTime, SecondsFormat, Utc};
use fairmodels_engine::iris::{RDFS_LABEL, RDF_TYPE, XSD_DATE_TIME};
use fairmodels_engine::SparqlService;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::baseline::BaselineStats;
use crate::error::{Result, ValidationError};
use crate::metrics::PerformanceMetrics;
pub use ntriples::{Object, Statement};

/// Namespace under which result IRIs are minted.
pub const RESULT_NAMESPACE: &str = "https://fairmodels.org/validation/";

const VALIDATION_RESULT: &str = "https://fairmodels.org/ontology.owl#ValidationResult";
const BASELINE_CHARACTERISTICS: &str = "https://fairmodels.org/ontology.owl#BaselineCharacteristics";
const VALIDATION_METRICS: &str = "https://fairmodels.org/ontology.owl#ValidationMetrics";
const HAS_RESULT: &str = "https://fairmodels.org/ontology.owl#has_result";
const ABOUT_MODEL: &str = "https://fairmodels.org/ontology.owl#about_model";
const HAS_BASELINE: &str = "https://fairmodels.org/ontology.owl#has_baseline";
const HAS_VALIDATION_METRICS: &str = "https://fairmodels.org/ontology.owl#has_validation_metrics";
const ROW_COUNT: &str = "https://fairmodels.org/ontology.owl#row_count";
const COLUMN_COUNT: &str = "https://fairmodels.org/ontology.owl#column_count";
const HAS_CHARACTERISTIC: &str = "https://fairmodels.org/ontology.owl#has_characteristic";
const COLUMN_NAME: &str = "https://fairmodels.org/ontology.owl#column_name";
const HAS_VALUE: &str = "https://fairmodels.org/ontology.owl#has_value";
const HAS_PART: &str = "https://fairmodels.org/ontology.owl#has_part";
const INDEX: &str = "https://fairmodels.org/ontology.owl#index";
const GENERATED_AT_TIME: &str = "http://www.w3.org/ns/prov#generatedAtTime";
const AT_LOCATION: &str = "http://www.w3.org/ns/prov#atLocation";

/// Statements describing one validation run.
///
/// [`publish`](Self::publish) consumes the context, so a context is sent at
/// most once.
#[derive(Debug)]
pub struct ProvenanceContext {
    result_id: String,
    generated_at: DateTime<Utc>,
    statements: Vec<Statement>,
    baseline_nodes: usize,
    metric_nodes: usize,
}

impl ProvenanceContext {
    /// Starts the record of a run for `request_id` on `model_uri`, executed
    /// at `location`, timestamped now.
    #[must_use]
    pub fn new(request_id: &str, model_uri: &str, location: &str) -> Self {
        Self::at(request_id, model_uri, location, Utc::now())
    }

    /// Like [`new`](Self::new) with an explicit timestamp.
    #[must_use]
    pub fn at(request_id: &str, model_uri: &str, location: &str, time: DateTime<Utc>) -> Self {
        let result_id = format!(
            "{RESULT_NAMESPACE}{}/{}",
            path_segment(location),
            Uuid::new_v4()
        );
        let mut context = Self {
            result_id,
            generated_at: time,
            statements: Vec::new(),
            baseline_nodes: 0,
            metric_nodes: 0,
        };

        let result = context.result_id.clone();
        context.link(request_id, HAS_RESULT, &result);
        context.link(&result, RDF_TYPE, VALIDATION_RESULT);
        context.link(&result, ABOUT_MODEL, model_uri);
        context.push(
            &result,
            GENERATED_AT_TIME,
            Object::Literal {
                value: time.to_rfc3339_opts(SecondsFormat::Millis, true),
                datatype: XSD_DATE_TIME,
            },
        );
        context.push(&result, AT_LOCATION, Object::string(location));
        context
    }

    /// Returns the minted result IRI, which also names the published graph.
    #[must_use]
    pub fn result_id(&self) -> &str {
        &self.result_id
    }

    /// Returns the run timestamp.
    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Returns the statements collected so far.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Records the cohort's baseline characteristics.
    ///
    /// Undefined and withheld statistics produce no statements.
    pub fn add_baseline(&mut self, stats: &BaselineStats) {
        let baseline = format!("{}/baseline", self.result_id);
        let result = self.result_id.clone();
        self.link(&result, HAS_BASELINE, &baseline);
        self.link(&baseline, RDF_TYPE, BASELINE_CHARACTERISTICS);
        self.push(&baseline, ROW_COUNT, Object::integer(stats.row_count));
        self.push(&baseline, COLUMN_COUNT, Object::integer(stats.column_count));

        for column in &stats.columns {
            for statistic in &column.statistics {
                let Some(value) = statistic.value.as_ref().and_then(Object::from_json) else {
                    continue;
                };
                self.baseline_nodes += 1;
                let node = format!("{baseline}/{}", self.baseline_nodes);
                self.link(&baseline, HAS_CHARACTERISTIC, &node);
                self.push(&node, COLUMN_NAME, Object::string(column.name.clone()));
                self.push(&node, RDFS_LABEL, Object::string(statistic.name));
                self.push(&node, HAS_VALUE, value);
            }
        }
    }

    /// Records the performance metrics as a tree of parts mirroring their
    /// structure.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Metric`] if the metrics cannot be
    /// converted to JSON.
    pub fn add_metrics(&mut self, metrics: &PerformanceMetrics) -> Result<()> {
        let tree = serde_json::to_value(metrics)
            .map_err(|e| ValidationError::metric("serialization", e.to_string()))?;
        let root = format!("{}/metrics", self.result_id);
        let result = self.result_id.clone();
        self.link(&result, HAS_VALIDATION_METRICS, &root);
        self.link(&root, RDF_TYPE, VALIDATION_METRICS);
        self.add_value(&root, &tree);
        Ok(())
    }

    fn add_value(&mut self, node: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if child.is_null() {
                        continue;
                    }
                    let part = self.metric_node();
                    self.link(node, HAS_PART, &part);
                    self.push(&part, RDFS_LABEL, Object::string(key.clone()));
                    self.add_value(&part, child);
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    if item.is_null() {
                        continue;
                    }
                    let part = self.metric_node();
                    self.link(node, HAS_PART, &part);
                    self.push(&part, INDEX, Object::integer(index));
                    self.add_value(&part, item);
                }
            }
            scalar => {
                if let Some(object) = Object::from_json(scalar) {
                    self.push(node, HAS_VALUE, object);
                }
            }
        }
    }

    fn metric_node(&mut self) -> String {
        self.metric_nodes += 1;
        format!("{}/metrics/{}", self.result_id, self.metric_nodes)
    }

    /// Serializes the collected statements as N-Triples.
    #[must_use]
    pub fn to_ntriples(&self) -> String {
        ntriples::to_ntriples(&self.statements)
    }

    /// Sends the statements to `store` as the named graph of the result IRI
    /// and returns that IRI.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the update.
    pub fn publish(self, store: &dyn SparqlService) -> Result<String> {
        let update = format!(
            "INSERT DATA {{ GRAPH <{}> {{\n{}}} }}",
            self.result_id,
            self.to_ntriples()
        );
        store.update(&update)?;
        info!(
            result = %self.result_id,
            statements = self.statements.len(),
            "validation result published"
        );
        Ok(self.result_id)
    }

    fn link(&mut self, subject: &str, predicate: &'static str, target: &str) {
        self.push(subject, predicate, Object::Iri(target.to_string()));
    }

    fn push(&mut self, subject: &str, predicate: &'static str, object: Object) {
        self.statements.push(Statement {
            subject: subject.to_string(),
            predicate,
            object,
        });
    }
}

/// Reduces a location name to characters that are safe in an IRI path.
fn path_segment(location: &str) -> String {
    let segment: String = location
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if segment.is_empty() {
        "localhost".to_string()
    } else {
        segment
    }
}
