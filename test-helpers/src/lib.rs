//! Shared fixtures for the FAIRmodels integration tests.
//!
//! Each constant holds a Turtle 1.1 graph: model descriptions in the `fml:`
//! vocabulary, a validation-request store, and a small cohort. The
//! [`RecordingRuntime`] stands in for docker so remote-service executors can
//! be built without starting containers.

#![deny(missing_docs)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fairmodels_engine::{
    ContainerRuntime, ModelDescription, PortBinding, ProvisionError, QueryLibrary, RdfFormat,
};

/// IRI of the Stiphout 2011 radiotherapy dyspnea model.
pub const STIPHOUT_MODEL: &str = "https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl";
/// Algorithm IRI of the Stiphout model.
pub const STIPHOUT_ALGORITHM: &str =
    "https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl#LogisticRegression";
/// Feature IRI of clinical T stage.
pub const FEATURE_CT: &str =
    "https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl#InputFeature_cTStage";
/// Feature IRI of clinical N stage.
pub const FEATURE_CN: &str =
    "https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl#InputFeature_cNStage";
/// Feature IRI of tumour length.
pub const FEATURE_TLENGTH: &str =
    "https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl#InputFeature_TLength";
/// NCI thesaurus term for cT3; maps to local code 3.
pub const NCIT_T3: &str = "http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#C48728";
/// NCI thesaurus term for cN1; maps to local code 1.
pub const NCIT_N1: &str = "http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#C48706";

/// Logistic regression on a linear predictor: intercept -0.60, betas
/// cT -0.074, cN -0.060, tLength -0.085, NCIt stage terms mapped to codes.
pub const STIPHOUT_TTL: &str = r#"
@prefix rdf:  <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
@prefix xsd:  <http://www.w3.org/2001/XMLSchema#> .
@prefix fml:  <https://fairmodels.org/ontology.owl#> .
@prefix ncit: <http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#> .
@prefix :     <https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl#> .

<https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl>
    a                         fml:Model ;
    fml:contains_algorithm    :LogisticRegression ;
    fml:has_output_parameter  :OutputFeature_dyspnea .

:OutputFeature_dyspnea fml:has_feature_name "dyspnea" .

:LogisticRegression
    a                       fml:Logistic_Regression ;
    fml:has_execution_type  fml:linear_predictor ;
    fml:has_intercept       "-0.60"^^xsd:double ;
    fml:has_parameter       :Parameter_cT, :Parameter_cN, :Parameter_TLength .

:Parameter_cT      fml:has_input_feature :InputFeature_cTStage ; fml:has_beta "-0.074"^^xsd:double .
:Parameter_cN      fml:has_input_feature :InputFeature_cNStage ; fml:has_beta "-0.060"^^xsd:double .
:Parameter_TLength fml:has_input_feature :InputFeature_TLength ; fml:has_beta "-0.085"^^xsd:double .

:InputFeature_cTStage
    fml:has_feature_name "cT" ;
    fml:has_value_for_term
        [ fml:term ncit:C48724 ; fml:has_value "2"^^xsd:int ] ,
        [ fml:term ncit:C48728 ; fml:has_value "3"^^xsd:int ] ,
        [ fml:term ncit:C48732 ; fml:has_value "4"^^xsd:int ] .

:InputFeature_cNStage
    fml:has_feature_name "cN" ;
    fml:has_value_for_term
        [ fml:term ncit:C48705 ; fml:has_value "0"^^xsd:integer ] ,
        [ fml:term ncit:C48706 ; fml:has_value "1"^^xsd:integer ] ,
        [ fml:term ncit:C48786 ; fml:has_value "2"^^xsd:integer ] .

:InputFeature_TLength fml:has_feature_name "tLength" .
"#;

/// Same model with no parameters: every prediction is `sigmoid(-0.60)`.
pub const INTERCEPT_ONLY_TTL: &str = r#"
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix fml: <https://fairmodels.org/ontology.owl#> .

<https://fairmodels.org/models/intercept_only.ttl>
    a fml:Model ;
    fml:contains_algorithm <https://fairmodels.org/models/intercept_only.ttl#Algorithm> .

<https://fairmodels.org/models/intercept_only.ttl#Algorithm>
    a fml:Logistic_Regression ;
    fml:has_execution_type fml:linear_predictor ;
    fml:has_intercept "-0.60"^^xsd:double .
"#;

/// IRI of the intercept-only model.
pub const INTERCEPT_ONLY_MODEL: &str = "https://fairmodels.org/models/intercept_only.ttl";

/// IRI of the containerized Stiphout model.
pub const REMOTE_MODEL: &str =
    "https://fairmodels.org/models/radiotherapy/stiphout_docker_2011.ttl";
/// Container image of the remote model.
pub const REMOTE_IMAGE: &str = "jvsoest/stiphout_2011:latest";

/// A logistic regression that must run in a container. The algorithm type
/// is recognized, so dispatch has to prefer the execution type. The HTTP
/// method is the `{HTTP_METHOD}` placeholder; see [`remote_model_ttl`].
const REMOTE_TEMPLATE_TTL: &str = r#"
@prefix xsd:  <http://www.w3.org/2001/XMLSchema#> .
@prefix fml:  <https://fairmodels.org/ontology.owl#> .
@prefix ncit: <http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#> .
@prefix :     <https://fairmodels.org/models/radiotherapy/stiphout_docker_2011.ttl#> .

<https://fairmodels.org/models/radiotherapy/stiphout_docker_2011.ttl>
    a                         fml:Model ;
    fml:contains_algorithm    :DockerAlgorithm ;
    fml:has_output_parameter  :OutputFeature_dyspnea .

:OutputFeature_dyspnea fml:has_feature_name "dyspnea" .

:DockerAlgorithm
    a                             fml:Logistic_Regression ;
    fml:has_execution_type        fml:docker_execution ;
    fml:has_docker_image          "jvsoest/stiphout_2011:latest" ;
    fml:has_container_port        "5000" ;
    fml:has_invocation_path       "/" ;
    fml:has_bulk_invocation_path  "/bulk" ;
    fml:has_http_method           "{HTTP_METHOD}" ;
    fml:accepts_type              "application/json" ;
    fml:has_parameter             :Parameter_cT, :Parameter_cN, :Parameter_TLength .

:Parameter_cT      fml:has_input_feature :InputFeature_cTStage .
:Parameter_cN      fml:has_input_feature :InputFeature_cNStage .
:Parameter_TLength fml:has_input_feature :InputFeature_TLength .

:InputFeature_cTStage
    fml:has_feature_name "cT" ;
    fml:has_value_for_term [ fml:term ncit:C48728 ; fml:has_value "3"^^xsd:int ] .
:InputFeature_cNStage
    fml:has_feature_name "cN" ;
    fml:has_value_for_term [ fml:term ncit:C48706 ; fml:has_value "1"^^xsd:int ] .
:InputFeature_TLength fml:has_feature_name "tLength" .
"#;

/// The remote model declaring `http_method` as its invocation method.
#[must_use]
pub fn remote_model_ttl(http_method: &str) -> String {
    REMOTE_TEMPLATE_TTL.replace("{HTTP_METHOD}", http_method)
}

/// A model whose algorithm no executor supports.
pub const UNSUPPORTED_TTL: &str = r#"
@prefix fml: <https://fairmodels.org/ontology.owl#> .

<https://fairmodels.org/models/forest.ttl>
    a fml:Model ;
    fml:contains_algorithm <https://fairmodels.org/models/forest.ttl#Forest> .

<https://fairmodels.org/models/forest.ttl#Forest>
    a fml:Random_Forest ;
    fml:has_execution_type fml:linear_predictor .
"#;

/// IRI of the unsupported model.
pub const UNSUPPORTED_MODEL: &str = "https://fairmodels.org/models/forest.ttl";

/// A model that only declares its outcome feature `y`, as Turtle.
pub const OUTCOME_ONLY_TTL: &str = r#"
@prefix fml: <https://fairmodels.org/ontology.owl#> .

<https://example.org/models/outcome_only> a fml:Model ;
    fml:has_output_parameter <https://example.org/models/outcome_only#y> .
<https://example.org/models/outcome_only#y> fml:has_feature_name "y" .
"#;

/// The graph of [`OUTCOME_ONLY_TTL`] as a model cache returns it from a
/// CONSTRUCT query.
pub const OUTCOME_ONLY_RDF_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:fml="https://fairmodels.org/ontology.owl#">
  <fml:Model rdf:about="https://example.org/models/outcome_only">
    <fml:has_output_parameter rdf:resource="https://example.org/models/outcome_only#y"/>
  </fml:Model>
  <rdf:Description rdf:about="https://example.org/models/outcome_only#y">
    <fml:has_feature_name>y</fml:has_feature_name>
  </rdf:Description>
</rdf:RDF>
"#;

/// Named graph of the outcome-only model in a model cache.
pub const OUTCOME_ONLY_MODEL: &str = "https://example.org/models/outcome_only";

/// Cohort query stored (base64) on the first validation request.
pub const COHORT_QUERY: &str = "PREFIX ex: <https://example.org/cohort#>
SELECT ?identifier ?cT ?cN ?tLength ?dyspnea
WHERE {
    ?patient ex:identifier ?identifier ;
        ex:cT ?cT ;
        ex:cN ?cN ;
        ex:tLength ?tLength ;
        ex:dyspnea ?dyspnea .
}
ORDER BY ?identifier";

/// Request with a stored cohort query.
pub const REQUEST_WITH_QUERY: &str = "https://fairmodels.org/validation/request/1";
/// Request without a cohort query.
pub const REQUEST_WITHOUT_QUERY: &str = "https://fairmodels.org/validation/request/2";
/// Request whose cohort query does not parse.
pub const REQUEST_BROKEN_QUERY: &str = "https://fairmodels.org/validation/request/3";
/// Request that was already processed.
pub const REQUEST_COMPLETED: &str = "https://fairmodels.org/validation/request/4";

/// Validation requests in every state the orchestrator distinguishes.
pub const VALIDATION_STORE_TTL: &str = r#"
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix fml: <https://fairmodels.org/ontology.owl#> .
@prefix req: <https://fairmodels.org/validation/request/> .

req:1 a fml:ValidationRequest ;
    fml:has_status [ a fml:Requested ] ;
    fml:at_time "2024-03-01T10:00:00Z"^^xsd:dateTime ;
    fml:about_model <https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl> ;
    fml:has_query "UFJFRklYIGV4OiA8aHR0cHM6Ly9leGFtcGxlLm9yZy9jb2hvcnQjPgpTRUxFQ1QgP2lkZW50aWZpZXIgP2NUID9jTiA/dExlbmd0aCA/ZHlzcG5lYQpXSEVSRSB7CiAgICA/cGF0aWVudCBleDppZGVudGlmaWVyID9pZGVudGlmaWVyIDsKICAgICAgICBleDpjVCA/Y1QgOwogICAgICAgIGV4OmNOID9jTiA7CiAgICAgICAgZXg6dExlbmd0aCA/dExlbmd0aCA7CiAgICAgICAgZXg6ZHlzcG5lYSA/ZHlzcG5lYSAuCn0KT1JERVIgQlkgP2lkZW50aWZpZXI=" .

req:2 a fml:ValidationRequest ;
    fml:has_status [ a fml:Requested ] ;
    fml:at_time "2024-03-02T10:00:00Z"^^xsd:dateTime ;
    fml:about_model <https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl> .

req:3 a fml:ValidationRequest ;
    fml:has_status [ a fml:Requested ] ;
    fml:at_time "2024-03-03T10:00:00Z"^^xsd:dateTime ;
    fml:about_model <https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl> ;
    fml:has_query "U0VMRUNUIG5vbnNlbnNl" .

req:4 a fml:ValidationRequest ;
    fml:has_status [ a fml:Completed ] ;
    fml:at_time "2024-02-01T10:00:00Z"^^xsd:dateTime ;
    fml:about_model <https://fairmodels.org/models/radiotherapy/stiphout_2011.ttl> .
"#;

/// Eight patients with both outcomes present. Patient 3 carries its cT
/// stage as an NCIt term.
pub const COHORT_TTL: &str = r#"
@prefix ex:   <https://example.org/cohort#> .
@prefix ncit: <http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#> .

ex:p1 ex:identifier 1 ; ex:cT 3 ; ex:cN 1 ; ex:tLength 15 ; ex:dyspnea 1 .
ex:p2 ex:identifier 2 ; ex:cT 2 ; ex:cN 0 ; ex:tLength 4  ; ex:dyspnea 0 .
ex:p3 ex:identifier 3 ; ex:cT ncit:C48728 ; ex:cN 2 ; ex:tLength 7 ; ex:dyspnea 0 .
ex:p4 ex:identifier 4 ; ex:cT 4 ; ex:cN 1 ; ex:tLength 10 ; ex:dyspnea 1 .
ex:p5 ex:identifier 5 ; ex:cT 1 ; ex:cN 0 ; ex:tLength 2  ; ex:dyspnea 0 .
ex:p6 ex:identifier 6 ; ex:cT 3 ; ex:cN 2 ; ex:tLength 12 ; ex:dyspnea 1 .
ex:p7 ex:identifier 7 ; ex:cT 2 ; ex:cN 1 ; ex:tLength 4  ; ex:dyspnea 0 .
ex:p8 ex:identifier 8 ; ex:cT 4 ; ex:cN 2 ; ex:tLength 20 ; ex:dyspnea 1 .
"#;

/// Six patients recorded with decimal tumour lengths and boolean outcomes,
/// which is how most triple stores hand back measured and yes/no values.
pub const TYPED_COHORT_TTL: &str = r#"
@prefix ex: <https://example.org/cohort#> .

ex:p1 ex:identifier 1 ; ex:cT 3 ; ex:cN 1 ; ex:tLength 15.5 ; ex:dyspnea true .
ex:p2 ex:identifier 2 ; ex:cT 2 ; ex:cN 0 ; ex:tLength 4.5  ; ex:dyspnea false .
ex:p3 ex:identifier 3 ; ex:cT 1 ; ex:cN 2 ; ex:tLength 4.5  ; ex:dyspnea false .
ex:p4 ex:identifier 4 ; ex:cT 4 ; ex:cN 1 ; ex:tLength 10.5 ; ex:dyspnea true .
ex:p5 ex:identifier 5 ; ex:cT 1 ; ex:cN 0 ; ex:tLength 2.5  ; ex:dyspnea false .
ex:p6 ex:identifier 6 ; ex:cT 3 ; ex:cN 2 ; ex:tLength 13.5 ; ex:dyspnea true .
"#;

/// Query library rooted at the workspace, where `queries/` lives.
#[must_use]
pub fn workspace_library() -> QueryLibrary {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    QueryLibrary::new(Some(root))
}

/// Parses a Turtle fixture as the description of `uri`.
///
/// # Panics
///
/// Panics if the fixture does not parse.
#[must_use]
#[allow(clippy::expect_used)]
pub fn description(uri: &str, turtle: &str) -> Arc<ModelDescription> {
    Arc::new(
        ModelDescription::from_document(uri, turtle, RdfFormat::Turtle, workspace_library())
            .expect("fixture should parse"),
    )
}

/// One call made to a [`RecordingRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    /// `pull(image)`.
    Pull(String),
    /// `start(image, ports)`.
    Start(String, PortBinding),
    /// `stop(container)`.
    Stop(String),
    /// `remove(container)`.
    Remove(String),
}

/// A [`ContainerRuntime`] that records calls instead of running docker.
#[derive(Debug, Default)]
pub struct RecordingRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    fail_start: bool,
}

impl RecordingRuntime {
    /// A runtime whose every call succeeds.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A runtime that refuses to start containers.
    #[must_use]
    pub fn failing_start() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_start: true,
        })
    }

    /// Returns the calls made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Returns how many containers were stopped.
    #[must_use]
    pub fn stops(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RuntimeCall::Stop(_)))
            .count()
    }

    /// Returns how many containers were removed.
    #[must_use]
    pub fn removals(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RuntimeCall::Remove(_)))
            .count()
    }

    fn record(&self, call: RuntimeCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl ContainerRuntime for RecordingRuntime {
    fn pull(&self, image: &str) -> Result<(), ProvisionError> {
        self.record(RuntimeCall::Pull(image.to_string()));
        Ok(())
    }

    fn start(&self, image: &str, ports: &PortBinding) -> Result<String, ProvisionError> {
        self.record(RuntimeCall::Start(image.to_string(), ports.clone()));
        if self.fail_start {
            return Err(ProvisionError::Command {
                command: format!("run {image}"),
                stderr: "port is already allocated".to_string(),
            });
        }
        Ok("recorded-container".to_string())
    }

    fn stop(&self, container: &str) -> Result<(), ProvisionError> {
        self.record(RuntimeCall::Stop(container.to_string()));
        Ok(())
    }

    fn remove(&self, container: &str) -> Result<(), ProvisionError> {
        self.record(RuntimeCall::Remove(container.to_string()));
        Ok(())
    }
}
