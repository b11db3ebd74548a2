//! SPARQL services: the [`SparqlService`] seam and its HTTP implementation.
//!
//! The validation pipeline talks to two remote stores (validation requests
//! and cohort data) and optionally loads model descriptions from a third.
//! All of them speak the SPARQL 1.1 protocol; updates go to the RDF4J-style
//! `<endpoint>/statements` resource.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::iris::XSD_STRING;
use crate::term::{QueryRow, RdfTerm, Solutions};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const RDF_XML: &str = "application/rdf+xml";
const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// A store that answers SELECT queries and accepts SPARQL updates.
pub trait SparqlService {
    /// Evaluates a SELECT query and returns its solutions in store order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is rejected or the results cannot be read.
    fn select(&self, query: &str) -> Result<Solutions>;

    /// Applies a SPARQL update (`INSERT DATA`, `DELETE … WHERE`, …).
    ///
    /// # Errors
    ///
    /// Returns an error if the update is rejected.
    fn update(&self, update: &str) -> Result<()>;
}

/// A remote SPARQL endpoint reached over HTTP.
#[derive(Debug, Clone)]
pub struct SparqlEndpoint {
    url: String,
    client: Client,
}

impl SparqlEndpoint {
    /// Default bound on every HTTP exchange with an endpoint.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a client for the endpoint at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Endpoint`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::endpoint(&url, e))?;
        Ok(Self { url, client })
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Evaluates a CONSTRUCT query and returns the graph as RDF/XML.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Endpoint`] on transport failure or a non-success
    /// status.
    pub fn construct(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, RDF_XML)
            .form(&[("query", query)])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::endpoint(&self.url, e))?;
        response
            .text()
            .map_err(|e| EngineError::endpoint(&self.url, e))
    }
}

impl SparqlService for SparqlEndpoint {
    fn select(&self, query: &str) -> Result<Solutions> {
        let body = self
            .client
            .post(&self.url)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| EngineError::endpoint(&self.url, e))?;
        parse_results_json(&body).map_err(|e| EngineError::endpoint(&self.url, e))
    }

    fn update(&self, update: &str) -> Result<()> {
        let url = format!("{}/statements", self.url.trim_end_matches('/'));
        self.client
            .post(&url)
            .form(&[("update", update)])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::endpoint(&url, e))?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ResultsDocument {
    head: ResultsHead,
    #[serde(default)]
    results: Option<ResultsBody>,
}

#[derive(Deserialize)]
struct ResultsHead {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct ResultsBody {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    datatype: Option<String>,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
}

impl From<JsonTerm> for RdfTerm {
    fn from(term: JsonTerm) -> Self {
        match term.kind.as_str() {
            "uri" => RdfTerm::Iri(term.value),
            "bnode" => RdfTerm::BlankNode(term.value),
            _ => {
                let datatype = match (&term.datatype, &term.lang) {
                    (Some(dt), _) => dt.clone(),
                    (None, Some(_)) => RDF_LANG_STRING.to_string(),
                    (None, None) => XSD_STRING.to_string(),
                };
                RdfTerm::Literal {
                    value: term.value,
                    datatype,
                    language: term.lang,
                }
            }
        }
    }
}

/// Parses a `application/sparql-results+json` document.
///
/// Row bindings are reordered to follow the projection in `head.vars`.
///
/// # Errors
///
/// Returns the JSON error if the document is not a SELECT result.
pub fn parse_results_json(body: &str) -> std::result::Result<Solutions, serde_json::Error> {
    let document: ResultsDocument = serde_json::from_str(body)?;
    let variables = document.head.vars;
    let rows = document
        .results
        .map(|r| r.bindings)
        .unwrap_or_default()
        .into_iter()
        .map(|mut binding| {
            let mut row = QueryRow::new();
            for var in &variables {
                if let Some(term) = binding.remove(var) {
                    row.insert(var.clone(), term.into());
                }
            }
            row
        })
        .collect();
    Ok(Solutions { variables, rows })
}
