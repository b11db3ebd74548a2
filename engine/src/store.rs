//! Graph storage: the embedded [`LocalStore`] and the [`ModelDescription`]
//! built on top of it.

use std::fs;
use std::path::Path;

use oxigraph::io::RdfParser;
use oxigraph::model::Term;
use oxigraph::sparql::{Query, QueryResults};
use oxigraph::store::Store;
use reqwest::blocking::Client;
use tracing::debug;

use crate::endpoint::{SparqlEndpoint, SparqlService};
use crate::error::{EngineError, Result};
use crate::query::{Bindings, QueryLibrary};
use crate::term::{QueryRow, RdfTerm, Solutions};

pub use oxigraph::io::RdfFormat;

/// An in-memory RDF dataset with SPARQL query and update support.
///
/// SELECT queries see the union of all graphs as their default graph, so
/// facts loaded from quad formats or inserted into named graphs remain
/// visible to the plain triple patterns of the query library.
#[derive(Clone)]
pub struct LocalStore {
    store: Store,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("quads", &self.store.len().unwrap_or_default())
            .finish()
    }
}

impl LocalStore {
    /// Creates an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Query`] if the storage cannot be initialized.
    pub fn new() -> Result<Self> {
        let store = Store::new().map_err(|e| EngineError::Query(e.to_string()))?;
        Ok(Self { store })
    }

    /// Creates a store holding the given Turtle document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the document does not parse.
    pub fn from_turtle(document: &str) -> Result<Self> {
        let store = Self::new()?;
        store
            .load(document, RdfFormat::Turtle, None)
            .map_err(|reason| EngineError::load("<inline turtle>", reason))?;
        Ok(store)
    }

    /// Parses `document` in `format` into the store.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse failure.
    pub fn load(
        &self,
        document: &str,
        format: RdfFormat,
        base_iri: Option<&str>,
    ) -> std::result::Result<(), String> {
        let parser = match base_iri {
            Some(base) => RdfParser::from_format(format)
                .with_base_iri(base)
                .unwrap_or_else(|_| RdfParser::from_format(format)),
            None => RdfParser::from_format(format),
        };
        self.store
            .load_from_reader(parser, document.as_bytes())
            .map_err(|e| e.to_string())
    }

    /// Returns the number of stored quads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len().unwrap_or_default()
    }

    /// Returns true if the store holds no quads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SparqlService for LocalStore {
    fn select(&self, query: &str) -> Result<Solutions> {
        let mut parsed = Query::parse(query, None).map_err(|e| EngineError::Query(e.to_string()))?;
        parsed.dataset_mut().set_default_graph_as_union();

        let results = self
            .store
            .query(parsed)
            .map_err(|e| EngineError::Query(e.to_string()))?;
        let QueryResults::Solutions(solutions) = results else {
            return Err(EngineError::Query("not a SELECT query".to_string()));
        };

        let variables = solutions
            .variables()
            .iter()
            .map(|v| v.as_str().to_string())
            .collect();
        let mut rows = Vec::new();
        for solution in solutions {
            let solution = solution.map_err(|e| EngineError::Query(e.to_string()))?;
            let mut row = QueryRow::new();
            for (variable, term) in solution.iter() {
                row.insert(variable.as_str(), convert_term(term));
            }
            rows.push(row);
        }
        Ok(Solutions { variables, rows })
    }

    fn update(&self, update: &str) -> Result<()> {
        self.store
            .update(update)
            .map_err(|e| EngineError::Query(e.to_string()))
    }
}

fn convert_term(term: &Term) -> RdfTerm {
    match term {
        Term::NamedNode(node) => RdfTerm::Iri(node.as_str().to_string()),
        Term::BlankNode(node) => RdfTerm::BlankNode(node.as_str().to_string()),
        Term::Literal(literal) => RdfTerm::Literal {
            value: literal.value().to_string(),
            datatype: literal.datatype().as_str().to_string(),
            language: literal.language().map(str::to_string),
        },
        #[allow(unreachable_patterns)]
        other => RdfTerm::Iri(other.to_string()),
    }
}

/// The parsed ontology graph describing one prediction model.
///
/// Loaded once, never mutated afterwards. Every executor built for the model
/// shares it through an `Arc`.
#[derive(Debug)]
pub struct ModelDescription {
    uri: String,
    graph: LocalStore,
    library: QueryLibrary,
}

impl ModelDescription {
    /// Loads the description of the model at `uri`.
    ///
    /// Without an endpoint the document itself is fetched (HTTP(S), `file://`
    /// or a plain path) and parsed in the format its extension suggests.
    /// With an endpoint, the named graph `uri` is fetched from it through a
    /// CONSTRUCT query.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the document is unreachable or does
    /// not parse.
    pub fn load(
        uri: &str,
        sparql_endpoint: Option<&SparqlEndpoint>,
        library: QueryLibrary,
    ) -> Result<Self> {
        let (document, format, base) = match sparql_endpoint {
            Some(endpoint) => {
                let construct = format!(
                    "CONSTRUCT {{ ?s ?p ?o . }} WHERE {{ GRAPH <{uri}> {{ ?s ?p ?o . }} }}"
                );
                let document = endpoint
                    .construct(&construct)
                    .map_err(|e| EngineError::load(uri, e))?;
                (document, RdfFormat::RdfXml, Some(uri.to_string()))
            }
            None => {
                let document = fetch_document(uri, SparqlEndpoint::DEFAULT_TIMEOUT)
                    .map_err(|reason| EngineError::load(uri, reason))?;
                (document, guess_format(uri), base_iri_for(uri))
            }
        };

        let graph = LocalStore::new()?;
        graph
            .load(&document, format, base.as_deref())
            .map_err(|reason| EngineError::load(uri, reason))?;
        debug!(model = uri, quads = graph.len(), "model description loaded");

        Ok(Self {
            uri: uri.to_string(),
            graph,
            library,
        })
    }

    /// Builds a description from an in-memory document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the document does not parse.
    pub fn from_document(
        uri: &str,
        document: &str,
        format: RdfFormat,
        library: QueryLibrary,
    ) -> Result<Self> {
        let graph = LocalStore::new()?;
        graph
            .load(document, format, Some(uri))
            .map_err(|reason| EngineError::load(uri, reason))?;
        Ok(Self {
            uri: uri.to_string(),
            graph,
            library,
        })
    }

    /// Returns the model URI this description was loaded from.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the underlying graph.
    #[must_use]
    pub fn graph(&self) -> &LocalStore {
        &self.graph
    }

    /// Runs the named library query against the model graph.
    ///
    /// Rows come back in store order; callers must not rely on any other
    /// ordering.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Template`] if the template cannot be rendered
    /// and [`EngineError::Query`] if evaluation fails.
    pub fn query(&self, name: &str, bindings: &Bindings) -> Result<Vec<QueryRow>> {
        let text = self.library.render(name, bindings)?;
        Ok(self.graph.select(&text)?.rows)
    }

    /// Returns the local name of the model's declared outcome feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the `outputParameter` query fails.
    pub fn output_parameter_name(&self) -> Result<Option<String>> {
        let bindings = Bindings::from([("modelUri".to_string(), self.uri.clone())]);
        let rows = self.query("outputParameter", &bindings)?;
        Ok(rows
            .first()
            .and_then(|row| row.str("outputParameter"))
            .map(str::to_string))
    }
}

fn fetch_document(uri: &str, timeout: std::time::Duration) -> std::result::Result<String, String> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        client
            .get(uri)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| e.to_string())
    } else {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))
    }
}

fn base_iri_for(uri: &str) -> Option<String> {
    if uri.contains("://") {
        return Some(uri.to_string());
    }
    fs::canonicalize(Path::new(uri))
        .ok()
        .map(|path| format!("file://{}", path.display()))
}

/// Guesses the RDF serialization of a document from its file extension.
///
/// Unknown or missing extensions fall back to Turtle.
#[must_use]
pub fn guess_format(uri: &str) -> RdfFormat {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let file = path.rsplit('/').next().unwrap_or(path);
    let extension = match file.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return RdfFormat::Turtle,
    };
    match extension.as_str() {
        "nt" => RdfFormat::NTriples,
        "nq" => RdfFormat::NQuads,
        "trig" => RdfFormat::TriG,
        "n3" => RdfFormat::N3,
        "rdf" | "owl" | "xml" => RdfFormat::RdfXml,
        _ => RdfFormat::Turtle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"
@prefix ex: <https://example.org/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:a ex:weight "1.5"^^xsd:double ; ex:name "alpha" .
ex:b ex:weight "2"^^xsd:integer .
"#;

    #[test]
    fn guesses_format_from_extension() {
        assert_eq!(guess_format("https://x.org/models/stiphout_2011.ttl"), RdfFormat::Turtle);
        assert_eq!(guess_format("/data/model.NT"), RdfFormat::NTriples);
        assert_eq!(guess_format("https://x.org/m.owl#Model"), RdfFormat::RdfXml);
        assert_eq!(guess_format("https://x.org/m.rdf?download=1"), RdfFormat::RdfXml);
        assert_eq!(guess_format("https://x.org.example/models/plain"), RdfFormat::Turtle);
    }

    #[test]
    fn local_store_answers_select_queries() {
        let store = LocalStore::from_turtle(GRAPH).unwrap();
        assert_eq!(store.len(), 3);

        let solutions = store
            .select(
                "PREFIX ex: <https://example.org/> \
                 SELECT ?s ?w WHERE { ?s ex:weight ?w } ORDER BY ?s",
            )
            .unwrap();
        assert_eq!(solutions.variables, vec!["s", "w"]);
        assert_eq!(solutions.rows.len(), 2);
        assert_eq!(solutions.rows[0].str("s"), Some("https://example.org/a"));
        assert_eq!(solutions.rows[0].get("w").and_then(RdfTerm::as_f64), Some(1.5));
    }

    #[test]
    fn named_graph_inserts_are_visible_to_default_graph_queries() {
        let store = LocalStore::new().unwrap();
        store
            .update("INSERT DATA { GRAPH <urn:g> { <urn:s> <urn:p> \"v\" } }")
            .unwrap();
        let solutions = store.select("SELECT ?o WHERE { <urn:s> <urn:p> ?o }").unwrap();
        assert_eq!(solutions.rows.len(), 1);
        assert_eq!(solutions.rows[0].str("o"), Some("v"));
    }

    #[test]
    fn non_select_queries_are_rejected() {
        let store = LocalStore::from_turtle(GRAPH).unwrap();
        let err = store.select("ASK { ?s ?p ?o }").unwrap_err();
        assert!(matches!(err, EngineError::Query(_)));
    }

    #[test]
    fn unreadable_document_is_a_load_error() {
        let err = ModelDescription::load("/nonexistent/model.ttl", None, QueryLibrary::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
    }

    #[test]
    fn unparsable_document_is_a_load_error() {
        let err = ModelDescription::from_document(
            "https://example.org/broken.ttl",
            "this is not turtle",
            RdfFormat::Turtle,
            QueryLibrary::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
    }

    #[test]
    fn loads_document_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ttl");
        std::fs::write(&path, GRAPH).unwrap();

        let description = ModelDescription::load(
            path.to_str().unwrap(),
            None,
            QueryLibrary::default(),
        )
        .unwrap();
        assert_eq!(description.graph().len(), 3);
    }
}
