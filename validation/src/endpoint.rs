//! Access to the store holding validation requests.
//!
//! A request is an `fml:ValidationRequest` with an `fml:has_status` node, a
//! request time, the model it concerns and, optionally, the cohort query to
//! run against the data store. Cohort queries are stored base64-encoded
//! (standard alphabet, padded) so arbitrary SPARQL survives as a plain
//! string literal.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use fairmodels_engine::{Bindings, QueryLibrary, QueryRow, SparqlService};
use tracing::debug;

use crate::error::{Result, ValidationError};

/// One validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    /// Request IRI.
    pub id: String,
    /// Lexical form of `fml:at_time`.
    pub requested_at: Option<String>,
    /// The model to validate.
    pub model_uri: String,
    /// Decoded cohort query; only filled in by
    /// [`ValidationEndpoint::request_spec`].
    pub cohort_query: Option<String>,
}

impl ValidationRequest {
    fn from_row(row: &QueryRow) -> Result<Self> {
        let id = row
            .str("id")
            .ok_or_else(|| ValidationError::Endpoint("request row without ?id".into()))?;
        let model_uri = row
            .str("model")
            .ok_or_else(|| ValidationError::Endpoint(format!("request {id} names no model")))?;
        Ok(Self {
            id: id.to_string(),
            requested_at: row.str("dateTime").map(str::to_string),
            model_uri: model_uri.to_string(),
            cohort_query: None,
        })
    }
}

/// The validation-request store.
pub struct ValidationEndpoint {
    service: Box<dyn SparqlService>,
    library: QueryLibrary,
}

impl std::fmt::Debug for ValidationEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEndpoint")
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

impl ValidationEndpoint {
    /// Wraps the store behind `service`.
    pub fn new(service: Box<dyn SparqlService>, library: QueryLibrary) -> Self {
        Self { service, library }
    }

    /// Returns the underlying store, which also receives published results.
    #[must_use]
    pub fn service(&self) -> &dyn SparqlService {
        self.service.as_ref()
    }

    /// Lists requests whose status is `fml:Requested`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row lacks its request or
    /// model IRI.
    pub fn open_requests(&self) -> Result<Vec<ValidationRequest>> {
        let query = self
            .library
            .render("openValidationRequests", &Bindings::new())?;
        let solutions = self.service.select(&query)?;
        debug!(count = solutions.rows.len(), "open validation requests");
        solutions.rows.iter().map(ValidationRequest::from_row).collect()
    }

    /// Fetches one request together with its decoded cohort query.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Endpoint`] if the request does not exist
    /// and [`ValidationError::Decode`] if the stored query is not base64 of
    /// UTF-8 text.
    pub fn request_spec(&self, request_id: &str) -> Result<ValidationRequest> {
        let bindings = request_bindings(request_id)?;
        let query = self.library.render("validationRequest", &bindings)?;
        let solutions = self.service.select(&query)?;
        let row = solutions
            .rows
            .first()
            .ok_or_else(|| ValidationError::Endpoint(format!("no validation request {request_id}")))?;

        let mut request = ValidationRequest::from_row(row)?;
        request.cohort_query = row.str("query").map(b64_decode).transpose()?;
        Ok(request)
    }

    /// Replaces the cohort query stored for `request_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is rejected.
    pub fn store_query(&self, request_id: &str, query: &str) -> Result<()> {
        let mut bindings = request_bindings(request_id)?;
        bindings.insert("encodedQuery".into(), b64_encode(query));
        let update = self.library.render("storeQuery", &bindings)?;
        self.service.update(&update)?;
        debug!(request = request_id, "cohort query stored");
        Ok(())
    }
}

fn request_bindings(request_id: &str) -> Result<Bindings> {
    if !is_iri_ref(request_id) {
        return Err(ValidationError::Endpoint(format!(
            "not a request IRI: {request_id:?}"
        )));
    }
    Ok(Bindings::from([("requestId".to_string(), request_id.to_string())]))
}

/// True if `s` can be placed between `<` and `>` in a query.
pub(crate) fn is_iri_ref(s: &str) -> bool {
    s.contains(':')
        && !s
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\'))
}

/// Encodes a cohort query for storage.
#[must_use]
pub fn b64_encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decodes a stored cohort query.
///
/// # Errors
///
/// Returns [`ValidationError::Decode`] if `encoded` is not base64 of UTF-8.
pub fn b64_decode(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ValidationError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ValidationError::Decode(e.to_string()))
}
