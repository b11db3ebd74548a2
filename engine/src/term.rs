//! Store-neutral RDF terms and query solutions.
//!
//! Both the embedded store and remote SPARQL endpoints hand back their
//! bindings in these types, so everything above the store layer is agnostic
//! of where a query ran.

use serde_json::Value;

use crate::iris::{XSD, XSD_BOOLEAN, XSD_DOUBLE, XSD_INT, XSD_INTEGER};

/// An RDF term bound to a query variable.
#[derive(Debug, Clone, PartialEq)]
pub enum RdfTerm {
    /// An IRI.
    Iri(String),
    /// A blank node label.
    BlankNode(String),
    /// A literal with its datatype IRI and optional language tag.
    Literal {
        /// Lexical form.
        value: String,
        /// Datatype IRI (`xsd:string` for plain literals).
        datatype: String,
        /// Language tag, if any.
        language: Option<String>,
    },
}

impl RdfTerm {
    /// Creates a literal with an explicit datatype.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        RdfTerm::Literal {
            value: value.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    /// Returns the lexical value: the IRI, the blank node label, or the
    /// literal's lexical form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            RdfTerm::Iri(iri) => iri.as_str(),
            RdfTerm::BlankNode(id) => id.as_str(),
            RdfTerm::Literal { value, .. } => value.as_str(),
        }
    }

    /// Returns the literal datatype, or `None` for IRIs and blank nodes.
    #[must_use]
    pub fn datatype(&self) -> Option<&str> {
        match self {
            RdfTerm::Literal { datatype, .. } => Some(datatype.as_str()),
            _ => None,
        }
    }

    /// Parses the lexical value as a float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().trim().parse().ok()
    }

    /// Converts the term to a model-local coded value.
    ///
    /// `xsd:int` and `xsd:integer` literals become integers, `xsd:double`
    /// literals become floats; everything else, including literals whose
    /// lexical form does not parse, stays a string.
    #[must_use]
    pub fn to_coded_value(&self) -> Value {
        let lexical = self.as_str();
        match self.datatype() {
            Some(XSD_INT) | Some(XSD_INTEGER) => lexical
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(lexical.to_string())),
            Some(XSD_DOUBLE) => lexical
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(lexical.to_string())),
            _ => Value::String(lexical.to_string()),
        }
    }

    /// Converts the term to a data cell.
    ///
    /// Wider than [`RdfTerm::to_coded_value`]: every xsd integer type
    /// becomes an integer, `xsd:decimal`, `xsd:float` and `xsd:double`
    /// become floats, and `xsd:boolean` becomes a bool. Numeric literals
    /// with no finite value (`NaN`, `INF`) are missing cells. Malformed
    /// literals and all other terms stay strings.
    #[must_use]
    pub fn to_cell_value(&self) -> Value {
        let lexical = self.as_str().trim();
        let fallback = || Value::String(self.as_str().to_string());
        let Some(local) = self.datatype().and_then(|d| d.strip_prefix(XSD)) else {
            return fallback();
        };
        if self.datatype() == Some(XSD_BOOLEAN) {
            return match lexical {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => fallback(),
            };
        }
        if XSD_INTEGER_TYPES.contains(&local) {
            return lexical
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| lexical.parse::<u64>().map(Value::from))
                .unwrap_or_else(|_| fallback());
        }
        if matches!(local, "decimal" | "float" | "double") {
            return match lexical.parse::<f64>() {
                Ok(x) => serde_json::Number::from_f64(x).map_or(Value::Null, Value::Number),
                Err(_) => fallback(),
            };
        }
        fallback()
    }
}

const XSD_INTEGER_TYPES: &[&str] = &[
    "integer",
    "int",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

impl std::fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One solution row: variable name to bound term, in projection order.
///
/// Unbound variables (e.g. from `OPTIONAL`) are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRow {
    bindings: Vec<(String, RdfTerm)>,
}

impl QueryRow {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `variable` to `term`, replacing an earlier binding.
    pub fn insert(&mut self, variable: impl Into<String>, term: RdfTerm) {
        let variable = variable.into();
        match self.bindings.iter_mut().find(|(v, _)| *v == variable) {
            Some(slot) => slot.1 = term,
            None => self.bindings.push((variable, term)),
        }
    }

    /// Returns the term bound to `variable`.
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&RdfTerm> {
        self.bindings
            .iter()
            .find(|(v, _)| v == variable)
            .map(|(_, t)| t)
    }

    /// Returns the lexical value bound to `variable`.
    #[must_use]
    pub fn str(&self, variable: &str) -> Option<&str> {
        self.get(variable).map(RdfTerm::as_str)
    }

    /// Iterates over the bound variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RdfTerm)> {
        self.bindings.iter().map(|(v, t)| (v.as_str(), t))
    }
}

/// A full SELECT result: projected variables plus rows in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solutions {
    /// Projected variable names.
    pub variables: Vec<String>,
    /// Solution rows.
    pub rows: Vec<QueryRow>,
}
