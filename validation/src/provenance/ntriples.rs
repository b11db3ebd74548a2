//! Statements and their N-Triples form.
//!
//! Subjects and predicates are always absolute IRIs; literals always carry
//! an explicit datatype. The output is one triple per line and is also valid
//! inside a SPARQL `INSERT DATA` block.

use fairmodels_engine::iris::{XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER, XSD_STRING};
use serde_json::Value;

/// Object position of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// An IRI.
    Iri(String),
    /// A typed literal.
    Literal {
        /// Lexical form.
        value: String,
        /// Datatype IRI.
        datatype: &'static str,
    },
}

impl Object {
    /// An `xsd:string` literal.
    pub fn string(value: impl Into<String>) -> Self {
        Object::Literal {
            value: value.into(),
            datatype: XSD_STRING,
        }
    }

    /// An `xsd:integer` literal.
    #[must_use]
    pub fn integer(value: usize) -> Self {
        Object::Literal {
            value: value.to_string(),
            datatype: XSD_INTEGER,
        }
    }

    /// Converts a JSON scalar to a literal; `None` for null, arrays and
    /// objects.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let (lexical, datatype) = match value {
            Value::Bool(b) => (b.to_string(), XSD_BOOLEAN),
            Value::Number(n) if n.is_i64() || n.is_u64() => (n.to_string(), XSD_INTEGER),
            Value::Number(n) => {
                let x = n.as_f64().filter(|x| x.is_finite())?;
                (x.to_string(), XSD_DOUBLE)
            }
            Value::String(s) => (s.clone(), XSD_STRING),
            Value::Null | Value::Array(_) | Value::Object(_) => return None,
        };
        Some(Object::Literal {
            value: lexical,
            datatype,
        })
    }
}

/// One RDF statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Subject IRI.
    pub subject: String,
    /// Predicate IRI.
    pub predicate: &'static str,
    /// Object.
    pub object: Object,
}

/// Serializes `statements` as N-Triples, in order.
#[must_use]
pub fn to_ntriples(statements: &[Statement]) -> String {
    let mut out = String::with_capacity(statements.len() * 128);
    for statement in statements {
        let object = match &statement.object {
            Object::Iri(target) => iri(target),
            Object::Literal { value, datatype } => lit(value, datatype),
        };
        triple(&mut out, &statement.subject, statement.predicate, &object);
    }
    out
}

fn triple(out: &mut String, subj: &str, pred: &str, obj: &str) {
    out.push('<');
    out.push_str(subj);
    out.push_str("> <");
    out.push_str(pred);
    out.push_str("> ");
    out.push_str(obj);
    out.push_str(" .\n");
}

fn iri(s: &str) -> String {
    format!("<{s}>")
}

fn lit(s: &str, datatype: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    format!("\"{escaped}\"^^<{datatype}>")
}
