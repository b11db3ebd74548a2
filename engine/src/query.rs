//! Named, parameterized SPARQL query templates.
//!
//! Templates are flat files `queries/<name>.sparql` under a configurable
//! library location. Placeholders use the `$name` / `${name}` form and are
//! substituted textually before the query reaches a store; `$$` produces a
//! literal `$`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};

/// Placeholder name to replacement text.
pub type Bindings = BTreeMap<String, String>;

/// Location of the query template library.
#[derive(Debug, Clone, Default)]
pub struct QueryLibrary {
    base: Option<PathBuf>,
}

impl QueryLibrary {
    /// Creates a library rooted at `base`; `None` resolves templates relative
    /// to the working directory.
    #[must_use]
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    /// Returns the file path of the named template.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        let file = format!("{name}.sparql");
        match &self.base {
            Some(base) => base.join("queries").join(file),
            None => Path::new("queries").join(file),
        }
    }

    /// Loads the named template and substitutes `bindings` into it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Template`] if the file cannot be read or a
    /// placeholder in it has no binding.
    pub fn render(&self, name: &str, bindings: &Bindings) -> Result<String> {
        let path = self.path_for(name);
        let template = fs::read_to_string(&path).map_err(|e| EngineError::Template {
            name: name.to_string(),
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        substitute(&template, bindings).map_err(|reason| EngineError::Template {
            name: name.to_string(),
            reason,
        })
    }
}

/// Replaces `$name` and `${name}` placeholders in `template`.
///
/// Bindings that no placeholder refers to are ignored.
///
/// # Errors
///
/// Returns a description of the first placeholder that is malformed or has
/// no binding.
pub fn substitute(template: &str, bindings: &Bindings) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let (name, tail) = if let Some(braced) = after.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or_else(|| format!("unterminated placeholder at offset {pos}"))?;
            (&braced[..end], &braced[end + 1..])
        } else {
            let end = after
                .find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
                .unwrap_or(after.len());
            (&after[..end], &after[end..])
        };

        if !is_identifier(name) {
            return Err(format!("invalid placeholder at offset {pos}"));
        }
        let value = bindings
            .get(name)
            .ok_or_else(|| format!("no binding for placeholder ${name}"))?;
        out.push_str(value);
        rest = tail;
    }

    out.push_str(rest);
    Ok(out)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
