//! Worker configuration.
//!
//! Read from TOML, or from JSON when the file name ends in `.json`:
//!
//! ```toml
//! library_location = "."
//! location = "worker-01"
//! http_timeout_secs = 30
//!
//! [validation_endpoint]
//! url = "http://localhost:7200/repositories/validation"
//!
//! [data_endpoint]
//! url = "http://localhost:7200/repositories/data"
//!
//! [model_cache_endpoint]
//! url = "http://localhost:7200/repositories/model_cache"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fairmodels_engine::{QueryLibrary, RemoteServiceConfig};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The TOML is malformed or does not match the schema.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// The JSON is malformed or does not match the schema.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Location of one SPARQL endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointConfig {
    /// Repository URL; updates go to `<url>/statements`.
    pub url: String,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Settings of one validation worker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Store holding validation requests and receiving results.
    pub validation_endpoint: EndpointConfig,
    /// Store the cohort queries run against.
    pub data_endpoint: EndpointConfig,
    /// Store holding model descriptions as named graphs; documents are
    /// fetched directly when absent.
    #[serde(default)]
    pub model_cache_endpoint: Option<EndpointConfig>,
    /// Directory containing `queries/`.
    #[serde(default)]
    pub library_location: Option<PathBuf>,
    /// Name recorded as the location of each validation run.
    #[serde(default)]
    pub location: Option<String>,
    /// Bound on every HTTP exchange with an endpoint.
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
    /// How containerized models are exposed on this host.
    #[serde(default)]
    pub remote_service: RemoteServiceConfig,
}

impl Config {
    /// Reads the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Parses a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parses a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the configured location, else `$HOSTNAME`, else `localhost`.
    #[must_use]
    pub fn location(&self) -> String {
        resolve_location(self.location.as_deref(), std::env::var("HOSTNAME").ok())
    }

    /// Returns the HTTP timeout.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Returns the query library.
    #[must_use]
    pub fn library(&self) -> QueryLibrary {
        QueryLibrary::new(self.library_location.clone())
    }
}

/// Blank values at either level fall through to the next one.
fn resolve_location(configured: Option<&str>, hostname: Option<String>) -> String {
    configured
        .map(str::to_string)
        .filter(|l| !l.trim().is_empty())
        .or_else(|| hostname.filter(|h| !h.trim().is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}
