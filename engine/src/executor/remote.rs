use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::provision::{ContainerRuntime, PortBinding, ProvisionedService};
use super::{ColumnMapping, PROBABILITY_COLUMN};
use crate::error::{EngineError, Result};
use crate::parameters::{translate, ParameterResolver};
use crate::store::ModelDescription;
use crate::table::Table;
use crate::Observation;

/// Where and how a model's containerized service is run and called.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteServiceDescriptor {
    /// Container image reference.
    pub image: String,
    /// Port the service listens on inside the container.
    pub container_port: String,
    /// Path of the single-observation endpoint.
    pub invocation_path: String,
    /// Path of the bulk endpoint.
    pub bulk_invocation_path: String,
    /// Declared HTTP method; only `POST` is supported.
    pub http_method: String,
    /// Declared response media type.
    pub accept_type: Option<String>,
}

impl RemoteServiceDescriptor {
    /// Reads the descriptor from the first `dockerParams` row.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingFact`] if the description declares no
    /// container image, port, paths, or method.
    pub fn resolve(resolver: &ParameterResolver) -> Result<Self> {
        let bindings = crate::query::Bindings::from([(
            "modelUri".to_string(),
            resolver.algorithm().to_string(),
        )]);
        let rows = resolver.description().query("dockerParams", &bindings)?;
        let row = rows.first().ok_or_else(|| {
            EngineError::MissingFact(format!("docker parameters of {}", resolver.algorithm()))
        })?;

        let required = |variable: &str| {
            row.str(variable).map(str::to_string).ok_or_else(|| {
                EngineError::MissingFact(format!("{variable} of {}", resolver.algorithm()))
            })
        };
        Ok(Self {
            image: required("imageUrl")?,
            container_port: required("containerPort")?,
            invocation_path: required("invocationUrl")?,
            bulk_invocation_path: required("invocationUrlBulk")?,
            http_method: required("httpMethod")?,
            accept_type: row.str("acceptType").map(str::to_string),
        })
    }

    fn supports_method(&self) -> bool {
        self.http_method.eq_ignore_ascii_case("POST")
    }
}

/// How provisioned services are exposed on this host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteServiceConfig {
    /// Base URL invocation paths are appended to.
    pub base_url: String,
    /// Host port the container port is published on.
    pub host_port: u16,
    /// Host address the container port is published on.
    pub bind_address: String,
    /// Bound on every HTTP call to the service, in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            host_port: 5000,
            bind_address: "127.0.0.1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RemoteServiceConfig {
    /// Returns the HTTP timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Result of one single-observation call, before it is collapsed to an
/// optional probability.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The service answered with a probability.
    Probability(f64),
    /// The service answered without a usable `probability` field.
    MissingProbability,
    /// The descriptor declares a method other than `POST`.
    UnsupportedMethod(String),
    /// The service container was never started.
    NotProvisioned,
    /// The request did not complete.
    Transport(String),
    /// The response was not JSON.
    Decode(String),
}

/// Delegates prediction to a containerized HTTP service.
#[derive(Debug)]
pub struct RemoteServiceExecutor {
    resolver: ParameterResolver,
    descriptor: RemoteServiceDescriptor,
    config: RemoteServiceConfig,
    client: Client,
    service: Option<ProvisionedService>,
}

impl RemoteServiceExecutor {
    /// Resolves the service descriptor and starts the service container.
    ///
    /// A container that fails to start is logged; the executor is still
    /// returned and reports [`InvocationOutcome::NotProvisioned`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingFact`] if the descriptor is incomplete
    /// and [`EngineError::Invocation`] if no HTTP client can be built.
    pub fn new(
        description: Arc<ModelDescription>,
        algorithm: impl Into<String>,
        runtime: Arc<dyn ContainerRuntime>,
        config: RemoteServiceConfig,
    ) -> Result<Self> {
        let resolver = ParameterResolver::new(description, algorithm);
        let descriptor = RemoteServiceDescriptor::resolve(&resolver)?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EngineError::Invocation(e.to_string()))?;

        let ports = PortBinding {
            container_port: descriptor.container_port.clone(),
            bind_address: config.bind_address.clone(),
            host_port: config.host_port,
        };
        let service = match ProvisionedService::provision(runtime, &descriptor.image, &ports) {
            Ok(service) => Some(service),
            Err(error) => {
                warn!(image = %descriptor.image, %error, "could not start service container");
                None
            }
        };

        Ok(Self {
            resolver,
            descriptor,
            config,
            client,
            service,
        })
    }

    /// Returns the parameter resolver.
    #[must_use]
    pub fn resolver(&self) -> &ParameterResolver {
        &self.resolver
    }

    /// Returns the service descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &RemoteServiceDescriptor {
        &self.descriptor
    }

    /// Returns true if the service container is running.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        self.service.is_some()
    }

    /// Calls the single-observation endpoint.
    ///
    /// The request body is `observation` with every declared feature's
    /// translated value added under its feature IRI; a feature is looked up
    /// by IRI first and by local name only if the IRI is absent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the parameters or term tables cannot be
    /// resolved; call failures are reported as outcomes.
    pub fn invoke(&self, observation: &Observation) -> Result<InvocationOutcome> {
        let parameters = self.resolver.parameter_set()?;
        let mut payload = observation.clone();
        for (feature, parameter) in parameters {
            let raw = observation
                .get(feature)
                .or_else(|| observation.get(&parameter.local_name));
            if let Some(raw) = raw {
                let value = self.resolver.resolve_local_value(feature, raw)?;
                payload.insert(feature.clone(), value);
            }
        }

        if !self.descriptor.supports_method() {
            return Ok(InvocationOutcome::UnsupportedMethod(
                self.descriptor.http_method.clone(),
            ));
        }
        if self.service.is_none() {
            return Ok(InvocationOutcome::NotProvisioned);
        }

        let url = self.config.url(&self.descriptor.invocation_path);
        debug!(url = %url, "invoking remote service");
        let response = match self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(error) => return Ok(InvocationOutcome::Transport(error.to_string())),
        };
        let body: Value = match response.json() {
            Ok(body) => body,
            Err(error) => return Ok(InvocationOutcome::Decode(error.to_string())),
        };
        Ok(body
            .get(PROBABILITY_COLUMN)
            .and_then(Value::as_f64)
            .map_or(InvocationOutcome::MissingProbability, InvocationOutcome::Probability))
    }

    /// Calls the single-observation endpoint and returns the probability,
    /// or `None` with a warning if the call did not yield one.
    ///
    /// # Errors
    ///
    /// Returns an error only if the parameters or term tables cannot be
    /// resolved.
    pub fn execute(&self, observation: &Observation) -> Result<Option<f64>> {
        match self.invoke(observation)? {
            InvocationOutcome::Probability(probability) => Ok(Some(probability)),
            InvocationOutcome::UnsupportedMethod(method) => {
                warn!(method = %method, "only HTTP POST is supported for remote services");
                Ok(None)
            }
            outcome => {
                warn!(algorithm = self.resolver.algorithm(), ?outcome, "could not execute model");
                Ok(None)
            }
        }
    }

    /// Sends the whole table to the bulk endpoint in one call.
    ///
    /// Columns are renamed to feature IRIs and translated before sending;
    /// the returned table is renamed back to local names.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ColumnNotFound`] if a declared column is
    /// missing and [`EngineError::Invocation`] if the call fails or the
    /// response is not a column-oriented table.
    pub fn execute_batch(&self, table: &Table) -> Result<Table> {
        let parameters = self.resolver.parameter_set()?;
        let mapping = ColumnMapping::for_table(parameters, table)?;
        let mut renamed = table.renamed(&mapping.to_feature);
        for feature in parameters.keys() {
            if let Some(terms) = self.resolver.term_translation(feature)? {
                renamed.map_column(feature, |value| translate(Some(terms), value));
            }
        }
        renamed.set_column(PROBABILITY_COLUMN, vec![Value::Null; renamed.len()])?;

        if !self.descriptor.supports_method() {
            return Err(EngineError::Invocation(format!(
                "unsupported HTTP method {}",
                self.descriptor.http_method
            )));
        }
        if self.service.is_none() {
            return Err(EngineError::Invocation(
                "service container is not running".to_string(),
            ));
        }

        // Bulk services expect the encoded table as a JSON string.
        let body = Value::String(renamed.to_column_json().to_string());
        let url = self.config.url(&self.descriptor.bulk_invocation_path);
        debug!(url = %url, rows = renamed.len(), "invoking remote service in bulk");
        let response: Value = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| EngineError::Invocation(e.to_string()))?;

        let encoded = match response {
            Value::String(text) => serde_json::from_str(&text)
                .map_err(|e| EngineError::Invocation(format!("bulk response: {e}")))?,
            other => other,
        };
        let result = Table::from_column_json(&encoded)
            .map_err(|e| EngineError::Invocation(format!("bulk response: {e}")))?;
        Ok(result.renamed(&mapping.to_local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_port() {
        let config = RemoteServiceConfig::default();
        assert_eq!(config.url("/"), "http://localhost:5000/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: RemoteServiceConfig =
            serde_json::from_str(r#"{ "base_url": "http://10.0.0.2:8080/" }"#).unwrap();
        assert_eq!(config.host_port, 5000);
        assert_eq!(config.url("/bulk"), "http://10.0.0.2:8080/bulk");
    }
}
