use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::{probability_value, ColumnMapping, PROBABILITY_COLUMN};
use crate::error::{EngineError, Result};
use crate::parameters::ParameterResolver;
use crate::store::ModelDescription;
use crate::table::Table;
use crate::Observation;

/// Evaluates `1 / (1 + e^-(intercept + Σ beta·x))` in process.
#[derive(Debug)]
pub struct LogisticRegressionExecutor {
    resolver: ParameterResolver,
}

impl LogisticRegressionExecutor {
    /// Creates an executor for `algorithm` of `description`.
    #[must_use]
    pub fn new(description: Arc<ModelDescription>, algorithm: impl Into<String>) -> Self {
        Self {
            resolver: ParameterResolver::new(description, algorithm),
        }
    }

    /// Returns the parameter resolver.
    #[must_use]
    pub fn resolver(&self) -> &ParameterResolver {
        &self.resolver
    }

    /// Computes the probability for one observation keyed by feature IRI.
    ///
    /// Parameters without a coefficient must still be present but do not
    /// contribute to the linear predictor.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingFeature`] for the first declared feature
    /// absent from `observation`, [`EngineError::NonNumericValue`] if a
    /// translated value is not a number, and [`EngineError::MissingFact`] if
    /// the model declares no intercept.
    pub fn execute(&self, observation: &Observation) -> Result<f64> {
        let parameters = self.resolver.parameter_set()?;
        let intercept = self.resolver.intercept()?;

        let mut linear_predictor = intercept;
        for (feature, parameter) in parameters {
            let raw = observation
                .get(feature)
                .ok_or_else(|| EngineError::MissingFeature(feature.clone()))?;
            let Some(beta) = parameter.beta else {
                continue;
            };
            let value = self.resolver.resolve_local_value(feature, raw)?;
            linear_predictor += beta * numeric(feature, &value)?;
        }
        Ok(sigmoid(linear_predictor))
    }

    /// Executes every row of `table`, whose columns carry local feature
    /// names. Rows that fail are logged and get a `null` probability.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ColumnNotFound`] before any row runs if a
    /// declared local column is missing.
    pub fn execute_batch(&self, table: &Table) -> Result<Table> {
        let parameters = self.resolver.parameter_set()?;
        let mapping = ColumnMapping::for_table(parameters, table)?;
        let mut renamed = table.renamed(&mapping.to_feature);

        let probabilities = (0..renamed.len())
            .map(|row| match self.execute(&renamed.row_observation(row)) {
                Ok(probability) => probability_value(probability),
                Err(error) => {
                    warn!(algorithm = self.resolver.algorithm(), row, %error, "row execution failed");
                    Value::Null
                }
            })
            .collect();
        renamed.set_column(PROBABILITY_COLUMN, probabilities)?;
        Ok(renamed.renamed(&mapping.to_local))
    }
}

/// The logistic function.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn numeric(feature: &str, value: &Value) -> Result<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| EngineError::NonNumericValue {
        feature: feature.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sigmoid_of_stiphout_predictor() {
        let lp = -0.60 + 3.0 * -0.074 + 1.0 * -0.060 + 15.0 * -0.085;
        assert!((lp - -2.157_f64).abs() < 1e-12);
        assert!((sigmoid(lp) - 0.103_679).abs() < 1e-6);
        assert_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn numbers_and_numeric_strings_are_accepted() {
        assert_eq!(numeric("f", &json!(3)).unwrap(), 3.0);
        assert_eq!(numeric("f", &json!(" 1.5 ")).unwrap(), 1.5);
    }

    #[test]
    fn other_values_are_rejected() {
        for value in [json!("C48728"), json!(null), json!(true), json!([1])] {
            let err = numeric("urn:f:cT", &value).unwrap_err();
            assert!(matches!(err, EngineError::NonNumericValue { ref feature, .. } if feature == "urn:f:cT"));
        }
    }
}
