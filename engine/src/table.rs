//! Column-ordered tabular data for batch execution.
//!
//! Cells are JSON values; `null` marks a missing value. The transport
//! encoding is the column-oriented object `{ column: { row: value } }`
//! that pandas' `DataFrame.to_json()` produces, which is what the remote
//! prediction services accept on their bulk endpoints.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::error::{EngineError, Result};
use crate::term::{RdfTerm, Solutions};
use crate::Observation;

/// A rectangular table of JSON cells with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates a table from rows.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Table`] if a row's width differs from the
    /// number of columns.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(EngineError::Table(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Creates a table from JSON records; columns appear in first-seen order
    /// and absent keys become `null`.
    #[must_use]
    pub fn from_records(records: &[Observation]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Creates a table from SELECT solutions, one column per projected
    /// variable. Numeric and boolean literals become JSON numbers and
    /// bools (see [`RdfTerm::to_cell_value`]); unbound variables become
    /// `null`.
    #[must_use]
    pub fn from_solutions(solutions: &Solutions) -> Self {
        let rows = solutions
            .rows
            .iter()
            .map(|row| {
                solutions
                    .variables
                    .iter()
                    .map(|v| row.get(v).map_or(Value::Null, RdfTerm::to_cell_value))
                    .collect()
            })
            .collect();
        Self {
            columns: solutions.variables.clone(),
            rows,
        }
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns true if the table has the named column.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns the cell at `row` in the named column.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }

    /// Returns every cell of the named column, top to bottom.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[index]).collect())
    }

    /// Replaces the named column, or appends it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Table`] if `values` does not have one entry
    /// per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(EngineError::Table(format!(
                "column {name} has {} values, table has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Rewrites every cell of the named column; a no-op if it is absent.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(&Value) -> Value) {
        if let Some(index) = self.column_index(name) {
            for row in &mut self.rows {
                row[index] = f(&row[index]);
            }
        }
    }

    /// Returns a copy with columns renamed through `mapping`; unmapped
    /// columns keep their name.
    #[must_use]
    pub fn renamed(&self, mapping: &HashMap<String, String>) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| mapping.get(c).cloned().unwrap_or_else(|| c.clone()))
                .collect(),
            rows: self.rows.clone(),
        }
    }

    /// Returns the row at `index` as a record.
    #[must_use]
    pub fn row_observation(&self, index: usize) -> Observation {
        let mut record = Observation::new();
        if let Some(row) = self.rows.get(index) {
            for (column, value) in self.columns.iter().zip(row) {
                record.insert(column.clone(), value.clone());
            }
        }
        record
    }

    /// Returns every row as a record.
    #[must_use]
    pub fn to_records(&self) -> Vec<Observation> {
        (0..self.rows.len()).map(|i| self.row_observation(i)).collect()
    }

    /// Encodes the table as `{ column: { "row index": value } }`.
    #[must_use]
    pub fn to_column_json(&self) -> Value {
        let mut out = Map::new();
        for (index, column) in self.columns.iter().enumerate() {
            let cells: Map<String, Value> = self
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| (i.to_string(), row[index].clone()))
                .collect();
            out.insert(column.clone(), Value::Object(cells));
        }
        Value::Object(out)
    }

    /// Decodes a column-oriented JSON table.
    ///
    /// Rows are ordered by their integer index keys, followed by any
    /// textual keys in lexical order; cells missing from a column become `null`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Table`] if `value` is not an object of objects.
    pub fn from_column_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| EngineError::Table("expected an object of columns".to_string()))?;

        let mut columns = Vec::with_capacity(object.len());
        let mut cells: Vec<&Map<String, Value>> = Vec::with_capacity(object.len());
        for (name, column) in object {
            let column = column
                .as_object()
                .ok_or_else(|| EngineError::Table(format!("column {name} is not an object")))?;
            columns.push(name.clone());
            cells.push(column);
        }

        let mut numeric: BTreeMap<i64, String> = BTreeMap::new();
        let mut textual: BTreeSet<String> = BTreeSet::new();
        for column in &cells {
            for key in column.keys() {
                match key.parse::<i64>() {
                    Ok(n) => {
                        numeric.insert(n, key.clone());
                    }
                    Err(_) => {
                        textual.insert(key.clone());
                    }
                }
            }
        }
        let index: Vec<String> = numeric.into_values().chain(textual).collect();

        let rows = index
            .iter()
            .map(|key| {
                cells
                    .iter()
                    .map(|column| column.get(key).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Ok(Self { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cohort() -> Table {
        Table::from_rows(
            vec!["identifier".into(), "cT".into(), "tLength".into()],
            vec![
                vec![json!(1), json!(3), json!(15)],
                vec![json!(2), json!(2), json!(4)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn column_json_matches_pandas_layout() {
        assert_eq!(
            cohort().to_column_json(),
            json!({
                "identifier": { "0": 1, "1": 2 },
                "cT": { "0": 3, "1": 2 },
                "tLength": { "0": 15, "1": 4 }
            })
        );
    }

    #[test]
    fn decodes_column_json_in_numeric_row_order() {
        let table = Table::from_column_json(&json!({
            "cT": { "10": 4, "2": 3, "1": 2 },
            "probability": { "1": 0.2, "2": 0.3 }
        }))
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column("cT").unwrap(), vec![&json!(2), &json!(3), &json!(4)]);
        assert_eq!(table.get(2, "probability"), Some(&Value::Null));
    }

    #[test]
    fn numeric_row_keys_precede_textual_ones() {
        let table = Table::from_column_json(&json!({
            "cT": { "b": 6, "10": 4, "a": 5, "2": 3 }
        }))
        .unwrap();
        assert_eq!(
            table.column("cT").unwrap(),
            vec![&json!(3), &json!(4), &json!(5), &json!(6)]
        );
    }

    #[test]
    fn solutions_become_typed_cells() {
        let mut row = crate::term::QueryRow::new();
        row.insert("len", RdfTerm::typed("1.5", "http://www.w3.org/2001/XMLSchema#decimal"));
        row.insert("dyspnea", RdfTerm::typed("true", crate::iris::XSD_BOOLEAN));
        let solutions = Solutions {
            variables: vec!["len".into(), "dyspnea".into(), "unbound".into()],
            rows: vec![row],
        };
        let table = Table::from_solutions(&solutions);
        assert_eq!(table.get(0, "len"), Some(&json!(1.5)));
        assert_eq!(table.get(0, "dyspnea"), Some(&json!(true)));
        assert_eq!(table.get(0, "unbound"), Some(&Value::Null));
    }

    #[test]
    fn rejects_non_tabular_json() {
        assert!(Table::from_column_json(&json!([1, 2])).is_err());
        assert!(Table::from_column_json(&json!({ "a": 1 })).is_err());
    }

    #[test]
    fn set_column_appends_then_overwrites() {
        let mut table = cohort();
        table.set_column("probability", vec![Value::Null, json!(0.5)]).unwrap();
        assert_eq!(table.columns().last().map(String::as_str), Some("probability"));

        table.set_column("probability", vec![json!(0.1), json!(0.2)]).unwrap();
        assert_eq!(table.columns().len(), 4);
        assert_eq!(table.get(0, "probability"), Some(&json!(0.1)));

        assert!(table.set_column("probability", vec![json!(1)]).is_err());
    }

    #[test]
    fn records_round_through_rows() {
        let table = cohort();
        let records = table.to_records();
        assert_eq!(records[1]["tLength"], json!(4));
        assert_eq!(Table::from_records(&records), table);
    }

    #[test]
    fn from_records_fills_missing_keys_with_null() {
        let mut a = Observation::new();
        a.insert("x".into(), json!(1));
        let mut b = Observation::new();
        b.insert("y".into(), json!("z"));
        let table = Table::from_records(&[a, b]);
        assert_eq!(table.columns(), ["x".to_string(), "y".to_string()]);
        assert_eq!(table.get(0, "y"), Some(&Value::Null));
        assert_eq!(table.get(1, "x"), Some(&Value::Null));
    }

    #[test]
    fn renamed_keeps_unmapped_columns() {
        let mapping = HashMap::from([("cT".to_string(), "urn:feature:cT".to_string())]);
        let renamed = cohort().renamed(&mapping);
        assert_eq!(renamed.columns(), ["identifier", "urn:feature:cT", "tLength"]);
    }

    #[test]
    fn from_rows_checks_width() {
        let rows = vec![vec![json!(1), json!(2)], vec![json!(1)]];
        assert!(Table::from_rows(vec!["a".into(), "b".into()], rows).is_err());
    }
}
