//! Baseline characteristics of a cohort.
//!
//! Numeric columns are summarised by count, mean, sample standard deviation,
//! min, quartiles and max; every other column by count, number of distinct
//! values, the most frequent value and its frequency. A column with as many
//! distinct values as the table has rows (an identifier) would only leak
//! per-patient values, so all of its statistics are withheld.

use fairmodels_engine::Table;
use serde::Serialize;
use serde_json::{Number, Value};

/// One named statistic; `None` when undefined or withheld.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistic {
    /// Statistic name (`count`, `mean`, `25%`, `top`, ...).
    pub name: &'static str,
    /// The value.
    pub value: Option<Value>,
}

/// Summary of one cohort column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Column name.
    pub name: String,
    /// True if every statistic was withheld.
    pub suppressed: bool,
    /// Statistics in presentation order.
    pub statistics: Vec<Statistic>,
}

impl ColumnSummary {
    /// Returns the value of the named statistic.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.statistics
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.value.as_ref())
    }
}

/// Baseline characteristics of a whole cohort table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineStats {
    /// Number of rows.
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// One summary per column, in table order.
    pub columns: Vec<ColumnSummary>,
}

impl BaselineStats {
    /// Summarises every column of `table`.
    #[must_use]
    pub fn describe(table: &Table) -> Self {
        let columns = table
            .columns()
            .iter()
            .map(|name| {
                let values: Vec<&Value> = table.column(name).unwrap_or_default();
                summarize(name, &values, table.len())
            })
            .collect();
        Self {
            row_count: table.len(),
            column_count: table.columns().len(),
            columns,
        }
    }

    /// Returns the summary of the named column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn summarize(name: &str, values: &[&Value], row_count: usize) -> ColumnSummary {
    let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();
    let counts = value_counts(&present);
    let numbers: Option<Vec<f64>> = if present.is_empty() {
        None
    } else {
        present.iter().map(|v| v.as_f64()).collect()
    };

    let mut statistics = match numbers {
        Some(numbers) => numeric_statistics(numbers),
        None => categorical_statistics(present.len(), &counts),
    };

    let suppressed = counts.len() == row_count;
    if suppressed {
        for statistic in &mut statistics {
            statistic.value = None;
        }
    }
    ColumnSummary {
        name: name.to_string(),
        suppressed,
        statistics,
    }
}

/// Distinct values with their frequency, in order of first appearance.
fn value_counts<'a>(values: &[&'a Value]) -> Vec<(&'a Value, usize)> {
    let mut counts: Vec<(&Value, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| same_value(seen, value)) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    counts
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn numeric_statistics(mut numbers: Vec<f64>) -> Vec<Statistic> {
    numbers.sort_by(f64::total_cmp);
    let n = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / n;
    let std = if numbers.len() > 1 {
        (numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        f64::NAN
    };

    vec![
        stat("count", Some(Value::from(numbers.len()))),
        stat("mean", float(mean)),
        stat("std", float(std)),
        stat("min", float(quantile(&numbers, 0.0))),
        stat("25%", float(quantile(&numbers, 0.25))),
        stat("50%", float(quantile(&numbers, 0.5))),
        stat("75%", float(quantile(&numbers, 0.75))),
        stat("max", float(quantile(&numbers, 1.0))),
    ]
}

fn categorical_statistics(count: usize, counts: &[(&Value, usize)]) -> Vec<Statistic> {
    let top = counts
        .iter()
        .fold(None::<(&Value, usize)>, |best, &(value, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((value, n)),
        });
    vec![
        stat("count", Some(Value::from(count))),
        stat("unique", Some(Value::from(counts.len()))),
        stat("top", top.map(|(v, _)| v.clone())),
        stat("freq", top.map(|(_, n)| Value::from(n))),
    ]
}

/// Linear interpolation between closest ranks of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let (a, b) = (sorted[lower], sorted[upper]);
    a + (b - a) * (position - lower as f64)
}

fn stat(name: &'static str, value: Option<Value>) -> Statistic {
    Statistic { name, value }
}

fn float(x: f64) -> Option<Value> {
    Number::from_f64(x).map(Value::Number)
}
