//! Feature values and the row abstraction shared by training and inference
//!
//! The column transformer reads features by column name through
//! [`FeatureSource`], so a CSV row and a single prediction request go
//! through exactly the same transformation code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single feature cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

/// Read access to one row of features, addressed by column name
pub trait FeatureSource {
    /// Numeric value of `column`, if present and numeric
    fn numeric(&self, column: &str) -> Option<f64>;

    /// Categorical value of `column`, if present and textual
    fn categorical(&self, column: &str) -> Option<&str>;
}

/// Owned, name-addressed row of features
///
/// Used for single-record inference where there is no dataset schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, FeatureValue>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a numeric feature
    pub fn insert_number(&mut self, column: impl Into<String>, value: f64) {
        self.values.insert(column.into(), FeatureValue::Number(value));
    }

    /// Insert (or replace) a categorical feature
    pub fn insert_text(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(column.into(), FeatureValue::Text(value.into()));
    }

    /// Builder-style variant of [`Record::insert_number`]
    pub fn with_number(mut self, column: impl Into<String>, value: f64) -> Self {
        self.insert_number(column, value);
        self
    }

    /// Builder-style variant of [`Record::insert_text`]
    pub fn with_text(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_text(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.values.get(column)
    }

    /// Column names present in this record, sorted
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FeatureSource for Record {
    fn numeric(&self, column: &str) -> Option<f64> {
        match self.values.get(column) {
            Some(FeatureValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    fn categorical(&self, column: &str) -> Option<&str> {
        match self.values.get(column) {
            Some(FeatureValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Dense row-major matrix of transformed features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Create an empty matrix with `n_cols` columns
    pub fn new(n_cols: usize) -> Self {
        Self {
            n_cols,
            data: Vec::new(),
        }
    }

    /// Create an empty matrix with room for `n_rows` rows
    pub fn with_capacity(n_cols: usize, n_rows: usize) -> Self {
        Self {
            n_cols,
            data: Vec::with_capacity(n_cols * n_rows),
        }
    }

    /// Append one row
    ///
    /// # Panics
    /// Panics if `row.len()` differs from the column count.
    pub fn push_row(&mut self, row: &[f64]) {
        assert_eq!(row.len(), self.n_cols, "row width mismatch");
        self.data.extend_from_slice(row);
    }

    pub fn n_rows(&self) -> usize {
        if self.n_cols == 0 {
            0
        } else {
            self.data.len() / self.n_cols
        }
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.data[index * self.n_cols..(index + 1) * self.n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_cols.max(1))
    }

    /// Copy of column `col`, top to bottom
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.rows().map(|row| row[col]).collect()
    }
}
