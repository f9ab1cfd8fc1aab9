//! Column-wise feature preprocessing
//!
//! Numeric columns are standardized (zero mean, unit variance); categorical
//! columns are one-hot encoded over the categories seen during fitting.
//! A category unseen at fit time encodes to an all-zero block.

use crate::dataset::Dataset;
use crate::features::{FeatureMatrix, FeatureSource};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Standardizes one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: f64,
    /// Population standard deviation; 1.0 for constant columns
    pub scale: f64,
}

impl StandardScaler {
    /// Fit mean and scale over `values`
    pub fn fit(values: impl IntoIterator<Item = f64>) -> Result<Self> {
        // Welford's running variance
        let mut count = 0usize;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        for value in values {
            count += 1;
            let delta = value - mean;
            mean += delta / count as f64;
            m2 += delta * (value - mean);
        }

        if count == 0 {
            return Err(Error::Training("cannot fit scaler on an empty column".to_string()));
        }

        let std = (m2 / count as f64).sqrt();
        let scale = if std > 10.0 * f64::EPSILON * mean.abs().max(1.0) {
            std
        } else {
            1.0
        };
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// One-hot encodes one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Known categories, sorted
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut categories: Vec<String> = values.into_iter().map(str::to_string).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    /// Check the invariant `index_of` relies on: strictly ascending categories
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.categories.windows(2).find(|w| w[0] >= w[1]) {
            Some(w) => Err(format!(
                "categories not strictly sorted ('{}' before '{}')",
                w[0], w[1]
            )),
            None => Ok(()),
        }
    }

    /// Width of the encoded block
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Index of `value` inside the block, `None` if unknown
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    /// Write the indicator block for `value` into `out`
    ///
    /// `out` must be exactly [`OneHotEncoder::width`] long.
    pub fn encode_into(&self, value: &str, out: &mut [f64]) {
        out.iter_mut().for_each(|v| *v = 0.0);
        if let Some(idx) = self.index_of(value) {
            out[idx] = 1.0;
        }
    }
}

/// A fitted numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub scaler: StandardScaler,
}

/// A fitted categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub encoder: OneHotEncoder,
}

/// Applies per-column transformers and concatenates their outputs
///
/// Output layout: all scaled numeric columns first (schema order), then one
/// one-hot block per categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl ColumnTransformer {
    /// Fit every column transformer on `dataset`
    pub fn fit(dataset: &Dataset) -> Result<Self> {
        let schema = dataset.schema();

        let numeric = schema
            .numeric
            .iter()
            .enumerate()
            .map(|(pos, name)| {
                Ok(NumericColumn {
                    name: name.clone(),
                    scaler: StandardScaler::fit(dataset.numeric_column(pos))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let categorical = schema
            .categorical
            .iter()
            .enumerate()
            .map(|(pos, name)| CategoricalColumn {
                name: name.clone(),
                encoder: OneHotEncoder::fit(dataset.categorical_column(pos)),
            })
            .collect();

        let transformer = Self {
            numeric,
            categorical,
        };
        if transformer.n_features() == 0 {
            return Err(Error::Training("no features to train on".to_string()));
        }
        Ok(transformer)
    }

    /// Structural check for deserialized transformers
    pub fn validate(&self) -> Result<()> {
        for column in &self.numeric {
            let scaler = &column.scaler;
            if !scaler.mean.is_finite() || !scaler.scale.is_finite() || scaler.scale <= 0.0 {
                return Err(Error::Artifact(format!(
                    "column '{}': invalid scaler (mean {}, scale {})",
                    column.name, scaler.mean, scaler.scale
                )));
            }
        }
        for column in &self.categorical {
            column
                .encoder
                .validate()
                .map_err(|e| Error::Artifact(format!("column '{}': {}", column.name, e)))?;
        }
        Ok(())
    }

    /// Number of output features
    pub fn n_features(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.encoder.width())
                .sum::<usize>()
    }

    /// Human-readable name of each output feature
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| c.name.clone()).collect();
        for column in &self.categorical {
            names.extend(
                column
                    .encoder
                    .categories
                    .iter()
                    .map(|category| format!("{}={}", column.name, category)),
            );
        }
        names
    }

    /// Names of every input column the transformer reads
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.numeric
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.categorical.iter().map(|c| c.name.as_str()))
    }

    /// Transform one row into a feature vector
    pub fn transform<S: FeatureSource + ?Sized>(&self, row: &S) -> Result<Vec<f64>> {
        let mut out = vec![0.0; self.n_features()];
        self.transform_into(row, &mut out)?;
        Ok(out)
    }

    /// Transform one row into a caller-provided buffer of `n_features()`
    pub fn transform_into<S: FeatureSource + ?Sized>(&self, row: &S, out: &mut [f64]) -> Result<()> {
        debug_assert_eq!(out.len(), self.n_features());

        for (slot, column) in out.iter_mut().zip(&self.numeric) {
            let value = row.numeric(&column.name).ok_or_else(|| {
                Error::InvalidInput(format!("missing numeric feature '{}'", column.name))
            })?;
            *slot = column.scaler.transform(value);
        }

        let mut offset = self.numeric.len();
        for column in &self.categorical {
            let value = row.categorical(&column.name).ok_or_else(|| {
                Error::InvalidInput(format!("missing categorical feature '{}'", column.name))
            })?;
            let width = column.encoder.width();
            column
                .encoder
                .encode_into(value, &mut out[offset..offset + width]);
            offset += width;
        }
        Ok(())
    }

    /// Transform every row of `dataset`
    pub fn transform_dataset(&self, dataset: &Dataset) -> Result<FeatureMatrix> {
        let mut matrix = FeatureMatrix::with_capacity(self.n_features(), dataset.len());
        let mut buffer = vec![0.0; self.n_features()];
        for row in dataset.rows() {
            self.transform_into(&row, &mut buffer)?;
            matrix.push_row(&buffer);
        }
        Ok(matrix)
    }
}
