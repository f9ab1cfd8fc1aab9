//! Training dataset loading
//!
//! Reads the historical track CSV, derives the binary popularity label,
//! drops identifier and leak columns and splits what remains into the fixed
//! categorical set and the numeric columns.

use crate::features::FeatureSource;
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Categorical columns, in encoding order
pub const CATEGORICAL_COLUMNS: [&str; 3] = ["genre", "label", "country"];

/// Column the label is derived from
pub const POPULARITY_COLUMN: &str = "popularity";

/// Identifier, release and leak columns removed before fitting
pub const DROPPED_COLUMNS: [&str; 6] = [
    "track_id",
    "track_name",
    "artist_name",
    "album_name",
    "release_date",
    POPULARITY_COLUMN,
];

/// Popularity at or above which a track counts as a hit
pub const DEFAULT_POPULARITY_THRESHOLD: f64 = 60.0;

/// Column layout of a dataset after dropping identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Numeric columns, in CSV header order
    pub numeric: Vec<String>,
    /// Categorical columns, in [`CATEGORICAL_COLUMNS`] order
    pub categorical: Vec<String>,
}

impl Schema {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    fn numeric_position(&self, column: &str) -> Option<usize> {
        self.numeric.iter().position(|c| c == column)
    }

    fn categorical_position(&self, column: &str) -> Option<usize> {
        self.categorical.iter().position(|c| c == column)
    }
}

/// Labelled feature table held in row-major order
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    numeric: Vec<f64>,
    categorical: Vec<String>,
    labels: Vec<u8>,
}

impl Dataset {
    /// Create an empty dataset with the given layout
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            numeric: Vec::new(),
            categorical: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Append one labelled row
    ///
    /// Values must follow the schema order; `label` must be 0 or 1.
    pub fn push_row(&mut self, numeric: Vec<f64>, categorical: Vec<String>, label: u8) -> Result<()> {
        if numeric.len() != self.schema.numeric.len() {
            return Err(Error::Dataset(format!(
                "expected {} numeric values, got {}",
                self.schema.numeric.len(),
                numeric.len()
            )));
        }
        if categorical.len() != self.schema.categorical.len() {
            return Err(Error::Dataset(format!(
                "expected {} categorical values, got {}",
                self.schema.categorical.len(),
                categorical.len()
            )));
        }
        if label > 1 {
            return Err(Error::Dataset(format!("label must be 0 or 1, got {}", label)));
        }

        self.numeric.extend(numeric);
        self.categorical.extend(categorical);
        self.labels.push(label);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Number of positive (hit) rows
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Borrow row `index` as a [`FeatureSource`]
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    pub fn row(&self, index: usize) -> DatasetRow<'_> {
        assert!(index < self.len(), "row index {} out of bounds", index);
        DatasetRow {
            dataset: self,
            index,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = DatasetRow<'_>> {
        (0..self.len()).map(move |index| DatasetRow {
            dataset: self,
            index,
        })
    }

    /// All values of numeric column `position`, top to bottom
    pub fn numeric_column(&self, position: usize) -> impl Iterator<Item = f64> + '_ {
        let width = self.schema.numeric.len();
        self.numeric
            .iter()
            .skip(position)
            .step_by(width.max(1))
            .copied()
    }

    /// All values of categorical column `position`, top to bottom
    pub fn categorical_column(&self, position: usize) -> impl Iterator<Item = &str> + '_ {
        let width = self.schema.categorical.len();
        self.categorical
            .iter()
            .skip(position)
            .step_by(width.max(1))
            .map(String::as_str)
    }

    /// Copy the given rows (in the given order) into a new dataset
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        let num_width = self.schema.numeric.len();
        let cat_width = self.schema.categorical.len();
        let mut out = Dataset::new(self.schema.clone());
        out.numeric.reserve(indices.len() * num_width);
        out.categorical.reserve(indices.len() * cat_width);
        out.labels.reserve(indices.len());

        for &i in indices {
            out.numeric
                .extend_from_slice(&self.numeric[i * num_width..(i + 1) * num_width]);
            out.categorical
                .extend_from_slice(&self.categorical[i * cat_width..(i + 1) * cat_width]);
            out.labels.push(self.labels[i]);
        }
        out
    }
}

/// Borrowed view of one dataset row
#[derive(Debug, Clone, Copy)]
pub struct DatasetRow<'a> {
    dataset: &'a Dataset,
    index: usize,
}

impl DatasetRow<'_> {
    pub fn label(&self) -> u8 {
        self.dataset.labels[self.index]
    }
}

impl FeatureSource for DatasetRow<'_> {
    fn numeric(&self, column: &str) -> Option<f64> {
        let width = self.dataset.schema.numeric.len();
        self.dataset
            .schema
            .numeric_position(column)
            .map(|pos| self.dataset.numeric[self.index * width + pos])
    }

    fn categorical(&self, column: &str) -> Option<&str> {
        let width = self.dataset.schema.categorical.len();
        self.dataset
            .schema
            .categorical_position(column)
            .map(|pos| self.dataset.categorical[self.index * width + pos].as_str())
    }
}

/// Load the training CSV at `path`
pub fn load_csv(path: &Path, popularity_threshold: f64) -> Result<Dataset> {
    let file = File::open(path).map_err(|e| {
        Error::Dataset(format!("cannot open dataset {}: {}", path.display(), e))
    })?;
    info!("Reading dataset from {}", path.display());
    read_csv(BufReader::new(file), popularity_threshold)
}

/// Parse a training CSV from any reader
///
/// Fails on the first malformed row; there is no partial load.
pub fn read_csv<R: Read>(reader: R, popularity_threshold: f64) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h == name);

    for column in DROPPED_COLUMNS {
        if find(column).is_none() {
            return Err(Error::Dataset(format!("missing required column '{}'", column)));
        }
    }
    let popularity_idx = find(POPULARITY_COLUMN)
        .ok_or_else(|| Error::Dataset(format!("missing column '{}'", POPULARITY_COLUMN)))?;

    let mut categorical_idx = Vec::with_capacity(CATEGORICAL_COLUMNS.len());
    for column in CATEGORICAL_COLUMNS {
        let idx = find(column)
            .ok_or_else(|| Error::Dataset(format!("missing categorical column '{}'", column)))?;
        categorical_idx.push(idx);
    }

    let numeric_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !DROPPED_COLUMNS.contains(name) && !CATEGORICAL_COLUMNS.contains(name))
        .map(|(idx, _)| idx)
        .collect();

    let schema = Schema::new(
        numeric_idx.iter().map(|&i| headers[i].to_string()).collect(),
        CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
    );
    debug!(
        numeric = ?schema.numeric,
        categorical = ?schema.categorical,
        "Dataset column split"
    );

    let mut dataset = Dataset::new(schema);
    for (row_number, result) in rdr.records().enumerate() {
        let record = result?;
        // header is line 1
        let line = row_number + 2;

        let popularity = parse_numeric(record.get(popularity_idx).unwrap_or(""))
            .ok_or_else(|| {
                Error::Dataset(format!(
                    "line {}: invalid {} value '{}'",
                    line,
                    POPULARITY_COLUMN,
                    record.get(popularity_idx).unwrap_or("")
                ))
            })?;
        let label = u8::from(popularity >= popularity_threshold);

        let mut numeric = Vec::with_capacity(numeric_idx.len());
        for &idx in &numeric_idx {
            let raw = record.get(idx).unwrap_or("");
            let value = parse_numeric(raw).ok_or_else(|| {
                Error::Dataset(format!(
                    "line {}: column '{}' has non-numeric value '{}'",
                    line, &headers[idx], raw
                ))
            })?;
            numeric.push(value);
        }

        let categorical = categorical_idx
            .iter()
            .map(|&idx| record.get(idx).unwrap_or("").to_string())
            .collect();

        dataset.push_row(numeric, categorical, label)?;
    }

    if dataset.is_empty() {
        return Err(Error::Dataset("dataset has no rows".to_string()));
    }

    info!(
        rows = dataset.len(),
        positives = dataset.positives(),
        "Loaded dataset ({} numeric, {} categorical columns)",
        dataset.schema().numeric.len(),
        dataset.schema().categorical.len()
    );
    Ok(dataset)
}

/// Parse a numeric cell; booleans map to 1/0
fn parse_numeric(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
