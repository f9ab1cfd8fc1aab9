//! Fitted preprocessing + classifier pipeline and its on-disk artifact
//!
//! The artifact is a single JSON document. It is written once by the
//! training job and only ever read afterwards.

use crate::dataset::Dataset;
use crate::features::FeatureSource;
use crate::gbdt::{BoostingParams, GradientBoostedClassifier, ImportanceKind, DECISION_THRESHOLD};
use crate::preprocess::ColumnTransformer;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Version of the artifact layout; bumped on incompatible changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Provenance recorded alongside the fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub trained_at: DateTime<Utc>,
    /// hitpred-common version that produced the artifact
    pub trainer_version: String,
    pub popularity_threshold: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out ROC-AUC, once evaluated
    pub roc_auc: Option<f64>,
}

/// Preprocessing and classification applied as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitPipeline {
    pub format_version: u32,
    pub preprocessor: ColumnTransformer,
    pub classifier: GradientBoostedClassifier,
    pub metadata: TrainingMetadata,
}

impl HitPipeline {
    /// Fit the preprocessor, then the classifier on its output
    pub fn fit(train: &Dataset, params: &BoostingParams, popularity_threshold: f64) -> Result<Self> {
        let preprocessor = ColumnTransformer::fit(train)?;
        let features = preprocessor.transform_dataset(train)?;
        info!(
            rows = features.n_rows(),
            features = features.n_cols(),
            "Fitting gradient-boosted classifier ({} trees, learning rate {})",
            params.n_estimators,
            params.learning_rate
        );

        let classifier = GradientBoostedClassifier::fit(&features, train.labels(), params)?;
        debug!(trees = classifier.trees.len(), "Classifier fitted");

        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            preprocessor,
            classifier,
            metadata: TrainingMetadata {
                trained_at: Utc::now(),
                trainer_version: env!("CARGO_PKG_VERSION").to_string(),
                popularity_threshold,
                train_rows: train.len(),
                test_rows: 0,
                roc_auc: None,
            },
        })
    }

    /// Probability that `row` is a hit
    pub fn predict_proba<S: FeatureSource + ?Sized>(&self, row: &S) -> Result<f64> {
        let features = self.preprocessor.transform(row)?;
        Ok(self.classifier.predict_proba(&features))
    }

    /// Hit label (0/1) of `row`
    pub fn predict<S: FeatureSource + ?Sized>(&self, row: &S) -> Result<u8> {
        self.classify(row).map(|(label, _)| label)
    }

    /// Label and probability from a single pass
    pub fn classify<S: FeatureSource + ?Sized>(&self, row: &S) -> Result<(u8, f64)> {
        let probability = self.predict_proba(row)?;
        Ok((u8::from(probability >= DECISION_THRESHOLD), probability))
    }

    /// Hit probability of every row in `dataset`
    pub fn predict_proba_dataset(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        let features = self.preprocessor.transform_dataset(dataset)?;
        Ok(features
            .rows()
            .map(|row| self.classifier.predict_proba(row))
            .collect())
    }

    /// Names of the transformed features, in model order
    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    /// Input columns a request must provide
    pub fn required_columns(&self) -> Vec<&str> {
        self.preprocessor.input_columns().collect()
    }

    /// The `k` features with the largest total split gain
    pub fn top_features(&self, k: usize) -> Vec<(String, f64)> {
        let gain = self.classifier.feature_importance(ImportanceKind::Gain);
        let mut ranked: Vec<(String, f64)> = self.feature_names().into_iter().zip(gain).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked
    }

    /// Consistency checks run on every load
    pub fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(Error::Artifact(format!(
                "unsupported format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if self.preprocessor.n_features() != self.classifier.n_features {
            return Err(Error::Artifact(format!(
                "preprocessor yields {} features but classifier expects {}",
                self.preprocessor.n_features(),
                self.classifier.n_features
            )));
        }
        self.preprocessor.validate()?;
        self.classifier.validate()
    }

    /// Write the artifact to `path`, creating parent directories
    ///
    /// Writes a sibling temp file first and renames it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, path)?;

        info!("Saved pipeline artifact to {}", path.display());
        Ok(())
    }

    /// Read and validate the artifact at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            Error::Artifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        let pipeline: HitPipeline = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Artifact(format!("cannot parse {}: {}", path.display(), e))
        })?;
        pipeline.validate()?;

        info!(
            trees = pipeline.classifier.trees.len(),
            features = pipeline.classifier.n_features,
            "Loaded pipeline artifact from {}",
            path.display()
        );
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Schema;
    use crate::features::Record;

    fn dataset() -> Dataset {
        let schema = Schema::new(vec!["energy".into()], vec!["genre".into()]);
        let mut dataset = Dataset::new(schema);
        for i in 0..200 {
            let energy = (i % 50) as f64 / 50.0;
            let genre = if i % 2 == 0 { "Pop" } else { "Jazz" };
            let label = u8::from(energy > 0.5 && genre == "Pop");
            dataset.push_row(vec![energy], vec![genre.into()], label).unwrap();
        }
        dataset
    }

    fn params() -> BoostingParams {
        BoostingParams {
            n_estimators: 30,
            learning_rate: 0.3,
            num_leaves: 4,
            min_child_samples: 5,
            ..BoostingParams::default()
        }
    }

    #[test]
    fn test_fit_and_classify() {
        let pipeline = HitPipeline::fit(&dataset(), &params(), 60.0).unwrap();
        assert_eq!(pipeline.metadata.train_rows, 200);
        assert_eq!(pipeline.required_columns(), vec!["energy", "genre"]);

        let hit = Record::new().with_number("energy", 0.9).with_text("genre", "Pop");
        let miss = Record::new().with_number("energy", 0.1).with_text("genre", "Jazz");
        assert_eq!(pipeline.predict(&hit).unwrap(), 1);
        assert_eq!(pipeline.predict(&miss).unwrap(), 0);
    }

    #[test]
    fn test_unknown_category_does_not_fail() {
        let pipeline = HitPipeline::fit(&dataset(), &params(), 60.0).unwrap();
        let record = Record::new()
            .with_number("energy", 0.9)
            .with_text("genre", "Polka");
        let p = pipeline.predict_proba(&record).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_top_features_sorted() {
        let pipeline = HitPipeline::fit(&dataset(), &params(), 60.0).unwrap();
        let top = pipeline.top_features(2);
        assert_eq!(top.len(), 2);
        assert!(top[0].1 >= top[1].1);
    }

    #[test]
    fn test_validate_rejects_version_mismatch() {
        let mut pipeline = HitPipeline::fit(&dataset(), &params(), 60.0).unwrap();
        pipeline.format_version = 99;
        assert!(matches!(pipeline.validate(), Err(Error::Artifact(_))));
    }

    #[test]
    fn test_load_missing_file_is_artifact_error() {
        let err = HitPipeline::load(Path::new("/nonexistent/pipeline.json")).unwrap_err();
        assert!(matches!(err, Error::Artifact(_)));
    }

    #[test]
    fn test_load_rejects_unsorted_categories() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pipeline.json");
        let mut pipeline = HitPipeline::fit(&dataset(), &params(), 60.0).unwrap();
        pipeline.preprocessor.categorical[0].encoder.categories.reverse();
        // save does not validate, so a hand-edited file can be reproduced
        pipeline.save(&path).unwrap();

        let err = HitPipeline::load(&path).unwrap_err();
        assert!(matches!(err, Error::Artifact(_)));
        assert!(err.to_string().contains("genre"), "{}", err);
    }
}
