//! The offline training job
//!
//! Load -> label -> split -> fit -> evaluate -> persist. Any failure aborts
//! the run; nothing is written unless every earlier step succeeded.

use crate::config::TrainingConfig;
use crate::dataset;
use crate::metrics;
use crate::pipeline::HitPipeline;
use crate::split::train_test_split;
use crate::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Features listed in the post-training summary
const REPORTED_TOP_FEATURES: usize = 10;

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub dataset_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Share of positive labels over the whole dataset
    pub positive_rate: f64,
    pub roc_auc: f64,
    pub accuracy: f64,
    pub log_loss: f64,
    pub trees: usize,
    /// Highest-gain features, descending
    pub top_features: Vec<(String, f64)>,
    pub model_path: PathBuf,
    pub elapsed: Duration,
}

/// Held-out metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub roc_auc: f64,
    pub accuracy: f64,
    pub log_loss: f64,
}

/// Score `pipeline` against a labelled dataset
pub fn evaluate(pipeline: &HitPipeline, test: &dataset::Dataset) -> Result<Evaluation> {
    let probabilities = pipeline.predict_proba_dataset(test)?;
    let predicted: Vec<u8> = probabilities
        .iter()
        .map(|&p| u8::from(p >= crate::gbdt::DECISION_THRESHOLD))
        .collect();

    Ok(Evaluation {
        roc_auc: metrics::roc_auc(test.labels(), &probabilities)?,
        accuracy: metrics::accuracy(test.labels(), &predicted)?,
        log_loss: metrics::log_loss(test.labels(), &probabilities)?,
    })
}

/// Fit and evaluate a pipeline on an in-memory dataset
///
/// Returns the fitted pipeline (metadata filled in) and its held-out
/// evaluation. Nothing is written to disk.
pub fn fit_and_evaluate(
    dataset: &dataset::Dataset,
    config: &TrainingConfig,
) -> Result<(HitPipeline, Evaluation)> {
    config.validate()?;

    let split = train_test_split(dataset.len(), config.test_size, config.random_state)?;
    let train = dataset.subset(&split.train);
    let test = dataset.subset(&split.test);
    info!(
        train_rows = train.len(),
        test_rows = test.len(),
        "Split dataset (test size {}, seed {})",
        config.test_size,
        config.random_state
    );

    let mut pipeline = HitPipeline::fit(&train, &config.boosting, config.popularity_threshold)?;
    let evaluation = evaluate(&pipeline, &test)?;

    pipeline.metadata.test_rows = test.len();
    pipeline.metadata.roc_auc = Some(evaluation.roc_auc);
    Ok((pipeline, evaluation))
}

/// Run the whole job: read `dataset_path`, write the artifact to `model_path`
pub fn run(dataset_path: &Path, model_path: &Path, config: &TrainingConfig) -> Result<TrainingReport> {
    let started = Instant::now();
    config.validate()?;

    let dataset = dataset::load_csv(dataset_path, config.popularity_threshold)?;
    let positive_rate = dataset.positives() as f64 / dataset.len() as f64;

    let (pipeline, evaluation) = fit_and_evaluate(&dataset, config)?;
    info!(
        roc_auc = evaluation.roc_auc,
        accuracy = evaluation.accuracy,
        log_loss = evaluation.log_loss,
        "Held-out evaluation"
    );

    pipeline.save(model_path)?;

    let top_features = pipeline.top_features(REPORTED_TOP_FEATURES);
    Ok(TrainingReport {
        dataset_rows: dataset.len(),
        train_rows: pipeline.metadata.train_rows,
        test_rows: pipeline.metadata.test_rows,
        positive_rate,
        roc_auc: evaluation.roc_auc,
        accuracy: evaluation.accuracy,
        log_loss: evaluation.log_loss,
        trees: pipeline.classifier.trees.len(),
        top_features,
        model_path: model_path.to_path_buf(),
        elapsed: started.elapsed(),
    })
}
