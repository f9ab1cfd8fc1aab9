//! Model description endpoint

use axum::{extract::State, routing::get, Json, Router};
use hitpred_common::gbdt::DECISION_THRESHOLD;
use hitpred_common::pipeline::TrainingMetadata;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::AppState;

/// Features listed in the model description
const TOP_FEATURES: usize = 10;

/// One entry of the gain ranking
#[derive(Debug, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub gain: f64,
}

/// GET /model response
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_path: String,
    pub format_version: u32,
    /// Scaled numeric inputs, in model order
    pub numeric_columns: Vec<String>,
    /// One-hot encoded inputs and the categories seen in training
    pub categorical_columns: BTreeMap<String, Vec<String>>,
    /// Width of the transformed feature vector
    pub n_features: usize,
    pub trees: usize,
    pub learning_rate: f64,
    pub decision_threshold: f64,
    pub metadata: TrainingMetadata,
    pub top_features: Vec<FeatureImportance>,
}

/// GET /model
pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    let pipeline = &state.pipeline;
    let preprocessor = &pipeline.preprocessor;

    Json(ModelInfo {
        model_path: state.model_path.display().to_string(),
        format_version: pipeline.format_version,
        numeric_columns: preprocessor.numeric.iter().map(|c| c.name.clone()).collect(),
        categorical_columns: preprocessor
            .categorical
            .iter()
            .map(|c| (c.name.clone(), c.encoder.categories.clone()))
            .collect(),
        n_features: preprocessor.n_features(),
        trees: pipeline.classifier.trees.len(),
        learning_rate: pipeline.classifier.params.learning_rate,
        decision_threshold: DECISION_THRESHOLD,
        metadata: pipeline.metadata.clone(),
        top_features: pipeline
            .top_features(TOP_FEATURES)
            .into_iter()
            .map(|(feature, gain)| FeatureImportance { feature, gain })
            .collect(),
    })
}

/// Build model description routes
pub fn model_routes() -> Router<AppState> {
    Router::new().route("/model", get(model_info))
}
