//! # Hit Predictor Common Library
//!
//! Shared code for the hit predictor binaries:
//! - Dataset loading and label derivation
//! - Feature preprocessing (scaling, one-hot encoding)
//! - Gradient-boosted tree classifier
//! - The fitted pipeline artifact and the prediction types built on it
//! - Configuration loading and logging setup

pub mod build_info;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod gbdt;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod prediction;
pub mod preprocess;
pub mod split;
pub mod training;

pub use error::{Error, Result};
pub use features::{FeatureMatrix, FeatureSource, FeatureValue, Record};
pub use pipeline::HitPipeline;
pub use prediction::{predict_song, Prediction, PredictionStatus, SongFeatures};
