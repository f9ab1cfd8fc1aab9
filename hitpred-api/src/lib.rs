//! hitpred-api library interface
//!
//! Serves the fitted popularity pipeline over HTTP. Exposed as a library so
//! integration tests and hitpred-ui can drive the router in-process.

pub mod api;
pub mod error;
pub mod server;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use hitpred_common::{Error, HitPipeline, SongFeatures};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Fitted pipeline, read-only after startup
    pub pipeline: Arc<HitPipeline>,
    /// Where the pipeline was loaded from
    pub model_path: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Successful predictions since startup
    pub predictions_served: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(pipeline: HitPipeline, model_path: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            model_path: model_path.into(),
            startup_time: Utc::now(),
            predictions_served: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn predictions_served(&self) -> u64 {
        self.predictions_served.load(Ordering::Relaxed)
    }
}

/// Load the artifact and check that requests can feed it
///
/// Fails if the file is missing or corrupt, or if the pipeline needs an
/// input column the request schema does not carry.
pub fn load_pipeline(path: &Path) -> hitpred_common::Result<HitPipeline> {
    let pipeline = HitPipeline::load(path)?;

    let uncovered: Vec<&str> = pipeline
        .required_columns()
        .into_iter()
        .filter(|column| !SongFeatures::FIELD_NAMES.contains(column))
        .collect();
    if !uncovered.is_empty() {
        return Err(Error::Artifact(format!(
            "{} requires columns missing from the request schema: {}",
            path.display(),
            uncovered.join(", ")
        )));
    }

    Ok(pipeline)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::predict_routes())
        .merge(api::model_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
