//! Prediction endpoint
//!
//! The body is deserialized into [`SongFeatures`] before the handler body
//! runs, so a payload with a missing or mistyped field never reaches the
//! pipeline.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use hitpred_common::{predict_song, Prediction, SongFeatures};
use std::sync::atomic::Ordering;
use tracing::debug;

use crate::{ApiError, ApiResult, AppState};

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<SongFeatures>, JsonRejection>,
) -> ApiResult<Json<Prediction>> {
    let Json(song) = payload.map_err(rejection_to_error)?;

    let prediction = predict_song(&state.pipeline, &song)?;
    state.predictions_served.fetch_add(1, Ordering::Relaxed);

    debug!(
        genre = %song.genre,
        probability = prediction.hit_probability,
        "{}",
        prediction.status
    );
    Ok(Json(prediction))
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(e) => ApiError::Validation(e.body_text()),
        JsonRejection::JsonSyntaxError(e) => ApiError::BadRequest(e.body_text()),
        JsonRejection::MissingJsonContentType(e) => ApiError::UnsupportedMediaType(e.body_text()),
        other => ApiError::BadRequest(other.body_text()),
    }
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}
