//! UI routes: the form page and its submission

use axum::{
    body::{to_bytes, Body},
    extract::{rejection::FormRejection, State},
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Router,
};
use hitpred_common::Prediction;
use serde_json::Value;
use tower::ServiceExt;
use tracing::{debug, warn};

use crate::form::TrackForm;
use crate::render::{page, Outcome};
use crate::UiState;

/// Largest prediction response we are willing to buffer
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Build UI routes
pub fn ui_routes() -> Router<UiState> {
    Router::new()
        .route("/", get(root_page))
        .route("/analyze", post(analyze))
}

/// GET /
pub async fn root_page() -> impl IntoResponse {
    Html(page(&TrackForm::default(), None))
}

/// POST /analyze
///
/// Validates the form, forwards it to `POST /predict` on the api router
/// and renders the verdict. Invalid input never reaches the api.
pub async fn analyze(
    State(state): State<UiState>,
    form: Result<Form<TrackForm>, FormRejection>,
) -> impl IntoResponse {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            let outcome = Outcome::Error(rejection.body_text());
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(page(&TrackForm::default(), Some(&outcome))),
            );
        }
    };

    if let Err(message) = form.validate() {
        let outcome = Outcome::Error(message);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(page(&form, Some(&outcome))),
        );
    }

    let outcome = match request_prediction(&state, &form).await {
        Ok(prediction) => {
            debug!(
                genre = %form.genre,
                probability = prediction.hit_probability,
                "{}",
                prediction.status
            );
            Outcome::Prediction(prediction)
        }
        Err(message) => {
            warn!("Prediction failed: {}", message);
            Outcome::Error(message)
        }
    };
    (StatusCode::OK, Html(page(&form, Some(&outcome))))
}

/// Call the api router in-process; errors are display-ready messages
async fn request_prediction(state: &UiState, form: &TrackForm) -> Result<Prediction, String> {
    let payload = serde_json::to_vec(&form.to_song()).map_err(|e| e.to_string())?;
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload))
        .map_err(|e| e.to_string())?;

    let response = state
        .api
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| e.to_string())?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
        .await
        .map_err(|e| e.to_string())?;

    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(|e| format!("unreadable response: {}", e));
    }

    let message = serde_json::from_slice::<Value>(&bytes)
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
    Err(format!("{} ({})", message, status))
}
