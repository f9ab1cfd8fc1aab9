//! hitpred-ui HTTP integration tests
//!
//! The UI router wraps a real hitpred-api router over a small fitted
//! pipeline; both are driven in-process.

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use hitpred_api::AppState;
use hitpred_common::dataset::{Dataset, Schema};
use hitpred_common::gbdt::BoostingParams;
use hitpred_common::HitPipeline;
use hitpred_ui::{build_router, UiState};
use http_body_util::BodyExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tower::ServiceExt;

const NUMERIC: [&str; 10] = [
    "duration_ms",
    "stream_count",
    "explicit",
    "danceability",
    "energy",
    "key",
    "loudness",
    "mode",
    "instrumentalness",
    "tempo",
];

/// Pipeline over the request columns plus `extra_numeric`
fn pipeline(extra_numeric: &[&str]) -> HitPipeline {
    let mut numeric: Vec<String> = NUMERIC.iter().map(|s| s.to_string()).collect();
    numeric.extend(extra_numeric.iter().map(|s| s.to_string()));
    let categorical = ["genre", "label", "country"].map(String::from).to_vec();
    let mut dataset = Dataset::new(Schema::new(numeric, categorical));

    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..500 {
        let genre = ["Pop", "Rock", "Jazz"][rng.gen_range(0..3)];
        let danceability: f64 = rng.gen_range(0.0..1.0);
        let energy: f64 = rng.gen_range(0.0..1.0);
        let mut row = vec![
            200_000.0,
            rng.gen_range(1_000.0..100_000.0),
            0.0,
            danceability,
            energy,
            5.0,
            rng.gen_range(-30.0..0.0),
            1.0,
            0.01,
            rng.gen_range(80.0..160.0),
        ];
        row.extend(extra_numeric.iter().map(|_| rng.gen_range(0.0..1.0)));
        let label = u8::from(danceability + energy > 1.0);
        dataset
            .push_row(row, vec![genre.to_string(), "Indie".to_string(), "US".to_string()], label)
            .unwrap();
    }

    let params = BoostingParams {
        n_estimators: 30,
        learning_rate: 0.1,
        num_leaves: 7,
        ..BoostingParams::default()
    };
    HitPipeline::fit(&dataset, &params, 60.0).unwrap()
}

fn app_with(pipeline: HitPipeline) -> (axum::Router, AppState) {
    let api_state = AppState::new(pipeline, "models/test_pipeline.json");
    let api = hitpred_api::build_router(api_state.clone());
    (build_router(UiState::new(api)), api_state)
}

fn submit(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const HIT_FORM: &str = "genre=Pop&country=US&label=Sony+Music&duration_ms=200000\
    &stream_count=50000&danceability=0.8&energy=0.9&loudness=-5&tempo=128&explicit=0";

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_root_serves_form() {
    let (app, _) = app_with(pipeline(&[]));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.contains("text/html"));

    let html = body_text(response).await;
    for choice in ["Hip-Hop", "Reggaeton", "Mexico", "Island Records"] {
        assert!(html.contains(choice), "form lacks {}", choice);
    }
    assert!(!html.contains("Hit Probability"));
}

#[tokio::test]
async fn test_analyze_renders_verdict() {
    let (app, api_state) = app_with(pipeline(&[]));

    let response = app.oneshot(submit(HIT_FORM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Hit Probability"));
    assert!(html.contains("Result: Potential Hit") || html.contains("Result: Niche Track"));
    assert!(html.contains('%'));
    // the submitted values are kept in the form
    assert!(html.contains(r#"<option value="Sony Music" selected>"#));
    assert_eq!(api_state.predictions_served(), 1);
}

#[tokio::test]
async fn test_out_of_range_input_never_reaches_api() {
    let (app, api_state) = app_with(pipeline(&[]));
    let form = HIT_FORM.replace("danceability=0.8", "danceability=1.7");

    let response = app.oneshot(submit(&form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Danceability must be between 0 and 1"));
    assert_eq!(api_state.predictions_served(), 0);
}

#[tokio::test]
async fn test_unparsable_form_rejected() {
    let (app, api_state) = app_with(pipeline(&[]));
    let form = HIT_FORM.replace("duration_ms=200000", "duration_ms=long");

    let response = app.oneshot(submit(&form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("API Error"));
    assert_eq!(api_state.predictions_served(), 0);
}

#[tokio::test]
async fn test_api_failure_shown_as_banner() {
    // the api cannot feed this pipeline from a request, so every call fails
    let (app, api_state) = app_with(pipeline(&["valence"]));

    let response = app.oneshot(submit(HIT_FORM)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("API Error: Unable to get prediction."));
    assert!(html.contains("valence"));
    assert!(!html.contains("Hit Probability"));
    assert_eq!(api_state.predictions_served(), 0);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app_with(pipeline(&[]));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["module"], "hitpred-ui");
    assert_eq!(body["status"], "ok");
}
