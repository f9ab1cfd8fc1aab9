//! Shared fixtures for hitpred-api integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use hitpred_api::{build_router, AppState};
use hitpred_common::dataset::{Dataset, Schema};
use hitpred_common::gbdt::BoostingParams;
use hitpred_common::HitPipeline;
use http_body_util::BodyExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

pub const NUMERIC: [&str; 10] = [
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
pub const CATEGORICAL: [&str; 3] = ["genre", "label", "country"];

const GENRES: [&str; 3] = ["Pop", "Rock", "Jazz"];

/// Synthetic tracks where danceable, energetic pop tends to be popular
pub fn synthetic_dataset(rows: usize, extra_numeric: &[&str]) -> Dataset {
    let mut numeric_names: Vec<String> = NUMERIC.iter().map(|s| s.to_string()).collect();
    numeric_names.extend(extra_numeric.iter().map(|s| s.to_string()));
    let schema = Schema::new(
        numeric_names,
        CATEGORICAL.iter().map(|s| s.to_string()).collect(),
    );

    let mut rng = StdRng::seed_from_u64(17);
    let mut dataset = Dataset::new(schema);
    for _ in 0..rows {
        let genre = GENRES[rng.gen_range(0..GENRES.len())];
        let danceability: f64 = rng.gen_range(0.0..1.0);
        let energy: f64 = rng.gen_range(0.0..1.0);
        let score = danceability + energy + if genre == "Pop" { 0.5 } else { 0.0 };

        let mut numeric = vec![
            rng.gen_range(120_000.0..300_000.0),
            rng.gen_range(1_000.0..1_000_000.0),
            f64::from(rng.gen_range(0u8..2)),
            danceability,
            energy,
            f64::from(rng.gen_range(0u8..12)),
            rng.gen_range(-30.0..0.0),
            f64::from(rng.gen_range(0u8..2)),
            rng.gen_range(0.0..0.5),
            rng.gen_range(70.0..180.0),
        ];
        numeric.extend(extra_numeric.iter().map(|_| rng.gen_range(0.0..1.0)));

        dataset
            .push_row(
                numeric,
                vec![genre.to_string(), "Indie".to_string(), "US".to_string()],
                u8::from(score > 1.25),
            )
            .unwrap();
    }
    dataset
}

pub fn small_params() -> BoostingParams {
    BoostingParams {
        n_estimators: 40,
        learning_rate: 0.1,
        num_leaves: 15,
        ..BoostingParams::default()
    }
}

pub fn fitted_pipeline() -> HitPipeline {
    HitPipeline::fit(&synthetic_dataset(600, &[]), &small_params(), 60.0).unwrap()
}

pub fn test_state() -> AppState {
    AppState::new(fitted_pipeline(), "models/test_pipeline.json")
}

/// The end-to-end request body
pub fn hit_song() -> Value {
    json!({
        "danceability": 0.8,
        "energy": 0.9,
        "key": 5,
        "loudness": -5.0,
        "mode": 1,
        "instrumentalness": 0.01,
        "tempo": 128.0,
        "stream_count": 50000,
        "explicit": 0,
        "genre": "Pop",
        "country": "US",
        "label": "Sony Music",
        "duration_ms": 200000
    })
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Router over a fresh state, returned with the state for counter checks
pub fn app() -> (axum::Router, AppState) {
    let state = test_state();
    (build_router(state.clone()), state)
}
