//! End-to-end tests of the offline training job
//!
//! Tests cover:
//! - CSV -> fitted artifact on disk
//! - Held-out ROC-AUC on a learnable synthetic dataset
//! - Deterministic training for a fixed seed
//! - Artifact save/load preserving predictions bit-for-bit
//! - Unknown categories at inference time
//! - Malformed datasets aborting the run without writing an artifact

use hitpred_common::config::TrainingConfig;
use hitpred_common::gbdt::BoostingParams;
use hitpred_common::training;
use hitpred_common::{predict_song, HitPipeline, PredictionStatus, SongFeatures};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tempfile::TempDir;

const GENRES: [&str; 4] = ["Pop", "Rock", "Jazz", "Metal"];
const COUNTRIES: [&str; 3] = ["US", "UK", "Brazil"];
const LABELS: [&str; 3] = ["Sony Music", "Indie", "Universal Music"];

/// Write a synthetic track CSV whose popularity depends on danceability,
/// energy and genre
fn write_dataset(path: &Path, rows: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer
        .write_record([
            "track_id", "track_name", "artist_name", "album_name", "release_date", "genre",
            "duration_ms", "popularity", "stream_count", "country", "explicit", "label",
            "danceability", "energy", "key", "loudness", "mode", "instrumentalness", "tempo",
        ])
        .unwrap();

    for i in 0..rows {
        let genre = GENRES[rng.gen_range(0..GENRES.len())];
        let danceability: f64 = rng.gen_range(0.0..1.0);
        let energy: f64 = rng.gen_range(0.0..1.0);
        let genre_boost = if genre == "Pop" { 15.0 } else { 0.0 };
        let noise: f64 = rng.gen_range(-5.0..5.0);
        let popularity = (30.0 * danceability + 30.0 * energy + genre_boost + 15.0 + noise)
            .clamp(0.0, 100.0)
            .round();

        writer
            .write_record([
                format!("t{}", i),
                format!("Track {}", i),
                "Artist".to_string(),
                "Album".to_string(),
                "2020-01-01".to_string(),
                genre.to_string(),
                rng.gen_range(120_000..300_000).to_string(),
                popularity.to_string(),
                rng.gen_range(1_000..1_000_000).to_string(),
                COUNTRIES[rng.gen_range(0..COUNTRIES.len())].to_string(),
                (if rng.gen_bool(0.3) { "True" } else { "False" }).to_string(),
                LABELS[rng.gen_range(0..LABELS.len())].to_string(),
                format!("{:.3}", danceability),
                format!("{:.3}", energy),
                rng.gen_range(0..12).to_string(),
                format!("{:.2}", rng.gen_range(-30.0..0.0)),
                rng.gen_range(0..2).to_string(),
                format!("{:.3}", rng.gen_range(0.0..0.5)),
                format!("{:.1}", rng.gen_range(70.0..180.0)),
            ])
            .unwrap();
    }
    writer.flush().unwrap();
}

fn fast_config() -> TrainingConfig {
    TrainingConfig {
        boosting: BoostingParams {
            n_estimators: 60,
            learning_rate: 0.1,
            num_leaves: 15,
            ..BoostingParams::default()
        },
        ..TrainingConfig::default()
    }
}

fn song(genre: &str) -> SongFeatures {
    SongFeatures {
        danceability: 0.8,
        energy: 0.9,
        key: 5,
        loudness: -5.0,
        mode: 1,
        instrumentalness: 0.01,
        tempo: 128.0,
        stream_count: 50_000,
        explicit: 0,
        genre: genre.to_string(),
        country: "US".to_string(),
        label: "Sony Music".to_string(),
        duration_ms: 200_000,
    }
}

#[test]
fn test_training_run_writes_loadable_artifact() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("tracks.csv");
    let model = dir.path().join("models").join("pipeline.json");
    write_dataset(&data, 1500, 1);

    let report = training::run(&data, &model, &fast_config()).unwrap();

    assert!(model.exists());
    assert_eq!(report.dataset_rows, 1500);
    assert_eq!(report.test_rows, 300);
    assert_eq!(report.train_rows, 1200);
    assert!(report.roc_auc > 0.85, "ROC-AUC too low: {}", report.roc_auc);
    assert!(report.trees > 0);
    assert!(!report.top_features.is_empty());

    let pipeline = HitPipeline::load(&model).unwrap();
    assert_eq!(pipeline.metadata.roc_auc, Some(report.roc_auc));
    assert_eq!(pipeline.metadata.test_rows, 300);
    assert_eq!(pipeline.metadata.popularity_threshold, 60.0);
}

#[test]
fn test_required_columns_match_request_schema() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("tracks.csv");
    let model = dir.path().join("pipeline.json");
    write_dataset(&data, 400, 2);

    training::run(&data, &model, &fast_config()).unwrap();
    let pipeline = HitPipeline::load(&model).unwrap();

    for column in pipeline.required_columns() {
        assert!(
            SongFeatures::FIELD_NAMES.contains(&column),
            "pipeline needs '{}' which requests do not carry",
            column
        );
    }
    assert_eq!(pipeline.required_columns().len(), SongFeatures::FIELD_NAMES.len());
}

#[test]
fn test_loaded_artifact_predicts_identically() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("tracks.csv");
    let model = dir.path().join("pipeline.json");
    write_dataset(&data, 600, 3);

    let dataset = hitpred_common::dataset::load_csv(&data, 60.0).unwrap();
    let (pipeline, _) = training::fit_and_evaluate(&dataset, &fast_config()).unwrap();
    pipeline.save(&model).unwrap();
    let loaded = HitPipeline::load(&model).unwrap();

    assert_eq!(loaded, pipeline);
    for genre in GENRES {
        let before = predict_song(&pipeline, &song(genre)).unwrap();
        let after = predict_song(&loaded, &song(genre)).unwrap();
        assert_eq!(before.hit_probability.to_bits(), after.hit_probability.to_bits());
        assert_eq!(before.is_popular, after.is_popular);
    }
}

#[test]
fn test_training_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("tracks.csv");
    write_dataset(&data, 500, 4);

    let dataset = hitpred_common::dataset::load_csv(&data, 60.0).unwrap();
    let (a, eval_a) = training::fit_and_evaluate(&dataset, &fast_config()).unwrap();
    let (b, eval_b) = training::fit_and_evaluate(&dataset, &fast_config()).unwrap();

    assert_eq!(a.classifier, b.classifier);
    assert_eq!(a.preprocessor, b.preprocessor);
    assert_eq!(eval_a, eval_b);
}

#[test]
fn test_prediction_properties() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("tracks.csv");
    write_dataset(&data, 800, 5);

    let dataset = hitpred_common::dataset::load_csv(&data, 60.0).unwrap();
    let (pipeline, _) = training::fit_and_evaluate(&dataset, &fast_config()).unwrap();

    // includes a genre never seen in training
    for genre in ["Pop", "Jazz", "Reggaeton", ""] {
        let first = predict_song(&pipeline, &song(genre)).unwrap();
        let second = predict_song(&pipeline, &song(genre)).unwrap();

        assert!((0.0..=1.0).contains(&first.hit_probability));
        assert_eq!(first.is_popular, u8::from(first.hit_probability >= 0.5));
        let expected = if first.is_popular == 1 {
            PredictionStatus::PotentialHit
        } else {
            PredictionStatus::NicheTrack
        };
        assert_eq!(first.status, expected);
        assert_eq!(first.hit_probability.to_bits(), second.hit_probability.to_bits());
        assert_eq!(first, second);
    }
}

#[test]
fn test_high_energy_pop_scores_above_low_energy_jazz() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("tracks.csv");
    write_dataset(&data, 1500, 6);

    let dataset = hitpred_common::dataset::load_csv(&data, 60.0).unwrap();
    let (pipeline, _) = training::fit_and_evaluate(&dataset, &fast_config()).unwrap();

    let hit = predict_song(&pipeline, &song("Pop")).unwrap();
    let mut niche = song("Jazz");
    niche.danceability = 0.1;
    niche.energy = 0.1;
    let niche = predict_song(&pipeline, &niche).unwrap();

    assert!(hit.hit_probability > niche.hit_probability);
    assert_eq!(hit.status, PredictionStatus::PotentialHit);
    assert_eq!(niche.status, PredictionStatus::NicheTrack);
}

#[test]
fn test_malformed_dataset_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("broken.csv");
    let model = dir.path().join("pipeline.json");
    std::fs::write(
        &data,
        "track_id,track_name,artist_name,album_name,release_date,genre,popularity,country,label,energy\n\
         t1,A,B,C,2020,Pop,70,US,Indie,loud\n",
    )
    .unwrap();

    let err = training::run(&data, &model, &fast_config()).unwrap_err();
    assert!(err.to_string().contains("energy"), "{}", err);
    assert!(!model.exists());
}

#[test]
fn test_missing_dataset_file_fails() {
    let dir = TempDir::new().unwrap();
    let result = training::run(
        &dir.path().join("absent.csv"),
        &dir.path().join("pipeline.json"),
        &fast_config(),
    );
    assert!(result.is_err());
}
